use anyhow::Context;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    terminal::{self, ClearType},
    ExecutableCommand,
};
use std::io::{stdout, Stdout, Write};

/// Raw mode, alternate screen and mouse capture for as long as the guard lives.
pub struct TerminalGuard {
    mouse: bool,
}

impl TerminalGuard {
    pub fn new(mouse: bool) -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Create the guard immediately so Drop will disable raw mode if
        // any subsequent setup step fails.
        let mut guard = Self { mouse: false };

        let mut out = stdout();
        out.execute(terminal::EnterAlternateScreen)
            .context("enter alternate screen")?;
        out.execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        out.execute(cursor::Hide).context("hide cursor")?;
        if mouse {
            out.execute(EnableMouseCapture).context("enable mouse capture")?;
            guard.mouse = true;
        }

        Ok(guard)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = stdout();
        if self.mouse {
            let _ = out.execute(DisableMouseCapture);
        }
        let _ = terminal::disable_raw_mode();
        // Undo modes set while rendering (sync output, autowrap, colors).
        let _ = out.write_all(b"\x1b[?2026l\x1b[?7h\x1b[0m");
        let _ = out.flush();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
    }
}
