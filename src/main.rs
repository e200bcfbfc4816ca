use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = infinite_zoom::config::Config::parse();
    infinite_zoom::logging::init(&cfg.log_path())?;
    infinite_zoom::app::run(cfg)
}
