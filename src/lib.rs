pub mod app;
pub mod audio;
pub mod config;
pub mod input;
pub mod landing;
pub mod logging;
pub mod render;
pub mod terminal;
pub mod visual;
