//! Display images on a terminal, two pixels per character cell, with
//! interactive pan and zoom.

pub mod color;
pub mod config;
pub mod duration;
pub mod input;
pub mod load;
pub mod raster;
pub mod redraw;
pub mod resample;
pub mod surface;
pub mod terminal;
pub mod viewer;
pub mod viewport;

pub use config::Config;
pub use input::{InputEvent, Key, Outcome};
pub use load::Loader;
pub use raster::{RasterSource, Rect, SubRegionExtractable};
pub use surface::{CellSurface, MemorySurface};
pub use viewer::{ViewOptions, Viewer};
pub use viewport::{Frame, Viewport};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShowpicError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP Status {status}: {reason}")]
    Http { status: u16, reason: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Display error: {0}")]
    Display(String),
}

pub type Result<T> = std::result::Result<T, ShowpicError>;
