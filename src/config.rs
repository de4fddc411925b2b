//! Viewer settings, optionally read from a JSON file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::color::ColorDepth;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// How long a burst of pan/zoom redraws is merged, in milliseconds.
    pub debounce_ms: u64,
    /// Capacity of the redraw queue between the input and redraw tasks.
    pub redraw_queue: usize,
    pub color_depth: ColorDepth,
    /// Overall timeout for fetching an image over HTTP.
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 10,
            redraw_queue: 8,
            color_depth: ColorDepth::Auto,
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(text)?;
        config.redraw_queue = config.redraw_queue.max(1);
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
