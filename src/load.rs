//! Fetching and decoding images from paths and URLs.

use std::path::Path;
use std::time::Duration;

use image::{DynamicImage, ImageReader, RgbaImage};
use tracing::{debug, info};

use crate::{Result, ShowpicError};

/// Largest HTTP body accepted.
const MAX_BODY: u64 = 256 * 1024 * 1024;

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

pub struct Loader {
    agent: ureq::Agent,
    grayscale: bool,
}

impl Loader {
    pub fn new(http_timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(http_timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent, grayscale: false }
    }

    pub fn with_grayscale(mut self, enabled: bool) -> Self {
        self.grayscale = enabled;
        self
    }

    /// Load `source`, a local path or an `http(s)://` URL.
    pub fn load(&self, source: &str) -> Result<RgbaImage> {
        let image = if is_url(source) {
            self.fetch(source)?
        } else {
            ImageReader::open(Path::new(source))?
                .with_guessed_format()?
                .decode()?
        };
        info!(source, width = image.width(), height = image.height(), "image loaded");
        Ok(self.finish(image))
    }

    fn fetch(&self, url: &str) -> Result<DynamicImage> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| ShowpicError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShowpicError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY)
            .read_to_vec()
            .map_err(|e| ShowpicError::Network(e.to_string()))?;
        debug!(url, bytes = bytes.len(), "fetched");
        Ok(image::load_from_memory(&bytes)?)
    }

    fn finish(&self, image: DynamicImage) -> RgbaImage {
        if self.grayscale {
            image.grayscale().to_rgba8()
        } else {
            image.to_rgba8()
        }
    }
}
