//! Frame ingestion sources.
//!
//! The pipeline consumes frames through the `FrameSource` trait. This module
//! provides the sources the crate ships with:
//! - `stub://` URLs open a `SyntheticSource` (testing, demos, bring-up)
//!
//! Hardware capture (USB/CSI cameras) is provided by the host process and
//! plugged in as its own `FrameSource` implementation.

pub mod synthetic;

pub use synthetic::{SourceStats, SyntheticSource};

use anyhow::{anyhow, Result};

use crate::frame::FrameSource;

/// Configuration for a frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceConfig {
    /// Source URL (e.g., "stub://front_camera").
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Nominal capture rate; synthetic timestamps advance by `1 / fps`.
    pub fps: u32,
    /// Synthetic sources fail every read after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            width: 640,
            height: 480,
            fps: 30,
            frame_limit: None,
        }
    }
}

/// Open the source named by `config.url`.
pub fn open_source(config: SourceConfig) -> Result<Box<dyn FrameSource>> {
    if config.url.starts_with("stub://") {
        let source = SyntheticSource::new(config)?;
        log::info!("opened {} (synthetic)", source.stats().url);
        Ok(Box::new(source))
    } else {
        Err(anyhow!(
            "no capture backend for '{}' (only stub:// sources are built in)",
            config.url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_urls_open_synthetic_sources() -> Result<()> {
        let mut source = open_source(SourceConfig {
            url: "stub://test".to_string(),
            ..SourceConfig::default()
        })?;
        let frame = source.read()?;
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        Ok(())
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        let result = open_source(SourceConfig {
            url: "rtsp://10.0.0.2/stream".to_string(),
            ..SourceConfig::default()
        });
        assert!(result.is_err());
    }
}
