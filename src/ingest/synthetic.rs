//! Synthetic frame source (`stub://`).
//!
//! Produces frames with a moving test pattern and deterministic capture
//! timestamps (`(n - 1) / fps` seconds for frame `n`), so temporal logic
//! downstream can be exercised without a camera. An optional frame limit
//! makes every later read fail, which stands in for a camera dropping out.

use anyhow::{anyhow, Result};

use super::SourceConfig;
use crate::frame::{Frame, FrameSource};

/// Statistics for a synthetic source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub read_failures: u64,
    pub url: String,
}

pub struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
    read_failures: u64,
    /// Simulated scene drift, bumped every 50 frames.
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.fps == 0 {
            return Err(anyhow!("synthetic source fps must be >= 1"));
        }
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!(
                "synthetic source dimensions must be non-zero (got {}x{})",
                config.width,
                config.height
            ));
        }
        Ok(Self {
            config,
            frame_count: 0,
            read_failures: 0,
            scene_state: 0,
        })
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            read_failures: self.read_failures,
            url: self.config.url.clone(),
        }
    }

    fn exhausted(&self) -> bool {
        self.config
            .frame_limit
            .is_some_and(|limit| self.frame_count >= limit)
    }

    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.config.width as usize) * (self.config.height as usize) * 3;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        // One noise sample per frame keeps consecutive frames distinct.
        let noise: u8 = rand::random();
        let shift = self.frame_count + self.scene_state as u64 + noise as u64;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + shift) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.config.url
    }

    fn read(&mut self) -> Result<Frame> {
        if self.exhausted() {
            self.read_failures += 1;
            return Err(anyhow!(
                "{}: stream ended after {} frames",
                self.config.url,
                self.frame_count
            ));
        }

        self.frame_count += 1;
        let timestamp_s = (self.frame_count - 1) as f64 / self.config.fps as f64;
        let pixels = self.generate_synthetic_pixels();

        Ok(Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            timestamp_s,
            self.frame_count,
        ))
    }

    fn is_healthy(&self) -> bool {
        !self.exhausted()
    }
}
