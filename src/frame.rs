//! Frame container and the capture seam.
//!
//! - `Frame`: one captured image. Pixel bytes are private; detectors read them
//!   through `pixels()`, nothing in the pipeline copies or stores them.
//! - `FrameSource`: the camera capability the pipeline pulls from. Reads may
//!   fail transiently; the caller decides whether to retry.

use anyhow::Result;

/// One captured frame.
pub struct Frame {
    /// Packed pixel data as produced by the source (RGB24 for synthetic frames).
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Capture time in seconds on the source's monotonic clock.
    pub timestamp_s: f64,

    /// Source-local frame number, starting at 1.
    pub sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_s: f64, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_s,
            sequence,
        }
    }

    /// Read-only pixel access for detector backends.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Half the frame width in pixels, the normalisation base for steering offsets.
    pub fn half_width(&self) -> f32 {
        self.width as f32 / 2.0
    }

    /// Horizontal deviation of `x` from the frame center, normalised to `[-1, 1]`.
    ///
    /// Positive means right of center. Returns 0 for a zero-width frame.
    pub fn horizontal_offset(&self, x: f32) -> f32 {
        let half = self.half_width();
        if half <= 0.0 {
            return 0.0;
        }
        ((x - half) / half).clamp(-1.0, 1.0)
    }
}

/// Camera capability consumed by the pipeline.
///
/// `read` blocks until a frame is available or the capture fails. A failure
/// is not fatal; the next call may succeed.
pub trait FrameSource: Send {
    /// Backend identifier (for logs).
    fn name(&self) -> &str;

    /// Capture the next frame.
    fn read(&mut self) -> Result<Frame>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }
}
