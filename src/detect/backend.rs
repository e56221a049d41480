use anyhow::Result;

use crate::detect::result::{BBox, MarkerQuad, RecognizedObject};
use crate::frame::Frame;

// Detection capabilities consumed by the pipeline.
//
// Backends receive the frame by reference and must not keep the pixel slice
// beyond the call. Errors are reported, not panicked; the pipeline turns a
// failed call into a "nothing found" outcome for that frame.

/// Fiducial marker detection.
pub trait FiducialDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Markers visible in `frame`, in the backend's native order.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<MarkerQuad>>;
}

/// Person region detection, used only by the fall heuristics.
pub trait PersonDetector: Send {
    fn name(&self) -> &'static str;

    /// Axis-aligned person boxes in `frame`.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BBox>>;
}

/// Object recognition.
///
/// Implementations may be backed by different models; callers only rely on
/// the label/confidence/box/method contract.
pub trait ObjectRecognizer: Send {
    fn name(&self) -> &'static str;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RecognizedObject>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
