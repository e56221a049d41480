//! Object scanner: best-detection selection over an object recognizer.

use serde::{Deserialize, Serialize};

use crate::detect::{BBox, ObjectRecognizer, Point, RecognizedObject};
use crate::frame::Frame;

/// Coarse size-to-distance heuristic for recognised objects.
///
/// `distance = reference_distance * reference_extent_px / max(w, h)`: an
/// object whose larger box side spans `reference_extent_px` pixels is
/// assumed to be `reference_distance` away. This is an approximation with
/// empirical constants, not a calibrated measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDistanceHeuristic {
    pub reference_extent_px: f32,
    pub reference_distance: f32,
}

impl Default for ObjectDistanceHeuristic {
    fn default() -> Self {
        Self {
            reference_extent_px: 200.0,
            reference_distance: 50.0,
        }
    }
}

impl ObjectDistanceHeuristic {
    pub fn estimate(&self, bbox: &BBox) -> Option<f32> {
        let extent = bbox.w.max(bbox.h);
        if !(extent > 0.0) {
            return None;
        }
        Some(self.reference_distance * self.reference_extent_px / extent)
    }
}

/// The single detection picked for a frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectObservation {
    pub label: String,
    pub confidence: f32,
    pub bbox: BBox,
    pub center: Point,
    /// Which recognizer produced it.
    pub method: String,
    /// Heuristic distance from box size.
    pub distance: Option<f32>,
}

pub struct ObjectScanner {
    recognizer: Box<dyn ObjectRecognizer>,
    heuristic: ObjectDistanceHeuristic,
}

impl ObjectScanner {
    pub fn new(recognizer: Box<dyn ObjectRecognizer>, heuristic: ObjectDistanceHeuristic) -> Self {
        Self {
            recognizer,
            heuristic,
        }
    }

    pub fn recognizer_name(&self) -> &'static str {
        self.recognizer.name()
    }

    /// Highest-confidence detection in `frame`, if any.
    ///
    /// The first of equally confident detections wins. A recognizer error
    /// counts as "nothing found" for this frame.
    pub fn get_best_detection(&mut self, frame: &Frame) -> Option<ObjectObservation> {
        let objects = match self.recognizer.detect(frame) {
            Ok(objects) => objects,
            Err(err) => {
                log::warn!(
                    "object recognizer '{}' failed on frame {}: {:#}",
                    self.recognizer.name(),
                    frame.sequence,
                    err
                );
                return None;
            }
        };

        let recognizer = self.recognizer.name();
        let best = objects
            .into_iter()
            .map(|o| clamp_confidence(o, recognizer))
            .reduce(|best, o| if o.confidence > best.confidence { o } else { best })?;

        Some(ObjectObservation {
            center: best.bbox.center(),
            distance: self.heuristic.estimate(&best.bbox),
            label: best.label,
            confidence: best.confidence,
            bbox: best.bbox,
            method: best.method,
        })
    }
}

/// Confidences outside `[0, 1]` (or NaN) are clamped with a warning.
fn clamp_confidence(mut object: RecognizedObject, recognizer: &str) -> RecognizedObject {
    if !(0.0..=1.0).contains(&object.confidence) {
        log::warn!(
            "recognizer '{}' reported confidence {} for '{}'; clamping to [0, 1]",
            recognizer,
            object.confidence,
            object.label
        );
        object.confidence = if object.confidence.is_nan() {
            0.0
        } else {
            object.confidence.clamp(0.0, 1.0)
        };
    }
    object
}
