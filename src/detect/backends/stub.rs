//! Scripted stand-ins for the detection capabilities.
//!
//! Each stub replays a queue of canned responses, one per call, then keeps
//! returning its steady response. A shared `CallCounter` lets tests observe
//! how often the pipeline actually invoked a detector.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::detect::backend::{FiducialDetector, ObjectRecognizer, PersonDetector};
use crate::detect::result::{BBox, MarkerQuad, RecognizedObject};
use crate::frame::Frame;

/// Shared invocation counter. Clones observe the same count.
#[derive(Clone, Debug, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Script<T> {
    queued: VecDeque<T>,
    steady: T,
    calls: CallCounter,
}

impl<T: Clone> Script<T> {
    fn new(queued: Vec<T>, steady: T) -> Self {
        Self {
            queued: queued.into(),
            steady,
            calls: CallCounter::default(),
        }
    }

    fn next(&mut self) -> T {
        self.calls.bump();
        self.queued
            .pop_front()
            .unwrap_or_else(|| self.steady.clone())
    }
}

// ----------------------------------------------------------------------------
// Fiducial
// ----------------------------------------------------------------------------

pub struct StubFiducialDetector {
    script: Script<Vec<MarkerQuad>>,
}

impl StubFiducialDetector {
    /// Never sees a marker.
    pub fn none() -> Self {
        Self::scripted(vec![], vec![])
    }

    /// Sees the same marker on every frame.
    pub fn steady(marker: MarkerQuad) -> Self {
        Self::scripted(vec![], vec![marker])
    }

    /// Replays `queued` (one entry per call), then returns `steady` forever.
    pub fn scripted(queued: Vec<Vec<MarkerQuad>>, steady: Vec<MarkerQuad>) -> Self {
        Self {
            script: Script::new(queued, steady),
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.script.calls.clone()
    }
}

impl FiducialDetector for StubFiducialDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<MarkerQuad>> {
        Ok(self.script.next())
    }
}

// ----------------------------------------------------------------------------
// Person
// ----------------------------------------------------------------------------

pub struct StubPersonDetector {
    script: Script<Vec<BBox>>,
}

impl StubPersonDetector {
    pub fn none() -> Self {
        Self::scripted(vec![], vec![])
    }

    pub fn steady(region: BBox) -> Self {
        Self::scripted(vec![], vec![region])
    }

    pub fn scripted(queued: Vec<Vec<BBox>>, steady: Vec<BBox>) -> Self {
        Self {
            script: Script::new(queued, steady),
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.script.calls.clone()
    }
}

impl PersonDetector for StubPersonDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<BBox>> {
        Ok(self.script.next())
    }
}

// ----------------------------------------------------------------------------
// Object recognition
// ----------------------------------------------------------------------------

pub struct StubRecognizer {
    name: &'static str,
    script: Script<Vec<RecognizedObject>>,
    failing: bool,
}

impl StubRecognizer {
    pub fn none(name: &'static str) -> Self {
        Self::scripted(name, vec![], vec![])
    }

    pub fn steady(name: &'static str, objects: Vec<RecognizedObject>) -> Self {
        Self::scripted(name, vec![], objects)
    }

    pub fn scripted(
        name: &'static str,
        queued: Vec<Vec<RecognizedObject>>,
        steady: Vec<RecognizedObject>,
    ) -> Self {
        Self {
            name,
            script: Script::new(queued, steady),
            failing: false,
        }
    }

    /// Errors on every call (an unloadable model, a crashed runtime).
    pub fn failing(name: &'static str) -> Self {
        Self {
            failing: true,
            ..Self::none(name)
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.script.calls.clone()
    }
}

impl ObjectRecognizer for StubRecognizer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<RecognizedObject>> {
        let objects = self.script.next();
        if self.failing {
            return Err(anyhow!("{}: recognizer unavailable", self.name));
        }
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::Point;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, 0.0, 1)
    }

    #[test]
    fn scripted_responses_then_steady() {
        let marker = MarkerQuad::square(1, Point::new(5.0, 5.0), 2.0);
        let mut detector = StubFiducialDetector::scripted(vec![vec![], vec![]], vec![marker]);
        let calls = detector.calls();

        assert!(detector.detect(&frame()).unwrap().is_empty());
        assert!(detector.detect(&frame()).unwrap().is_empty());
        assert_eq!(detector.detect(&frame()).unwrap().len(), 1);
        assert_eq!(detector.detect(&frame()).unwrap().len(), 1);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn failing_recognizer_counts_calls_and_errors() {
        let mut recognizer = StubRecognizer::failing("yolo");
        let calls = recognizer.calls();
        assert!(recognizer.detect(&frame()).is_err());
        assert_eq!(calls.get(), 1);
        assert_eq!(recognizer.name(), "yolo");
    }
}
