use anyhow::{anyhow, Result};

use crate::detect::result::RecognizedObject;
use crate::frame::Frame;

use super::backend::ObjectRecognizer;

/// Interchangeable object recognizers behind one `ObjectRecognizer`.
///
/// The default backend runs first. If it fails, the remaining backends are
/// tried in registration order until one answers, so a heavy model can sit
/// in front of a cheap fallback.
pub struct RecognizerRegistry {
    backends: Vec<Box<dyn ObjectRecognizer>>,
    default_index: Option<usize>,
}

impl RecognizerRegistry {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            default_index: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<R: ObjectRecognizer + 'static>(&mut self, backend: R) {
        if self.default_index.is_none() {
            self.default_index = Some(self.backends.len());
        }
        self.backends.push(Box::new(backend));
    }

    /// Builder form of `register`.
    pub fn with<R: ObjectRecognizer + 'static>(mut self, backend: R) -> Self {
        self.register(backend);
        self
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        let index = self
            .backends
            .iter()
            .position(|b| b.name() == name)
            .ok_or_else(|| anyhow!("recognizer '{}' not registered", name))?;
        self.default_index = Some(index);
        Ok(())
    }

    /// Name of the default backend.
    pub fn default_name(&self) -> Option<&'static str> {
        self.default_index.map(|i| self.backends[i].name())
    }

    /// List registered backends in registration order.
    pub fn list(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    fn attempt_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = self.default_index.into_iter().collect();
        order.extend((0..self.backends.len()).filter(|i| Some(*i) != self.default_index));
        order
    }
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRecognizer for RecognizerRegistry {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RecognizedObject>> {
        let mut last_error = None;
        for index in self.attempt_order() {
            let backend = &mut self.backends[index];
            match backend.detect(frame) {
                Ok(mut objects) => {
                    let name = backend.name();
                    for object in objects.iter_mut().filter(|o| o.method.is_empty()) {
                        object.method = name.to_string();
                    }
                    return Ok(objects);
                }
                Err(err) => {
                    log::warn!("recognizer '{}' failed, trying next: {:#}", backend.name(), err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("no recognizer registered")))
    }

    fn warm_up(&mut self) -> Result<()> {
        for backend in &mut self.backends {
            backend.warm_up()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::StubRecognizer;
    use crate::detect::result::BBox;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, 0.0, 1)
    }

    fn banana(method: &str) -> RecognizedObject {
        RecognizedObject::new("banana", 0.9, BBox::new(0.0, 0.0, 10.0, 10.0), method)
    }

    #[test]
    fn first_registered_is_default() {
        let registry = RecognizerRegistry::new()
            .with(StubRecognizer::none("yolo"))
            .with(StubRecognizer::none("color"));
        assert_eq!(registry.default_name(), Some("yolo"));
        assert_eq!(registry.list(), vec!["yolo", "color"]);
    }

    #[test]
    fn falls_back_when_default_fails() {
        let fallback = StubRecognizer::steady("color", vec![banana("")]);
        let fallback_calls = fallback.calls();
        let mut registry = RecognizerRegistry::new()
            .with(StubRecognizer::failing("yolo"))
            .with(fallback);

        let objects = registry.detect(&frame()).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].method, "color");
        assert_eq!(fallback_calls.get(), 1);
    }

    #[test]
    fn set_default_changes_attempt_order() {
        let yolo = StubRecognizer::steady("yolo", vec![banana("yolo")]);
        let yolo_calls = yolo.calls();
        let mut registry = RecognizerRegistry::new()
            .with(yolo)
            .with(StubRecognizer::steady("color", vec![banana("color")]));
        registry.set_default("color").unwrap();

        let objects = registry.detect(&frame()).unwrap();
        assert_eq!(objects[0].method, "color");
        assert_eq!(yolo_calls.get(), 0);
        assert!(registry.set_default("missing").is_err());
    }

    #[test]
    fn empty_or_all_failing_registry_errors() {
        let mut empty = RecognizerRegistry::new();
        assert!(empty.detect(&frame()).is_err());

        let mut broken = RecognizerRegistry::new().with(StubRecognizer::failing("yolo"));
        assert!(broken.detect(&frame()).is_err());
    }
}
