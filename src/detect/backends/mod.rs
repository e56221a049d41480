pub mod stub;

pub use stub::{CallCounter, StubFiducialDetector, StubPersonDetector, StubRecognizer};
