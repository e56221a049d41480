mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::{FiducialDetector, ObjectRecognizer, PersonDetector};
pub use backends::{CallCounter, StubFiducialDetector, StubPersonDetector, StubRecognizer};
pub use registry::RecognizerRegistry;
pub use result::{BBox, MarkerQuad, Point, RecognizedObject};
