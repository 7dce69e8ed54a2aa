mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{DetectionCapability, DetectorBackend};
#[cfg(feature = "backend-opencv")]
pub use backends::{HogBackend, HogParams};
pub use backends::{MotionBackend, MotionParams, StubBackend};
pub use registry::{BackendRegistry, SharedBackend};
pub use result::{Detection, DetectionResult};
