#[cfg(feature = "backend-opencv")]
pub mod hog;
pub mod motion;
pub mod stub;

#[cfg(feature = "backend-opencv")]
pub use hog::{HogBackend, HogParams};
pub use motion::{MotionBackend, MotionParams};
pub use stub::StubBackend;
