pub mod camera;
pub mod error;
pub mod frame_buffer;
pub mod launcher;

pub use camera::{CameraController, PlaybackState, SkipOutcome};
pub use error::CameraError;
