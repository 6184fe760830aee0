pub mod device;
pub mod frame;
pub mod source;

#[cfg(test)]
pub mod testing;

pub use device::OpenCvSource;
pub use frame::{Frame, PixelFormat, Resolution};
pub use source::{CaptureProperty, CaptureSource};
