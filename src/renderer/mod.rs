pub mod cell;
pub mod display;
pub mod presentation;
pub mod processor;

pub use display::{DisplayMode, FrameView};
pub use presentation::{to_display_bitmap, Bitmap, BitmapFormat};
pub use processor::FrameProcessor;
