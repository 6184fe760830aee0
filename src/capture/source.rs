use anyhow::Result;

use super::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureProperty {
    FrameWidth,
    FrameHeight,
}

/// A capture device that hands out frames on demand, one at a time, in
/// arrival order. Reads block; there is no seeking.
pub trait CaptureSource {
    /// Open device `index`, returning whether the device reports itself opened.
    fn open(&mut self, index: i32) -> Result<bool>;

    /// Grab the next frame. `Ok(None)` means the device produced nothing
    /// (end of stream or an empty image).
    fn read(&mut self) -> Result<Option<Frame>>;

    fn release(&mut self) -> Result<()>;

    fn get(&self, property: CaptureProperty) -> Result<f64>;

    /// Request a property value. The device may accept and still pick a
    /// different value; read it back with [`CaptureSource::get`].
    fn set(&mut self, property: CaptureProperty, value: f64) -> Result<bool>;

    fn is_opened(&self) -> bool;
}
