use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;

/// Pixel layout of a captured frame, in the device's native channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    Bgr8,
    Bgra8,
    /// Anything else the backend hands back; carries the backend type code.
    Unsupported(i32),
}

impl PixelFormat {
    pub fn channels(self) -> Option<usize> {
        match self {
            PixelFormat::Gray8 => Some(1),
            PixelFormat::Bgr8 => Some(3),
            PixelFormat::Bgra8 => Some(4),
            PixelFormat::Unsupported(_) => None,
        }
    }

    pub fn label(self) -> String {
        match self {
            PixelFormat::Gray8 => "gray8".to_string(),
            PixelFormat::Bgr8 => "bgr8".to_string(),
            PixelFormat::Bgra8 => "bgra8".to_string(),
            PixelFormat::Unsupported(code) => format!("unsupported({})", code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One captured image.
///
/// Pixels sit behind an `Arc`, so clones share storage and the frame
/// is never mutated after capture.
#[derive(Clone)]
pub struct Frame {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
    format: PixelFormat,
    sequence: u64,
    captured_at: DateTime<Local>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, sequence: u64) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            format,
            sequence,
            captured_at: Local::now(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Device arrival order, assigned by the capture source.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Bytes per row, when the format is one we understand.
    pub fn stride(&self) -> Option<usize> {
        self.format.channels().map(|c| c * self.width as usize)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}
