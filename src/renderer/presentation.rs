use chrono::{DateTime, Local};
use rayon::prelude::*;

use crate::capture::{Frame, PixelFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapFormat {
    Gray8,
    Rgb8,
    Rgba8,
}

impl BitmapFormat {
    pub fn channels(self) -> usize {
        match self {
            BitmapFormat::Gray8 => 1,
            BitmapFormat::Rgb8 => 3,
            BitmapFormat::Rgba8 => 4,
        }
    }
}

/// Display-ready pixels in the channel order terminals and image files expect.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub format: BitmapFormat,
    pub pixels: Vec<u8>,
    /// Capture sequence of the source frame.
    pub sequence: u64,
    pub captured_at: DateTime<Local>,
}

impl Bitmap {
    /// Flatten to RGB24: gray is replicated, alpha is composited over black.
    pub fn to_rgb(&self) -> Vec<u8> {
        match self.format {
            BitmapFormat::Rgb8 => self.pixels.clone(),
            BitmapFormat::Gray8 => self.pixels.iter().flat_map(|&v| [v, v, v]).collect(),
            BitmapFormat::Rgba8 => self
                .pixels
                .chunks_exact(4)
                .flat_map(|px| {
                    let a = px[3] as u16;
                    let blend = |c: u8| ((c as u16 * a + 127) / 255) as u8;
                    [blend(px[0]), blend(px[1]), blend(px[2])]
                })
                .collect(),
        }
    }
}

/// Convert a captured frame into a bitmap the UI can draw.
///
/// Returns `None` for empty frames, truncated pixel data and pixel formats
/// we do not know how to display.
pub fn to_display_bitmap(frame: &Frame) -> Option<Bitmap> {
    if frame.is_empty() {
        return None;
    }

    let format = match frame.format() {
        PixelFormat::Gray8 => BitmapFormat::Gray8,
        PixelFormat::Bgr8 => BitmapFormat::Rgb8,
        PixelFormat::Bgra8 => BitmapFormat::Rgba8,
        PixelFormat::Unsupported(code) => {
            crate::utils::logger::warn(&format!("Unsupported frame format: {}", code));
            return None;
        }
    };

    let stride = frame.stride()?;
    let expected = stride * frame.height() as usize;
    let data = frame.data();
    if data.len() < expected {
        crate::utils::logger::warn(&format!(
            "Frame {} carries {} bytes, expected {}",
            frame.sequence(),
            data.len(),
            expected
        ));
        return None;
    }

    let mut pixels = data[..expected].to_vec();
    match format {
        BitmapFormat::Gray8 => {}
        BitmapFormat::Rgb8 | BitmapFormat::Rgba8 => {
            let channels = format.channels();
            // BGR(A) -> RGB(A): swap the first and third byte of every pixel
            pixels.par_chunks_mut(stride).for_each(|row| {
                for px in row.chunks_exact_mut(channels) {
                    px.swap(0, 2);
                }
            });
        }
    }

    Some(Bitmap {
        width: frame.width(),
        height: frame.height(),
        format,
        pixels,
        sequence: frame.sequence(),
        captured_at: frame.captured_at(),
    })
}
