use anyhow::Result;
use fast_image_resize as fr;
use fr::images::Image;
use rayon::prelude::*;

use super::cell::CellData;
use super::presentation::Bitmap;

/// Half-block cells for a `width` x `height / 2` terminal area.
pub struct FrameProcessor {
    pub width: usize,
    pub height: usize,
}

impl FrameProcessor {
    /// `width` columns by `height` pixel rows (two per terminal row).
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Scale `bitmap` into a `cols` x `rows` terminal area and build its cells.
    pub fn fit_bitmap(bitmap: &Bitmap, cols: u16, rows: u16, fill: bool) -> Result<Vec<CellData>> {
        let processor = Self::new(cols.max(1) as usize, rows.max(1) as usize * 2);
        let canvas = processor.scale_to_canvas(bitmap, fill)?;
        Ok(processor.process_frame(&canvas))
    }

    /// Aspect-preserving resize into an RGB canvas of exactly `width` x `height`,
    /// letterboxed, or center-cropped when `fill` is set.
    pub fn scale_to_canvas(&self, bitmap: &Bitmap, fill: bool) -> Result<Vec<u8>> {
        let target_w = self.width as u32;
        let target_h = self.height as u32;
        let mut canvas = vec![0u8; self.width * self.height * 3];

        if bitmap.width == 0 || bitmap.height == 0 {
            return Ok(canvas);
        }

        let scale_w = target_w as f64 / bitmap.width as f64;
        let scale_h = target_h as f64 / bitmap.height as f64;
        let scale = if fill { scale_w.max(scale_h) } else { scale_w.min(scale_h) };
        let new_w = ((bitmap.width as f64 * scale).round() as u32).max(1);
        let new_h = ((bitmap.height as f64 * scale).round() as u32).max(1);

        let src_image = Image::from_vec_u8(bitmap.width, bitmap.height, bitmap.to_rgb(), fr::PixelType::U8x3)?;
        let mut dst_image = Image::new(new_w, new_h, fr::PixelType::U8x3);
        let mut resizer = fr::Resizer::new();
        resizer.resize(&src_image, &mut dst_image, None)?;
        let scaled = dst_image.buffer();

        // Source and destination windows, one of which is the whole canvas axis
        let (src_x, dst_x, copy_w) = if new_w > target_w {
            ((new_w - target_w) / 2, 0, target_w)
        } else {
            (0, (target_w - new_w) / 2, new_w)
        };
        let (src_y, dst_y, copy_h) = if new_h > target_h {
            ((new_h - target_h) / 2, 0, target_h)
        } else {
            (0, (target_h - new_h) / 2, new_h)
        };

        let row_bytes = copy_w as usize * 3;
        for y in 0..copy_h as usize {
            let src_offset = ((src_y as usize + y) * new_w as usize + src_x as usize) * 3;
            let dst_offset = ((dst_y as usize + y) * self.width + dst_x as usize) * 3;
            if src_offset + row_bytes <= scaled.len() && dst_offset + row_bytes <= canvas.len() {
                canvas[dst_offset..dst_offset + row_bytes]
                    .copy_from_slice(&scaled[src_offset..src_offset + row_bytes]);
            }
        }

        Ok(canvas)
    }

    pub fn process_frame(&self, pixel_data: &[u8]) -> Vec<CellData> {
        let mut cells = vec![CellData::default(); self.width * (self.height / 2)];
        self.process_frame_into(pixel_data, &mut cells);
        cells
    }

    pub fn process_frame_into(&self, pixel_data: &[u8], cells: &mut [CellData]) {
        let w = self.width;
        let term_height = self.height / 2;

        if w == 0 || cells.len() != w * term_height {
            return;
        }

        let chunk_size = if w * term_height > 10000 {
            2000
        } else {
            (w * term_height / rayon::current_num_threads().max(1)).max(1)
        };

        cells.par_chunks_mut(chunk_size)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let start_idx = chunk_idx * chunk_size;

                for (i, cell) in chunk.iter_mut().enumerate() {
                    let idx = start_idx + i;
                    let cx = idx % w;
                    let cy = idx / w;

                    let get_pixel = |x: usize, y: usize| -> (u8, u8, u8) {
                        let offset = (y * w + x) * 3;
                        if offset + 2 < pixel_data.len() {
                            (pixel_data[offset], pixel_data[offset + 1], pixel_data[offset + 2])
                        } else {
                            (0, 0, 0)
                        }
                    };

                    *cell = CellData {
                        char: '▀',
                        fg: get_pixel(cx, cy * 2),
                        bg: get_pixel(cx, cy * 2 + 1),
                    };
                }
            });
    }
}
