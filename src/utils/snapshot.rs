use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::renderer::{Bitmap, BitmapFormat};

/// Named after the moment the frame was captured, not when it is saved.
pub fn snapshot_file_name(captured_at: DateTime<Local>) -> String {
    format!("snapshot_{}.png", captured_at.format("%Y%m%d-%H%M%S-%3f"))
}

/// Write `bitmap` as a PNG under `dir`, creating the directory if needed.
pub fn save(bitmap: &Bitmap, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(snapshot_file_name(bitmap.captured_at));
    save_to(bitmap, &path)?;
    Ok(path)
}

pub fn save_to(bitmap: &Bitmap, path: &Path) -> Result<()> {
    let color = match bitmap.format {
        BitmapFormat::Gray8 => image::ColorType::L8,
        BitmapFormat::Rgb8 => image::ColorType::Rgb8,
        BitmapFormat::Rgba8 => image::ColorType::Rgba8,
    };
    image::save_buffer(path, &bitmap.pixels, bitmap.width, bitmap.height, color)
        .with_context(|| format!("failed to write {}", path.display()))?;
    crate::utils::logger::info(&format!("Snapshot saved to {}", path.display()));
    Ok(())
}
