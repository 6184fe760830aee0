use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::camera::CameraController;
use crate::capture::{CaptureProperty, CaptureSource, OpenCvSource};
use crate::renderer::to_display_bitmap;
use crate::ui::viewer::{self, ViewerOptions};
use crate::utils::config::Config;
use crate::utils::{logger, snapshot};

/// One row of `camdeck devices` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub index: i32,
    pub opened: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
}

pub fn run_viewer(config: Config) -> Result<()> {
    logger::info(&format!(
        "launch: device={} resolution={} interval={}ms mode={} fill={}",
        config.device,
        config.resolution,
        config.interval_ms,
        config.mode.label(),
        config.fill
    ));

    let camera = CameraController::with_resolution(OpenCvSource::new(), config.resolution);
    let options = ViewerOptions {
        device: config.device,
        interval: Duration::from_millis(config.interval_ms),
        mode: config.mode,
        fill: config.fill,
        snapshot_dir: config.snapshot_dir,
    };

    viewer::run(camera, options)
}

/// Grab a single frame from the configured device and write it as a PNG.
pub fn capture_snapshot(config: &Config) -> Result<PathBuf> {
    let camera = CameraController::with_resolution(OpenCvSource::new(), config.resolution);
    snapshot_with(camera, config.device, &config.snapshot_dir)
}

fn snapshot_with<S: CaptureSource>(
    mut camera: CameraController<S>,
    device: i32,
    dir: &Path,
) -> Result<PathBuf> {
    camera.initialize(device)?;
    camera.start()?;

    let frame = camera
        .get_current_frame()?
        .context("camera produced no frame")?;
    let bitmap = to_display_bitmap(&frame)
        .with_context(|| format!("cannot display {} frames", frame.format().label()))?;

    let path = snapshot::save(&bitmap, dir)?;
    camera.stop();
    Ok(path)
}

/// Open indices `0..max` one after another and report what each yields.
pub fn probe_devices<S: CaptureSource>(source: &mut S, max: i32) -> Vec<DeviceInfo> {
    (0..max.max(0)).map(|index| probe_one(source, index)).collect()
}

fn probe_one<S: CaptureSource>(source: &mut S, index: i32) -> DeviceInfo {
    let mut info = DeviceInfo {
        index,
        opened: false,
        width: None,
        height: None,
        format: None,
    };

    match source.open(index) {
        Ok(true) => info.opened = true,
        Ok(false) => return info,
        Err(e) => {
            logger::debug(&format!("Probe of camera {} failed: {}", index, e));
            return info;
        }
    }

    if let Ok(Some(frame)) = source.read() {
        info.format = Some(frame.format().label());
    }
    info.width = source.get(CaptureProperty::FrameWidth).ok().map(|w| w as u32);
    info.height = source.get(CaptureProperty::FrameHeight).ok().map(|h| h as u32);

    if let Err(e) = source.release() {
        logger::error(&format!("Failed to release camera {} after probe: {}", index, e));
    }
    info
}

pub fn list_devices(max: i32) -> Result<String> {
    let mut source = OpenCvSource::new();
    let devices = probe_devices(&mut source, max);
    serde_json::to_string_pretty(&devices).context("failed to encode device list")
}
