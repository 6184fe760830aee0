use anyhow::{anyhow, Result};
use opencv::{core, prelude::*, videoio};

use super::frame::{Frame, PixelFormat};
use super::source::{CaptureProperty, CaptureSource};

/// Camera device backed by OpenCV `VideoCapture`.
pub struct OpenCvSource {
    capture: Option<videoio::VideoCapture>,
    index: Option<i32>,
    next_sequence: u64,
}

impl OpenCvSource {
    pub fn new() -> Self {
        Self {
            capture: None,
            index: None,
            next_sequence: 0,
        }
    }

    fn property_id(property: CaptureProperty) -> i32 {
        match property {
            CaptureProperty::FrameWidth => videoio::CAP_PROP_FRAME_WIDTH,
            CaptureProperty::FrameHeight => videoio::CAP_PROP_FRAME_HEIGHT,
        }
    }

    fn pixel_format(mat: &Mat) -> PixelFormat {
        match mat.typ() {
            core::CV_8UC1 => PixelFormat::Gray8,
            core::CV_8UC3 => PixelFormat::Bgr8,
            core::CV_8UC4 => PixelFormat::Bgra8,
            other => PixelFormat::Unsupported(other),
        }
    }
}

impl Default for OpenCvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for OpenCvSource {
    fn open(&mut self, index: i32) -> Result<bool> {
        if self.capture.is_some() {
            self.release()?;
        }

        // CAP_ANY lets OpenCV pick the platform backend
        // (AVFoundation on macOS, Media Foundation on Windows, V4L2 on Linux)
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
        let opened = capture.is_opened()?;

        crate::utils::logger::debug(&format!(
            "VideoCapture::new({}) -> opened={}",
            index, opened
        ));

        if opened {
            self.capture = Some(capture);
            self.index = Some(index);
        }
        Ok(opened)
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| anyhow!("capture device is not open"))?;

        let mut mat = Mat::default();
        if !capture.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }

        let format = Self::pixel_format(&mat);
        let width = mat.cols().max(0) as u32;
        let height = mat.rows().max(0) as u32;

        // Padded rows come back from some backends; cloning compacts them
        let data = if mat.is_continuous() {
            mat.data_bytes()?.to_vec()
        } else {
            mat.try_clone()?.data_bytes()?.to_vec()
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Ok(Some(Frame::new(data, width, height, format, sequence)))
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut capture) = self.capture.take() {
            capture.release()?;
            crate::utils::logger::debug(&format!(
                "Released capture device {}",
                self.index.map(|i| i.to_string()).unwrap_or_else(|| "?".to_string())
            ));
        }
        self.index = None;
        Ok(())
    }

    fn get(&self, property: CaptureProperty) -> Result<f64> {
        let capture = self
            .capture
            .as_ref()
            .ok_or_else(|| anyhow!("capture device is not open"))?;
        Ok(capture.get(Self::property_id(property))?)
    }

    fn set(&mut self, property: CaptureProperty, value: f64) -> Result<bool> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| anyhow!("capture device is not open"))?;
        Ok(capture.set(Self::property_id(property), value)?)
    }

    fn is_opened(&self) -> bool {
        self.capture
            .as_ref()
            .map(|capture| capture.is_opened().unwrap_or(false))
            .unwrap_or(false)
    }
}

impl Drop for OpenCvSource {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
