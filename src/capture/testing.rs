//! Scripted capture source used by the unit tests in place of a camera.

use anyhow::{bail, Result};

use super::frame::{Frame, PixelFormat, Resolution};
use super::source::{CaptureProperty, CaptureSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame,
    Empty,
    Error,
}

pub struct ScriptedSource {
    pub open_succeeds: bool,
    /// Outcomes consumed front to back; once exhausted every read yields `fallback`.
    pub script: Vec<ReadOutcome>,
    pub fallback: ReadOutcome,
    /// Modes the fake device can grant; empty means anything goes.
    pub supported: Vec<Resolution>,
    pub format: PixelFormat,
    /// Pixel size of generated frames, kept tiny so tests stay cheap.
    pub frame_size: Resolution,
    /// Makes every `get` / `set` fail like a backend exception.
    pub fail_property: bool,
    pub releases: usize,
    pub reads: usize,
    opened: bool,
    requested: Resolution,
    granted: Resolution,
    next_sequence: u64,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            open_succeeds: true,
            script: Vec::new(),
            fallback: ReadOutcome::Frame,
            supported: Vec::new(),
            format: PixelFormat::Bgr8,
            frame_size: Resolution::new(4, 2),
            fail_property: false,
            releases: 0,
            reads: 0,
            opened: false,
            requested: Resolution::new(640, 480),
            granted: Resolution::new(640, 480),
            next_sequence: 0,
        }
    }

    pub fn failing_open() -> Self {
        Self {
            open_succeeds: false,
            ..Self::new()
        }
    }

    pub fn with_script(script: Vec<ReadOutcome>, fallback: ReadOutcome) -> Self {
        Self {
            script,
            fallback,
            ..Self::new()
        }
    }

    pub fn supporting(modes: &[Resolution]) -> Self {
        Self {
            supported: modes.to_vec(),
            ..Self::new()
        }
    }

    /// Sequence number the next generated frame will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    fn nearest_mode(&self, wanted: Resolution) -> Resolution {
        self.supported
            .iter()
            .copied()
            .min_by_key(|mode| {
                (mode.width as i64 - wanted.width as i64).abs()
                    + (mode.height as i64 - wanted.height as i64).abs()
            })
            .unwrap_or(wanted)
    }

    fn make_frame(&mut self) -> Frame {
        let channels = self.format.channels().unwrap_or(3);
        let len = self.frame_size.width as usize * self.frame_size.height as usize * channels;
        let fill = (self.next_sequence % 251) as u8;
        let frame = Frame::new(
            vec![fill; len],
            self.frame_size.width,
            self.frame_size.height,
            self.format,
            self.next_sequence,
        );
        self.next_sequence += 1;
        frame
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for ScriptedSource {
    fn open(&mut self, _index: i32) -> Result<bool> {
        self.opened = self.open_succeeds;
        Ok(self.opened)
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if !self.opened {
            bail!("scripted device is not open");
        }
        self.reads += 1;
        let outcome = if self.script.is_empty() {
            self.fallback
        } else {
            self.script.remove(0)
        };
        match outcome {
            ReadOutcome::Frame => Ok(Some(self.make_frame())),
            ReadOutcome::Empty => Ok(None),
            ReadOutcome::Error => bail!("scripted read failure"),
        }
    }

    fn release(&mut self) -> Result<()> {
        if self.opened {
            self.releases += 1;
        }
        self.opened = false;
        Ok(())
    }

    fn get(&self, property: CaptureProperty) -> Result<f64> {
        if self.fail_property {
            bail!("scripted property read failure");
        }
        Ok(match property {
            CaptureProperty::FrameWidth => self.granted.width as f64,
            CaptureProperty::FrameHeight => self.granted.height as f64,
        })
    }

    fn set(&mut self, property: CaptureProperty, value: f64) -> Result<bool> {
        if self.fail_property {
            bail!("scripted property write failure");
        }
        match property {
            CaptureProperty::FrameWidth => self.requested.width = value as u32,
            CaptureProperty::FrameHeight => self.requested.height = value as u32,
        }
        self.granted = self.nearest_mode(self.requested);
        Ok(true)
    }

    fn is_opened(&self) -> bool {
        self.opened
    }
}
