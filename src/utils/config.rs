use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::Resolution;
use crate::renderer::DisplayMode;
use crate::shared::constants;

/// Viewer settings, layered defaults < config file < command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub device: i32,
    pub resolution: Resolution,
    pub interval_ms: u64,
    pub mode: DisplayMode,
    pub fill: bool,
    pub snapshot_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: constants::DEFAULT_DEVICE_INDEX,
            resolution: constants::DEFAULT_RESOLUTION,
            interval_ms: constants::FRAME_INTERVAL_MS,
            mode: DisplayMode::Rgb,
            fill: false,
            snapshot_dir: PathBuf::from(constants::DEFAULT_SNAPSHOT_DIR),
        }
    }
}

/// Values given on the command line; `None` keeps the file / default value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub device: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub interval_ms: Option<u64>,
    pub mode: Option<DisplayMode>,
    pub fill: Option<bool>,
    pub snapshot_dir: Option<PathBuf>,
}

impl Config {
    /// Read `path` if it exists. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    /// `key = value` lines; `#` starts a comment. Bad values keep the default.
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for (number, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                crate::utils::logger::warn(&format!(
                    "{}:{}: expected `key = value`",
                    constants::CONFIG_FILE,
                    number + 1
                ));
                continue;
            };

            let key = key.trim();
            let value = value.trim();
            let applied = match key {
                "device" => value.parse().map(|v| config.device = v).is_ok(),
                "width" => value.parse().map(|v| config.resolution.width = v).is_ok(),
                "height" => value.parse().map(|v| config.resolution.height = v).is_ok(),
                "interval-ms" => value
                    .parse::<u64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .map(|v| config.interval_ms = v)
                    .is_some(),
                "mode" => DisplayMode::from_str(value, true)
                    .map(|v| config.mode = v)
                    .is_ok(),
                "fill" => value.parse().map(|v| config.fill = v).is_ok(),
                "snapshot-dir" => {
                    config.snapshot_dir = PathBuf::from(value);
                    true
                }
                _ => {
                    crate::utils::logger::warn(&format!(
                        "{}:{}: unknown key `{}`",
                        constants::CONFIG_FILE,
                        number + 1,
                        key
                    ));
                    true
                }
            };

            if !applied {
                crate::utils::logger::warn(&format!(
                    "{}:{}: invalid value `{}` for `{}`",
                    constants::CONFIG_FILE,
                    number + 1,
                    value,
                    key
                ));
            }
        }

        config
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(device) = overrides.device {
            self.device = device;
        }
        if let Some(width) = overrides.width {
            self.resolution.width = width;
        }
        if let Some(height) = overrides.height {
            self.resolution.height = height;
        }
        if let Some(interval) = overrides.interval_ms.filter(|v| *v > 0) {
            self.interval_ms = interval;
        }
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(fill) = overrides.fill {
            self.fill = fill;
        }
        if let Some(dir) = &overrides.snapshot_dir {
            self.snapshot_dir = dir.clone();
        }
        self
    }
}
