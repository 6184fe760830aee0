use crate::capture::Resolution;

pub const APP_NAME: &str = "camdeck";

pub const CONFIG_FILE: &str = "camdeck.config";
pub const ERROR_LOG_FILE: &str = "camdeck-error.log";
pub const DEBUG_LOG_FILE: &str = "camdeck-debug.log";

pub const DEFAULT_DEVICE_INDEX: i32 = 0;
pub const DEFAULT_RESOLUTION: Resolution = Resolution::new(640, 480);
pub const DEFAULT_SNAPSHOT_DIR: &str = "snapshots";

/// Rewind history depth, in frames.
pub const FRAME_BUFFER_CAPACITY: usize = 100;

/// Timer period while running (~30 fps).
pub const FRAME_INTERVAL_MS: u64 = 33;

/// Frames moved per forward / rewind key press.
pub const SKIP_STEP: i64 = 10;

pub const RESOLUTION_PRESETS: &[(Resolution, &str)] = &[
    (Resolution::new(640, 480), "640x480 (VGA)"),
    (Resolution::new(1280, 720), "1280x720 (HD)"),
    (Resolution::new(1920, 1080), "1920x1080 (Full HD)"),
];

pub const STATUS_MESSAGE_SHORT_MS: u64 = 1000;
pub const STATUS_MESSAGE_MS: u64 = 2000;
pub const STATUS_MESSAGE_LONG_MS: u64 = 3000;

pub const DEVICE_PROBE_LIMIT: i32 = 5;
