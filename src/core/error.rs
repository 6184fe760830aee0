use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("failed to open camera with index {index}")]
    DeviceOpen { index: i32 },
    #[error("camera {index} opened but failed to capture a test frame")]
    DeviceValidation { index: i32 },
    #[error("failed to capture frame from camera")]
    CaptureRead,
    #[error("camera is not initialized")]
    NotInitialized,
    #[error("cannot skip back {requested} frames: only {available} buffered behind the cursor")]
    InsufficientHistory { requested: usize, available: usize },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type CameraResult<T> = Result<T, CameraError>;
