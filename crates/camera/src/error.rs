use {
    crate::{Facing, PixelFormat, SessionState},
    std::fmt,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    NoMatchingDevice { facing: Facing, format: PixelFormat },
    PermissionDenied,
    DeviceUnavailable(String),
    SessionConfiguration(String),
    RequestSubmission(String),
    DeviceLost(String),
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    Cancelled,
    Channel(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoMatchingDevice { facing, format } => {
                write!(f, "no {facing} camera supports {format}")
            }
            CameraError::PermissionDenied => write!(f, "camera permission denied"),
            CameraError::DeviceUnavailable(msg) => write!(f, "device unavailable: {msg}"),
            CameraError::SessionConfiguration(msg) => {
                write!(f, "session configuration failed: {msg}")
            }
            CameraError::RequestSubmission(msg) => write!(f, "request submission failed: {msg}"),
            CameraError::DeviceLost(msg) => write!(f, "device lost: {msg}"),
            CameraError::InvalidState { operation, state } => {
                write!(f, "cannot {operation} while {state}")
            }
            CameraError::Cancelled => write!(f, "operation cancelled by close"),
            CameraError::Channel(msg) => write!(f, "channel error: {msg}"),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::DeviceUnavailable(err.to_string())
    }
}
