use {
    crate::{CameraConfig, CameraDevice, CameraError, PooledBuffer, SessionHandle},
    std::time::Duration,
    tokio::sync::oneshot,
};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, CameraError>>;

/// Work item for the camera worker. Commands run strictly in queue order.
pub(crate) enum Command {
    Open {
        config: CameraConfig,
        reply: Reply<()>,
    },
    StartPreview {
        reply: Reply<()>,
    },
    Stop {
        reply: Reply<()>,
    },
    Close {
        reply: Reply<()>,
    },
    Platform(PlatformEvent),
    Shutdown,
}

/// Callback from the platform camera service, tagged with the generation of
/// the attempt it belongs to.
pub(crate) enum PlatformEvent {
    DeviceOpened {
        generation: u64,
        device: Box<dyn CameraDevice>,
    },
    DeviceOpenFailed {
        generation: u64,
        reason: String,
    },
    DeviceDisconnected {
        generation: u64,
    },
    DeviceError {
        generation: u64,
        reason: String,
    },
    SessionConfigured {
        generation: u64,
        session: Box<dyn SessionHandle>,
    },
    SessionConfigureFailed {
        generation: u64,
        reason: String,
    },
    FrameAvailable {
        generation: u64,
        buffer: PooledBuffer,
        timestamp: Duration,
    },
    CaptureFailed {
        generation: u64,
        frame_number: u64,
    },
}
