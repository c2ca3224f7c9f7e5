//! Camera session core.
//!
//! This crate opens a camera device through a platform camera service,
//! negotiates a capture session against display surfaces and a buffered
//! frame queue, and delivers frames to a `FrameSink`. Every device and
//! session callback is serialized onto one dedicated worker thread owned by
//! `CameraController`.

pub mod completion;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod frame;
pub mod platform;
pub mod registry;
pub mod session;
pub mod synthetic;
pub mod target;

mod command;

pub use completion::Completion;
pub use config::CameraConfig;
pub use controller::CameraController;
pub use error::CameraError;
pub use format::PixelFormat;
pub use frame::{BufferPool, Frame, FrameCounts, FrameSink, FrameStats, PooledBuffer};
pub use platform::{
    CameraDevice, CameraService, DeviceCallbacks, DeviceQuery, PermissionAuthority,
    SessionCallbacks, SessionHandle,
};
pub use registry::{DeviceDescriptor, DeviceRegistry, Facing, StreamConfiguration};
pub use session::{SessionEvent, SessionState};
pub use synthetic::SyntheticCameraService;
pub use target::{
    CaptureRequestSpec, DisplaySurface, FrameProducer, OutputTarget, RequestTemplate, SurfaceId,
};
