//! Seams to the platform camera service.
//!
//! A backend implements `CameraService` (device enumeration and opening),
//! `CameraDevice` (an open device handle) and `SessionHandle` (a configured
//! capture session). Asynchronous outcomes are reported through
//! `DeviceCallbacks` and `SessionCallbacks`, which may be invoked from any
//! thread: they only post events to the camera worker.

use {
    crate::{
        CameraError, CaptureRequestSpec, DeviceDescriptor, OutputTarget,
        command::{Command, PlatformEvent},
    },
    tokio::sync::mpsc,
};

/// Read-only capability query.
pub trait DeviceQuery: Send + Sync {
    fn device_ids(&self) -> Result<Vec<String>, CameraError>;
    fn characteristics(&self, id: &str) -> Result<DeviceDescriptor, CameraError>;
}

pub trait CameraService: DeviceQuery {
    /// Start opening device `id`. Errors returned here are immediate
    /// failures; everything else arrives through `callbacks`.
    fn open_device(&self, id: &str, callbacks: DeviceCallbacks) -> Result<(), CameraError>;
}

/// An open camera device.
pub trait CameraDevice: Send {
    fn id(&self) -> &str;

    /// Start configuring a capture session against `targets`. The result
    /// arrives through `callbacks`.
    fn create_session(
        &mut self,
        targets: &[OutputTarget],
        callbacks: SessionCallbacks,
    ) -> Result<(), CameraError>;

    fn close(&mut self);
}

/// A configured capture session.
pub trait SessionHandle: Send {
    fn set_repeating_request(&mut self, request: &CaptureRequestSpec) -> Result<(), CameraError>;
    fn stop_repeating(&mut self);
    fn close(&mut self);
}

/// Answers whether the process may use the camera. Never prompts.
pub trait PermissionAuthority: Send + Sync {
    fn has_camera_permission(&self) -> bool;
}

impl<F: Fn() -> bool + Send + Sync> PermissionAuthority for F {
    fn has_camera_permission(&self) -> bool {
        self()
    }
}

/// Device state callbacks for one open attempt.
#[derive(Clone)]
pub struct DeviceCallbacks {
    commands: mpsc::UnboundedSender<Command>,
    generation: u64,
}

impl DeviceCallbacks {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, generation: u64) -> Self {
        Self {
            commands,
            generation,
        }
    }

    /// The device finished opening.
    pub fn opened(&self, device: Box<dyn CameraDevice>) {
        let event = PlatformEvent::DeviceOpened {
            generation: self.generation,
            device,
        };
        if let Err(mpsc::error::SendError(Command::Platform(PlatformEvent::DeviceOpened {
            mut device,
            ..
        }))) = self.commands.send(Command::Platform(event))
        {
            // nobody left to own the handle
            device.close();
        }
    }

    pub fn open_failed(&self, reason: impl Into<String>) {
        self.post(PlatformEvent::DeviceOpenFailed {
            generation: self.generation,
            reason: reason.into(),
        });
    }

    pub fn disconnected(&self) {
        self.post(PlatformEvent::DeviceDisconnected {
            generation: self.generation,
        });
    }

    pub fn error(&self, reason: impl Into<String>) {
        self.post(PlatformEvent::DeviceError {
            generation: self.generation,
            reason: reason.into(),
        });
    }

    fn post(&self, event: PlatformEvent) {
        if self.commands.send(Command::Platform(event)).is_err() {
            log::debug!("camera worker gone, dropping device callback");
        }
    }
}

/// Session state callbacks for one configure attempt.
#[derive(Clone)]
pub struct SessionCallbacks {
    commands: mpsc::UnboundedSender<Command>,
    generation: u64,
}

impl SessionCallbacks {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, generation: u64) -> Self {
        Self {
            commands,
            generation,
        }
    }

    pub fn configured(&self, session: Box<dyn SessionHandle>) {
        let event = PlatformEvent::SessionConfigured {
            generation: self.generation,
            session,
        };
        if let Err(mpsc::error::SendError(Command::Platform(
            PlatformEvent::SessionConfigured { mut session, .. },
        ))) = self.commands.send(Command::Platform(event))
        {
            session.close();
        }
    }

    pub fn configure_failed(&self, reason: impl Into<String>) {
        let event = PlatformEvent::SessionConfigureFailed {
            generation: self.generation,
            reason: reason.into(),
        };
        if self.commands.send(Command::Platform(event)).is_err() {
            log::debug!("camera worker gone, dropping session callback");
        }
    }
}
