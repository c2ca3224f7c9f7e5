use {
    crate::{
        CameraConfig, CameraError, CameraService, Completion, DeviceRegistry, FrameCounts,
        FrameStats, PermissionAuthority, SessionEvent, SessionState,
        command::{Command, Reply},
        session::CaptureSession,
    },
    std::sync::Arc,
    tokio::sync::{broadcast, mpsc, watch},
};

// name of the dedicated thread all camera callbacks run on
pub const WORKER_THREAD_NAME: &str = "camera-worker";

// observer events buffered per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 64;

/// Entry point for opening a camera and streaming its preview.
///
/// Every operation is queued onto a dedicated worker thread and returns a
/// `Completion` right away. Operations run in call order.
/// `start_preview` fails fast with `InvalidState` unless the camera is
/// OPENED; it is never queued behind an open that is still in flight.
pub struct CameraController {
    commands: mpsc::UnboundedSender<Command>,
    permission: Arc<dyn PermissionAuthority>,
    state: watch::Receiver<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    stats: Arc<FrameStats>,
}

impl CameraController {
    pub fn new(
        service: Arc<dyn CameraService>,
        permission: Arc<dyn PermissionAuthority>,
    ) -> Result<Self, CameraError> {
        let (commands, receiver) = mpsc::unbounded_channel::<Command>();
        let (state_tx, state) = watch::channel(SessionState::Closed);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let stats = Arc::new(FrameStats::default());

        let session = CaptureSession::new(
            Arc::clone(&service),
            commands.clone(),
            state_tx,
            events.clone(),
            Arc::clone(&stats),
        );
        let worker = Worker { service, session };

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run(receiver))
            .map_err(|e| CameraError::Channel(format!("failed to spawn camera worker: {e}")))?;

        Ok(Self {
            commands,
            permission,
            state,
            events,
            stats,
        })
    }

    /// Select a camera matching `config` and open it.
    ///
    /// Permission is checked before anything is queued; without it the
    /// completion resolves to `PermissionDenied` and the device is never
    /// touched.
    pub fn open(&self, config: CameraConfig) -> Completion<()> {
        if !self.permission.has_camera_permission() {
            log::warn!("camera permission not granted");
            return Completion::ready(Err(CameraError::PermissionDenied));
        }
        self.submit(|reply| Command::Open { config, reply })
    }

    /// Configure the capture session and start the repeating preview request.
    pub fn start_preview(&self) -> Completion<()> {
        self.submit(|reply| Command::StartPreview { reply })
    }

    /// Stop streaming and keep the device open.
    pub fn stop(&self) -> Completion<()> {
        self.submit(|reply| Command::Stop { reply })
    }

    /// Tear everything down. Idempotent, valid in any state, never blocks.
    pub fn close(&self) -> Completion<()> {
        self.submit(|reply| Command::Close { reply })
    }

    /// State as of the last transition the worker published.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Observer channel for state changes, device loss and capture failures.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> FrameCounts {
        self.stats.snapshot()
    }

    fn submit<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Completion<T> {
        let (reply, completion) = Completion::channel();
        // if the worker is gone the reply is dropped and the completion says so
        let _ = self.commands.send(command(reply));
        completion
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

struct Worker {
    service: Arc<dyn CameraService>,
    session: CaptureSession,
}

impl Worker {
    fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        log::debug!("camera worker started");
        while let Some(command) = receiver.blocking_recv() {
            match command {
                Command::Open { config, reply } => self.open(config, reply),
                Command::StartPreview { reply } => self.session.start_streaming(reply),
                Command::Stop { reply } => {
                    let _ = reply.send(self.session.stop());
                }
                Command::Close { reply } => {
                    self.session.close();
                    let _ = reply.send(Ok(()));
                }
                Command::Platform(event) => self.session.handle_platform(event),
                Command::Shutdown => {
                    self.session.close();
                    break;
                }
            }
        }
        self.drain(receiver);
        log::debug!("camera worker stopped");
    }

    // Callbacks posted after this see a closed queue and release their own
    // handles. Anything already queued is settled here.
    fn drain(&mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        receiver.close();
        while let Ok(command) = receiver.try_recv() {
            match command {
                Command::Open { reply, .. }
                | Command::StartPreview { reply }
                | Command::Stop { reply }
                | Command::Close { reply } => {
                    let _ = reply.send(Err(CameraError::Cancelled));
                }
                Command::Platform(event) => self.session.handle_platform(event),
                Command::Shutdown => {}
            }
        }
    }

    fn open(&mut self, config: CameraConfig, reply: Reply<()>) {
        if self.session.state() != SessionState::Closed {
            let _ = reply.send(Err(CameraError::InvalidState {
                operation: "open",
                state: self.session.state(),
            }));
            return;
        }

        let device = DeviceRegistry::enumerate(self.service.as_ref()).and_then(|registry| {
            registry.select_stream(config.facing(), config.format(), config.size())
        });
        match device {
            Ok(device) => {
                log::info!(
                    "opening {} camera {} at {} {}",
                    device.facing,
                    device.id,
                    config.size(),
                    config.format()
                );
                self.session.open(&device.id, config, reply);
            }
            Err(error) => {
                log::warn!("no camera to open at {}: {}", config.size(), error);
                let _ = reply.send(Err(error));
            }
        }
    }
}
