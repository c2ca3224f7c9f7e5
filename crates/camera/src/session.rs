//! Capture session state machine.
//!
//! `CaptureSession` lives on the camera worker thread and is only ever
//! touched from there, so it needs no locking. Transitions:
//!
//! | from                     | trigger                        | to          |
//! |--------------------------|--------------------------------|-------------|
//! | CLOSED                   | `open`                         | OPENING     |
//! | OPENING                  | device opened                  | OPENED      |
//! | OPENING                  | open failed / disconnected     | CLOSED      |
//! | OPENED                   | `start_streaming`              | CONFIGURING |
//! | CONFIGURING              | configured, request submitted  | STREAMING   |
//! | CONFIGURING              | configured, submission failed  | FAILED      |
//! | CONFIGURING              | configure failed               | FAILED      |
//! | STREAMING                | `stop`                         | OPENED      |
//! | OPENED..FAILED           | device disconnected / error    | CLOSED      |
//! | any                      | `close`                        | CLOSED      |
//!
//! Every platform callback carries the generation of the attempt that
//! created it. Callbacks from an attempt that was cancelled or superseded
//! are suppressed, and any handle they carry is released on the spot.

use {
    crate::{
        BufferPool, CameraConfig, CameraDevice, CameraError, CameraService, CaptureRequestSpec,
        DeviceCallbacks, Frame, FrameProducer, FrameSink, FrameStats, OutputTarget, PooledBuffer,
        SessionCallbacks, SessionHandle,
        command::{Command, PlatformEvent, Reply},
    },
    std::{fmt, sync::Arc, time::Duration},
    tokio::sync::{broadcast, mpsc, watch},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Closed,
    Opening,
    Opened,
    Configuring,
    Streaming,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Closed => write!(f, "closed"),
            SessionState::Opening => write!(f, "opening"),
            SessionState::Opened => write!(f, "opened"),
            SessionState::Configuring => write!(f, "configuring"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// Asynchronous notifications not tied to a single operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    DeviceLost(CameraError),
    CaptureFailed { frame_number: u64 },
}

pub struct CaptureSession {
    service: Arc<dyn CameraService>,
    commands: mpsc::UnboundedSender<Command>,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    stats: Arc<FrameStats>,
    next_generation: u64,
    device_generation: Option<u64>,
    stream_generation: Option<u64>,
    config: Option<CameraConfig>,
    sink: Option<Box<dyn FrameSink>>,
    device: Option<Box<dyn CameraDevice>>,
    session: Option<Box<dyn SessionHandle>>,
    request: Option<CaptureRequestSpec>,
    pool: Option<BufferPool>,
    pending_open: Option<Reply<()>>,
    pending_start: Option<Reply<()>>,
    sequence: u64,
}

impl CaptureSession {
    pub(crate) fn new(
        service: Arc<dyn CameraService>,
        commands: mpsc::UnboundedSender<Command>,
        state_tx: watch::Sender<SessionState>,
        events: broadcast::Sender<SessionEvent>,
        stats: Arc<FrameStats>,
    ) -> Self {
        Self {
            service,
            commands,
            state: SessionState::Closed,
            state_tx,
            events,
            stats,
            next_generation: 0,
            device_generation: None,
            stream_generation: None,
            config: None,
            sink: None,
            device: None,
            session: None,
            request: None,
            pool: None,
            pending_open: None,
            pending_start: None,
            sequence: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Begin opening `device_id` with the stream settings in `config`.
    pub(crate) fn open(&mut self, device_id: &str, mut config: CameraConfig, reply: Reply<()>) {
        if self.state != SessionState::Closed {
            let _ = reply.send(Err(self.invalid("open")));
            return;
        }

        let generation = self.next_generation();
        self.device_generation = Some(generation);
        self.sink = config.take_sink();
        self.config = Some(config);
        self.set_state(SessionState::Opening);

        let callbacks = DeviceCallbacks::new(self.commands.clone(), generation);
        if let Err(error) = self.service.open_device(device_id, callbacks) {
            log::warn!("failed to open camera {}: {}", device_id, error);
            self.reset();
            self.set_state(SessionState::Closed);
            let _ = reply.send(Err(unavailable(error)));
            return;
        }
        self.pending_open = Some(reply);
    }

    /// Configure a session against every configured target and, once it is
    /// configured, submit the repeating preview request.
    pub(crate) fn start_streaming(&mut self, reply: Reply<()>) {
        if self.state != SessionState::Opened {
            let _ = reply.send(Err(self.invalid("start preview")));
            return;
        }

        let generation = self.next_generation();
        let (targets, pool) = match self.build_targets(generation) {
            Ok(built) => built,
            Err(error) => {
                log::error!("cannot build output targets: {}", error);
                let _ = reply.send(Err(error));
                return;
            }
        };
        if targets.is_empty() {
            let _ = reply.send(Err(CameraError::SessionConfiguration(
                "no output targets configured".to_string(),
            )));
            return;
        }
        self.stream_generation = Some(generation);
        self.pool = pool;
        self.request = Some(CaptureRequestSpec::preview(targets.clone()));
        self.set_state(SessionState::Configuring);

        let callbacks = SessionCallbacks::new(self.commands.clone(), generation);
        let result = match self.device.as_mut() {
            Some(device) => device.create_session(&targets, callbacks),
            None => Err(CameraError::DeviceUnavailable("no open device".to_string())),
        };
        match result {
            Ok(()) => self.pending_start = Some(reply),
            Err(error) => {
                log::error!("failed to create capture session: {}", error);
                self.release_stream();
                self.set_state(SessionState::Failed);
                let _ = reply.send(Err(CameraError::SessionConfiguration(error.to_string())));
            }
        }
    }

    // display surfaces first, then the frame queue if a sink is attached
    fn build_targets(
        &self,
        generation: u64,
    ) -> Result<(Vec<OutputTarget>, Option<BufferPool>), CameraError> {
        let Some(config) = self.config.as_ref() else {
            return Ok((Vec::new(), None));
        };
        let mut targets: Vec<OutputTarget> = config
            .displays()
            .iter()
            .copied()
            .map(OutputTarget::Display)
            .collect();
        if self.sink.is_none() {
            return Ok((targets, None));
        }
        let buffer_len = config.format().frame_len(config.size()).ok_or_else(|| {
            CameraError::SessionConfiguration(format!(
                "{} {} frames do not fit in memory",
                config.size(),
                config.format()
            ))
        })?;
        let pool = BufferPool::new(config.pool_capacity(), buffer_len);
        targets.push(OutputTarget::FrameQueue(FrameProducer::new(
            pool.clone(),
            config.size(),
            config.format(),
            self.commands.clone(),
            generation,
            Arc::clone(&self.stats),
        )));
        Ok((targets, Some(pool)))
    }

    /// Stop streaming but keep the device open for a later restart.
    pub(crate) fn stop(&mut self) -> Result<(), CameraError> {
        match self.state {
            SessionState::Streaming => {
                log::info!("stopping preview");
                self.release_stream();
                self.set_state(SessionState::Opened);
                Ok(())
            }
            SessionState::Opened => Ok(()),
            _ => Err(self.invalid("stop")),
        }
    }

    /// Release everything and return to CLOSED. Safe in every state; a
    /// second call finds nothing left to release.
    pub(crate) fn close(&mut self) {
        if let Some(reply) = self.pending_open.take() {
            let _ = reply.send(Err(CameraError::Cancelled));
        }
        if let Some(reply) = self.pending_start.take() {
            let _ = reply.send(Err(CameraError::Cancelled));
        }
        if self.state == SessionState::Closed && self.device.is_none() {
            self.reset();
            return;
        }
        log::info!("closing camera session");
        self.teardown();
        self.set_state(SessionState::Closed);
    }

    pub(crate) fn handle_platform(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::DeviceOpened { generation, device } => {
                self.on_device_opened(generation, device)
            }
            PlatformEvent::DeviceOpenFailed { generation, reason } => {
                self.on_device_gone(generation, CameraError::DeviceUnavailable(reason))
            }
            PlatformEvent::DeviceDisconnected { generation } => self.on_device_gone(
                generation,
                CameraError::DeviceUnavailable("device disconnected".to_string()),
            ),
            PlatformEvent::DeviceError { generation, reason } => {
                self.on_device_gone(generation, CameraError::DeviceUnavailable(reason))
            }
            PlatformEvent::SessionConfigured {
                generation,
                session,
            } => self.on_configured(generation, session),
            PlatformEvent::SessionConfigureFailed { generation, reason } => {
                self.on_configure_failed(generation, reason)
            }
            PlatformEvent::FrameAvailable {
                generation,
                buffer,
                timestamp,
            } => self.on_frame(generation, buffer, timestamp),
            PlatformEvent::CaptureFailed {
                generation,
                frame_number,
            } => {
                if self.is_streaming(generation) {
                    log::warn!("capture failed for frame {}", frame_number);
                    let _ = self
                        .events
                        .send(SessionEvent::CaptureFailed { frame_number });
                }
            }
        }
    }

    fn on_device_opened(&mut self, generation: u64, mut device: Box<dyn CameraDevice>) {
        if self.device_generation != Some(generation) || self.state != SessionState::Opening {
            log::debug!("releasing camera {} opened after cancel", device.id());
            device.close();
            return;
        }
        log::info!("camera {} opened", device.id());
        self.device = Some(device);
        self.set_state(SessionState::Opened);
        if let Some(reply) = self.pending_open.take() {
            let _ = reply.send(Ok(()));
        }
    }

    // open failure, disconnect and device error all end here
    fn on_device_gone(&mut self, generation: u64, error: CameraError) {
        if self.device_generation != Some(generation) {
            log::debug!("ignoring stale device callback: {}", error);
            return;
        }
        match self.state {
            SessionState::Closed => {}
            SessionState::Opening => {
                log::warn!("camera open failed: {}", error);
                self.reset();
                self.set_state(SessionState::Closed);
                if let Some(reply) = self.pending_open.take() {
                    let _ = reply.send(Err(error));
                }
            }
            _ => {
                let reason = match error {
                    CameraError::DeviceUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                log::error!("camera lost while {}: {}", self.state, reason);
                let lost = CameraError::DeviceLost(reason);
                if let Some(reply) = self.pending_start.take() {
                    let _ = reply.send(Err(lost.clone()));
                }
                self.teardown();
                self.set_state(SessionState::Closed);
                let _ = self.events.send(SessionEvent::DeviceLost(lost));
            }
        }
    }

    fn on_configured(&mut self, generation: u64, mut session: Box<dyn SessionHandle>) {
        if self.stream_generation != Some(generation) || self.state != SessionState::Configuring {
            log::debug!("releasing capture session configured after cancel");
            session.close();
            return;
        }
        let Some(request) = self.request.as_ref() else {
            session.close();
            return;
        };

        let result = session.set_repeating_request(request);
        let reply = self.pending_start.take();
        match result {
            Ok(()) => {
                log::info!("preview streaming");
                self.session = Some(session);
                self.sequence = 0;
                self.set_state(SessionState::Streaming);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
            }
            Err(error) => {
                log::error!("failed to submit repeating request: {}", error);
                self.request = None;
                session.close();
                self.release_stream();
                self.set_state(SessionState::Failed);
                if let Some(reply) = reply {
                    let _ = reply.send(Err(CameraError::RequestSubmission(error.to_string())));
                }
            }
        }
    }

    fn on_configure_failed(&mut self, generation: u64, reason: String) {
        if self.stream_generation != Some(generation) || self.state != SessionState::Configuring {
            log::debug!("ignoring stale configure failure: {}", reason);
            return;
        }
        log::error!("capture session configuration failed: {}", reason);
        self.release_stream();
        self.set_state(SessionState::Failed);
        if let Some(reply) = self.pending_start.take() {
            let _ = reply.send(Err(CameraError::SessionConfiguration(reason)));
        }
    }

    fn on_frame(&mut self, generation: u64, buffer: PooledBuffer, timestamp: Duration) {
        if !self.is_streaming(generation) {
            // dropping the buffer reclaims it
            log::debug!("discarding frame that arrived while {}", self.state);
            self.stats.record_discarded();
            return;
        }
        let (Some(sink), Some(config)) = (self.sink.as_mut(), self.config.as_ref()) else {
            self.stats.record_discarded();
            return;
        };
        self.sequence += 1;
        let frame = Frame::new(
            buffer,
            config.size(),
            config.format(),
            self.sequence,
            timestamp,
        );
        sink.on_frame(frame);
        self.stats.record_delivered();
    }

    fn is_streaming(&self, generation: u64) -> bool {
        self.state == SessionState::Streaming && self.stream_generation == Some(generation)
    }

    // repeating request canceled, then session handle released
    fn release_session(&mut self) {
        self.stream_generation = None;
        if let Some(session) = self.session.as_mut() {
            if self.request.is_some() {
                session.stop_repeating();
            }
        }
        self.request = None;
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    fn release_pool(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close();
        }
    }

    // request and session, then buffer pool; the device stays open
    fn release_stream(&mut self) {
        self.release_session();
        self.release_pool();
    }

    // request and session, then device, then buffer pool
    fn teardown(&mut self) {
        self.release_session();
        if let Some(mut device) = self.device.take() {
            log::info!("releasing camera {}", device.id());
            device.close();
        }
        self.release_pool();
        self.reset();
    }

    // forget the attempt so late callbacks are recognised as stale
    fn reset(&mut self) {
        self.device_generation = None;
        self.stream_generation = None;
        self.config = None;
        self.sink = None;
    }

    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn invalid(&self, operation: &'static str) -> CameraError {
        CameraError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state == state {
            return;
        }
        log::debug!("session {} -> {}", self.state, state);
        self.state = state;
        self.publish_state();
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.state);
        let _ = self.events.send(SessionEvent::StateChanged(self.state));
    }
}

fn unavailable(error: CameraError) -> CameraError {
    match error {
        CameraError::DeviceUnavailable(_) | CameraError::PermissionDenied => error,
        other => CameraError::DeviceUnavailable(other.to_string()),
    }
}
