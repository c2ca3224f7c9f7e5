#![allow(dead_code)]

use {
    base::Vec2,
    camera::*,
    std::{
        future::Future,
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        time::Duration,
    },
};

pub const WAIT: Duration = Duration::from_secs(2);

/// Await `future`, failing the test if it takes longer than `WAIT`.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out waiting for the camera worker")
}

pub fn vga() -> Vec2<usize> {
    Vec2::new(640, 480)
}

pub fn device(id: &str, facing: Facing) -> DeviceDescriptor {
    DeviceDescriptor::new(id, facing).with_configuration(PixelFormat::Yuv420, vga())
}

pub fn display() -> DisplaySurface {
    DisplaySurface::new(SurfaceId(1), vga())
}

pub fn granted() -> Arc<dyn PermissionAuthority> {
    Arc::new(|| true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Report success right away.
    Succeed,
    /// Report failure right away.
    Fail,
    /// Keep the callbacks; the test fires them.
    Hold,
}

struct Shared {
    devices: Vec<DeviceDescriptor>,
    open: Mutex<Outcome>,
    configure: Mutex<Outcome>,
    reject_request: AtomicBool,
    open_calls: AtomicUsize,
    requests_submitted: AtomicUsize,
    journal: Mutex<Vec<String>>,
    device_callbacks: Mutex<Vec<DeviceCallbacks>>,
    session_callbacks: Mutex<Vec<SessionCallbacks>>,
    producers: Mutex<Vec<FrameProducer>>,
    targets: Mutex<Vec<Vec<OutputTarget>>>,
}

impl Shared {
    fn record(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().push(entry.into());
    }
}

/// Scriptable camera service that records every call it receives.
#[derive(Clone)]
pub struct FakePlatform {
    shared: Arc<Shared>,
}

impl FakePlatform {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                devices,
                open: Mutex::new(Outcome::Succeed),
                configure: Mutex::new(Outcome::Succeed),
                reject_request: AtomicBool::new(false),
                open_calls: AtomicUsize::new(0),
                requests_submitted: AtomicUsize::new(0),
                journal: Mutex::new(Vec::new()),
                device_callbacks: Mutex::new(Vec::new()),
                session_callbacks: Mutex::new(Vec::new()),
                producers: Mutex::new(Vec::new()),
                targets: Mutex::new(Vec::new()),
            }),
        }
    }

    /// One front camera with id "0".
    pub fn front() -> Self {
        Self::new(vec![device("0", Facing::Front)])
    }

    pub fn set_open(&self, outcome: Outcome) {
        *self.shared.open.lock().unwrap() = outcome;
    }

    pub fn set_configure(&self, outcome: Outcome) {
        *self.shared.configure.lock().unwrap() = outcome;
    }

    pub fn reject_requests(&self) {
        self.shared.reject_request.store(true, Ordering::SeqCst);
    }

    pub fn controller(&self) -> CameraController {
        CameraController::new(Arc::new(self.clone()), granted()).unwrap()
    }

    pub fn open_calls(&self) -> usize {
        self.shared.open_calls.load(Ordering::SeqCst)
    }

    pub fn requests_submitted(&self) -> usize {
        self.shared.requests_submitted.load(Ordering::SeqCst)
    }

    pub fn journal(&self) -> Vec<String> {
        self.shared.journal.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.journal().iter().filter(|e| *e == entry).count()
    }

    pub fn device_callbacks(&self) -> DeviceCallbacks {
        self.shared
            .device_callbacks
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no device callbacks recorded")
    }

    pub fn producer(&self) -> FrameProducer {
        self.shared
            .producers
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no frame queue target recorded")
    }

    pub fn targets(&self) -> Vec<OutputTarget> {
        self.shared
            .targets
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    /// Wait until `entry` shows up in the journal `n` times.
    pub async fn wait_for(&self, entry: &str, n: usize) {
        within(async {
            while self.count(entry) < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
    }

    /// Wait until the worker has asked to open a device, then return the
    /// callbacks it handed over.
    pub async fn held_device_callbacks(&self) -> DeviceCallbacks {
        within(async {
            loop {
                if let Some(callbacks) = self.shared.device_callbacks.lock().unwrap().last() {
                    return callbacks.clone();
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
    }

    /// Wait until the worker has asked to configure a session, then return
    /// the callbacks it handed over.
    pub async fn held_session_callbacks(&self) -> SessionCallbacks {
        within(async {
            loop {
                if let Some(callbacks) = self.shared.session_callbacks.lock().unwrap().last() {
                    return callbacks.clone();
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
    }

    pub fn fake_device(&self, id: &str) -> Box<dyn CameraDevice> {
        Box::new(FakeDevice {
            id: id.to_string(),
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn fake_session(&self) -> Box<dyn SessionHandle> {
        Box::new(FakeSession {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Push one frame through the frame queue the way a backend would.
    /// Returns false if no buffer was available.
    pub fn emit_frame(&self, fill: u8) -> bool {
        let producer = self.producer();
        match producer.acquire() {
            Some(mut buffer) => {
                buffer.fill(fill);
                producer.submit(buffer, Duration::from_millis(fill as u64));
                true
            }
            None => false,
        }
    }
}

impl DeviceQuery for FakePlatform {
    fn device_ids(&self) -> Result<Vec<String>, CameraError> {
        Ok(self.shared.devices.iter().map(|d| d.id.clone()).collect())
    }

    fn characteristics(&self, id: &str) -> Result<DeviceDescriptor, CameraError> {
        self.shared
            .devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| CameraError::DeviceUnavailable(format!("no camera {id}")))
    }
}

impl CameraService for FakePlatform {
    fn open_device(&self, id: &str, callbacks: DeviceCallbacks) -> Result<(), CameraError> {
        self.shared.open_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.record(format!("open_device:{id}"));
        self.shared
            .device_callbacks
            .lock()
            .unwrap()
            .push(callbacks.clone());
        let outcome = *self.shared.open.lock().unwrap();
        match outcome {
            Outcome::Succeed => callbacks.opened(self.fake_device(id)),
            Outcome::Fail => callbacks.open_failed("camera in use"),
            Outcome::Hold => {}
        }
        Ok(())
    }
}

struct FakeDevice {
    id: String,
    shared: Arc<Shared>,
}

impl CameraDevice for FakeDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_session(
        &mut self,
        targets: &[OutputTarget],
        callbacks: SessionCallbacks,
    ) -> Result<(), CameraError> {
        self.shared.record("create_session");
        self.shared.targets.lock().unwrap().push(targets.to_vec());
        for target in targets {
            if let OutputTarget::FrameQueue(producer) = target {
                self.shared.producers.lock().unwrap().push(producer.clone());
            }
        }
        self.shared
            .session_callbacks
            .lock()
            .unwrap()
            .push(callbacks.clone());
        let outcome = *self.shared.configure.lock().unwrap();
        match outcome {
            Outcome::Succeed => callbacks.configured(Box::new(FakeSession {
                shared: Arc::clone(&self.shared),
            })),
            Outcome::Fail => callbacks.configure_failed("unsupported surface combination"),
            Outcome::Hold => {}
        }
        Ok(())
    }

    fn close(&mut self) {
        self.shared.record(format!("close_device:{}", self.id));
    }
}

struct FakeSession {
    shared: Arc<Shared>,
}

impl SessionHandle for FakeSession {
    fn set_repeating_request(&mut self, request: &CaptureRequestSpec) -> Result<(), CameraError> {
        assert_eq!(request.template(), RequestTemplate::Preview);
        if self.shared.reject_request.load(Ordering::SeqCst) {
            return Err(CameraError::DeviceUnavailable("camera busy".to_string()));
        }
        self.shared.requests_submitted.fetch_add(1, Ordering::SeqCst);
        self.shared.record("set_repeating_request");
        Ok(())
    }

    fn stop_repeating(&mut self) {
        self.shared.record("stop_repeating");
    }

    fn close(&mut self) {
        self.shared.record("close_session");
    }
}
