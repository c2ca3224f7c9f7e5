//! In-process camera service producing a moving test pattern.
//!
//! Devices open asynchronously on a helper thread, and every active
//! repeating request gets its own frame thread that fills each frame-queue
//! target at the configured frame rate.

use {
    crate::{
        CameraDevice, CameraError, CameraService, CaptureRequestSpec, DeviceCallbacks,
        DeviceDescriptor, DeviceQuery, Facing, FrameProducer, OutputTarget, PixelFormat,
        SessionCallbacks, SessionHandle,
    },
    base::Vec2,
    std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread::JoinHandle,
        time::{Duration, Instant},
    },
};

const DEFAULT_FRAME_RATE: f32 = 30.0;

// pattern scroll speed in pixels per frame
const PATTERN_STEP: u64 = 4;

pub struct SyntheticCameraService {
    devices: Vec<DeviceDescriptor>,
    frame_rate: f32,
    open_delay: Duration,
}

impl Default for SyntheticCameraService {
    /// A back camera "0" and a front camera "1", both offering YUV and RGB
    /// at 640x480 and 1280x720.
    fn default() -> Self {
        let device = |id: &str, facing| {
            DeviceDescriptor::new(id, facing)
                .with_configuration(PixelFormat::Yuv420, Vec2::new(640, 480))
                .with_configuration(PixelFormat::Yuv420, Vec2::new(1280, 720))
                .with_configuration(PixelFormat::Rgb8, Vec2::new(640, 480))
                .with_configuration(PixelFormat::Rgb8, Vec2::new(1280, 720))
        };
        Self::new(vec![device("0", Facing::Back), device("1", Facing::Front)])
    }
}

impl SyntheticCameraService {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            frame_rate: DEFAULT_FRAME_RATE,
            open_delay: Duration::ZERO,
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate.max(1.0);
        self
    }

    /// Simulated time a device takes to open.
    pub fn with_open_delay(mut self, open_delay: Duration) -> Self {
        self.open_delay = open_delay;
        self
    }
}

impl DeviceQuery for SyntheticCameraService {
    fn device_ids(&self) -> Result<Vec<String>, CameraError> {
        Ok(self.devices.iter().map(|d| d.id.clone()).collect())
    }

    fn characteristics(&self, id: &str) -> Result<DeviceDescriptor, CameraError> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| CameraError::DeviceUnavailable(format!("unknown camera {id}")))
    }
}

impl CameraService for SyntheticCameraService {
    fn open_device(&self, id: &str, callbacks: DeviceCallbacks) -> Result<(), CameraError> {
        let descriptor = self.characteristics(id)?;
        let device = SyntheticDevice {
            id: descriptor.id,
            frame_interval: Duration::from_secs_f32(1.0 / self.frame_rate),
        };
        let open_delay = self.open_delay;
        std::thread::Builder::new()
            .name("synthetic-open".to_string())
            .spawn(move || {
                std::thread::sleep(open_delay);
                callbacks.opened(Box::new(device));
            })?;
        Ok(())
    }
}

struct SyntheticDevice {
    id: String,
    frame_interval: Duration,
}

impl CameraDevice for SyntheticDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_session(
        &mut self,
        targets: &[OutputTarget],
        callbacks: SessionCallbacks,
    ) -> Result<(), CameraError> {
        log::debug!(
            "synthetic camera {}: configuring {} target(s)",
            self.id,
            targets.len()
        );
        callbacks.configured(Box::new(SyntheticSession {
            frame_interval: self.frame_interval,
            cancel: Arc::new(AtomicBool::new(false)),
            join_handle: None,
        }));
        Ok(())
    }

    fn close(&mut self) {
        log::debug!("synthetic camera {}: closed", self.id);
    }
}

struct SyntheticSession {
    frame_interval: Duration,
    cancel: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl SessionHandle for SyntheticSession {
    fn set_repeating_request(&mut self, request: &CaptureRequestSpec) -> Result<(), CameraError> {
        if self.join_handle.is_some() {
            return Err(CameraError::RequestSubmission(
                "repeating request already active".to_string(),
            ));
        }
        let producers: Vec<FrameProducer> = request.frame_queues().cloned().collect();
        let cancel = Arc::clone(&self.cancel);
        let frame_interval = self.frame_interval;

        let join_handle = std::thread::Builder::new()
            .name("synthetic-frames".to_string())
            .spawn(move || {
                let start = Instant::now();
                let mut frame_number = 0u64;
                while !cancel.load(Ordering::Relaxed) {
                    for producer in &producers {
                        if let Some(mut buffer) = producer.acquire() {
                            fill_test_pattern(&mut buffer, producer.size(), frame_number);
                            producer.submit(buffer, start.elapsed());
                        }
                    }
                    frame_number += 1;
                    std::thread::sleep(frame_interval);
                }
            })?;
        self.join_handle = Some(join_handle);
        Ok(())
    }

    fn stop_repeating(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                log::error!("synthetic frame thread panicked");
            }
        }
        self.cancel.store(false, Ordering::Relaxed);
    }

    fn close(&mut self) {
        self.stop_repeating();
    }
}

/// Vertical bars scrolling one `PATTERN_STEP` per frame.
fn fill_test_pattern(data: &mut [u8], size: Vec2<usize>, frame_number: u64) {
    let width = size.x.max(1);
    let offset = frame_number * PATTERN_STEP;
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = ((i % width) as u64 + offset) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_scrolls() {
        let size = Vec2::new(8, 2);
        let mut first = vec![0u8; 16];
        let mut second = vec![0u8; 16];
        fill_test_pattern(&mut first, size, 0);
        fill_test_pattern(&mut second, size, 1);

        assert_eq!(&first[..4], &[0, 1, 2, 3]);
        assert_eq!(first[8], 0);
        assert_eq!(second[0], PATTERN_STEP as u8);
    }

    #[test]
    fn test_unknown_device() {
        let service = SyntheticCameraService::default();
        assert!(service.characteristics("7").is_err());
        assert_eq!(service.device_ids().unwrap(), vec!["0", "1"]);
    }
}
