use {
    crate::{
        BufferPool, FrameStats, PixelFormat, PooledBuffer,
        command::{Command, PlatformEvent},
    },
    base::Vec2,
    std::{fmt, sync::Arc, time::Duration},
    tokio::sync::mpsc,
};

/// Opaque handle to a display surface owned by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// A display-bound output target and its pixel dimensions.
///
/// The controller attaches and detaches it but never manages its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySurface {
    pub id: SurfaceId,
    pub size: Vec2<usize>,
}

impl DisplaySurface {
    pub fn new(id: SurfaceId, size: Vec2<usize>) -> Self {
        Self { id, size }
    }
}

/// Platform-facing end of the buffered frame queue.
///
/// The backend acquires a buffer, fills it with a captured image and submits
/// it. Submissions are delivered to the `FrameSink` on the camera worker, or
/// reclaimed if the session stopped streaming in the meantime.
#[derive(Clone)]
pub struct FrameProducer {
    pool: BufferPool,
    size: Vec2<usize>,
    format: PixelFormat,
    commands: mpsc::UnboundedSender<Command>,
    generation: u64,
    stats: Arc<FrameStats>,
}

impl FrameProducer {
    pub(crate) fn new(
        pool: BufferPool,
        size: Vec2<usize>,
        format: PixelFormat,
        commands: mpsc::UnboundedSender<Command>,
        generation: u64,
        stats: Arc<FrameStats>,
    ) -> Self {
        Self {
            pool,
            size,
            format,
            commands,
            generation,
            stats,
        }
    }

    pub fn size(&self) -> Vec2<usize> {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Take a buffer for the next frame. `None` means every buffer is still
    /// held downstream (or the queue is closed) and this frame is dropped.
    pub fn acquire(&self) -> Option<PooledBuffer> {
        let buffer = self.pool.acquire();
        if buffer.is_none() && !self.pool.is_closed() {
            self.stats.record_dropped();
            log::debug!("frame queue exhausted, dropping frame");
        }
        buffer
    }

    /// Hand a filled buffer to the session.
    pub fn submit(&self, buffer: PooledBuffer, timestamp: Duration) {
        let event = PlatformEvent::FrameAvailable {
            generation: self.generation,
            buffer,
            timestamp,
        };
        // on failure the buffer is dropped with the command and reclaimed
        let _ = self.commands.send(Command::Platform(event));
    }

    /// Report that the platform failed to produce frame `frame_number`.
    pub fn capture_failed(&self, frame_number: u64) {
        let _ = self
            .commands
            .send(Command::Platform(PlatformEvent::CaptureFailed {
                generation: self.generation,
                frame_number,
            }));
    }
}

impl fmt::Debug for FrameProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameProducer")
            .field("size", &self.size)
            .field("format", &self.format)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Destination for captured frames.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    Display(DisplaySurface),
    FrameQueue(FrameProducer),
}

impl OutputTarget {
    pub fn size(&self) -> Vec2<usize> {
        match self {
            OutputTarget::Display(surface) => surface.size,
            OutputTarget::FrameQueue(producer) => producer.size(),
        }
    }

    pub fn as_frame_queue(&self) -> Option<&FrameProducer> {
        match self {
            OutputTarget::FrameQueue(producer) => Some(producer),
            OutputTarget::Display(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTemplate {
    Preview,
}

/// Capture instruction submitted as the session's repeating request.
#[derive(Debug, Clone)]
pub struct CaptureRequestSpec {
    template: RequestTemplate,
    targets: Vec<OutputTarget>,
}

impl CaptureRequestSpec {
    pub fn preview(targets: Vec<OutputTarget>) -> Self {
        Self {
            template: RequestTemplate::Preview,
            targets,
        }
    }

    pub fn template(&self) -> RequestTemplate {
        self.template
    }

    pub fn targets(&self) -> &[OutputTarget] {
        &self.targets
    }

    pub fn frame_queues(&self) -> impl Iterator<Item = &FrameProducer> {
        self.targets.iter().filter_map(OutputTarget::as_frame_queue)
    }
}
