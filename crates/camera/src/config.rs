use {
    crate::{DisplaySurface, Facing, FrameSink, PixelFormat},
    base::Vec2,
    std::fmt,
};

// buffers reserved for the frame queue unless configured otherwise
pub const DEFAULT_POOL_CAPACITY: usize = 2;

/// Configuration for opening a camera and streaming its preview.
pub struct CameraConfig {
    facing: Facing,
    size: Vec2<usize>,
    format: PixelFormat,
    displays: Vec<DisplaySurface>,
    sink: Option<Box<dyn FrameSink>>,
    pool_capacity: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing: Facing::Back,
            size: Vec2::new(640, 480),
            format: PixelFormat::Yuv420,
            displays: Vec::new(),
            sink: None,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl CameraConfig {
    /// Set which camera to select by the direction it faces.
    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    /// Set the size of frames delivered to the sink.
    pub fn with_size(mut self, size: Vec2<usize>) -> Self {
        self.size = size;
        self
    }

    /// Set the pixel format the selected camera must support.
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Attach a display surface. May be called more than once.
    pub fn with_display(mut self, surface: DisplaySurface) -> Self {
        self.displays.push(surface);
        self
    }

    /// Attach the sink that receives frames from the buffered frame queue.
    pub fn with_sink(mut self, sink: impl FrameSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Set the number of buffers in the frame queue pool (at least 1).
    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity.max(1);
        self
    }

    // Getters
    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn size(&self) -> Vec2<usize> {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn displays(&self) -> &[DisplaySurface] {
        &self.displays
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    pub(crate) fn take_sink(&mut self) -> Option<Box<dyn FrameSink>> {
        self.sink.take()
    }
}

impl fmt::Debug for CameraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraConfig")
            .field("facing", &self.facing)
            .field("size", &self.size)
            .field("format", &self.format)
            .field("displays", &self.displays)
            .field("sink", &self.sink.is_some())
            .field("pool_capacity", &self.pool_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::SurfaceId};

    #[test]
    fn test_config_defaults() {
        let config = CameraConfig::default();

        assert_eq!(config.facing(), Facing::Back);
        assert_eq!(config.size(), Vec2::new(640, 480));
        assert_eq!(config.format(), PixelFormat::Yuv420);
        assert!(config.displays().is_empty());
        assert!(!config.has_sink());
        assert_eq!(config.pool_capacity(), 2);
    }

    #[test]
    fn test_config_builder() {
        let config = CameraConfig::default()
            .with_facing(Facing::Front)
            .with_size(Vec2::new(1280, 720))
            .with_format(PixelFormat::Rgb8)
            .with_display(DisplaySurface::new(SurfaceId(1), Vec2::new(1280, 720)))
            .with_display(DisplaySurface::new(SurfaceId(2), Vec2::new(320, 180)))
            .with_sink(|_frame: crate::Frame| {})
            .with_pool_capacity(4);

        assert_eq!(config.facing(), Facing::Front);
        assert_eq!(config.size(), Vec2::new(1280, 720));
        assert_eq!(config.format(), PixelFormat::Rgb8);
        assert_eq!(config.displays().len(), 2);
        assert!(config.has_sink());
        assert_eq!(config.pool_capacity(), 4);
    }

    #[test]
    fn test_zero_pool_capacity_is_clamped() {
        let config = CameraConfig::default().with_pool_capacity(0);
        assert_eq!(config.pool_capacity(), 1);
    }
}
