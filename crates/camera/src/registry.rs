use {
    crate::{CameraError, DeviceQuery, PixelFormat},
    base::Vec2,
    std::fmt,
};

/// Direction a camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    Front,
    Back,
    External,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Back => write!(f, "back"),
            Facing::External => write!(f, "external"),
        }
    }
}

/// One output format and size a device can stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfiguration {
    pub format: PixelFormat,
    pub size: Vec2<usize>,
}

/// Snapshot of a camera's identity and capabilities, taken at enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub facing: Facing,
    pub configurations: Vec<StreamConfiguration>,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, facing: Facing) -> Self {
        Self {
            id: id.into(),
            facing,
            configurations: Vec::new(),
        }
    }

    /// Advertise an additional stream configuration.
    pub fn with_configuration(mut self, format: PixelFormat, size: Vec2<usize>) -> Self {
        self.configurations
            .push(StreamConfiguration { format, size });
        self
    }

    pub fn supports_format(&self, format: PixelFormat) -> bool {
        self.configurations.iter().any(|c| c.format == format)
    }

    /// Sizes advertised for `format`.
    pub fn sizes(&self, format: PixelFormat) -> impl Iterator<Item = Vec2<usize>> + '_ {
        self.configurations
            .iter()
            .filter(move |c| c.format == format)
            .map(|c| c.size)
    }
}

/// Enumerated set of cameras, queried when a device has to be selected.
///
/// The registry never opens or holds a device.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceRegistry {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self { devices }
    }

    /// Build a registry from the platform's capability query.
    ///
    /// Devices whose characteristics cannot be read are skipped.
    pub fn enumerate<Q: DeviceQuery + ?Sized>(query: &Q) -> Result<Self, CameraError> {
        let mut devices = Vec::new();
        for id in query.device_ids()? {
            match query.characteristics(&id) {
                Ok(descriptor) => devices.push(descriptor),
                Err(error) => log::warn!("skipping camera {}: {}", id, error),
            }
        }
        log::debug!("enumerated {} camera(s)", devices.len());
        Ok(Self { devices })
    }

    pub fn list_devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// First device facing `facing` that advertises `format`.
    pub fn find_device(&self, facing: Facing, format: PixelFormat) -> Option<&DeviceDescriptor> {
        self.devices
            .iter()
            .find(|d| d.facing == facing && d.supports_format(format))
    }

    /// Like `find_device`, but reports a missing device as an error.
    pub fn select_device(
        &self,
        facing: Facing,
        format: PixelFormat,
    ) -> Result<DeviceDescriptor, CameraError> {
        self.find_device(facing, format)
            .cloned()
            .ok_or(CameraError::NoMatchingDevice { facing, format })
    }

    /// First device facing `facing` that advertises `size` for `format`.
    pub fn select_stream(
        &self,
        facing: Facing,
        format: PixelFormat,
        size: Vec2<usize>,
    ) -> Result<DeviceDescriptor, CameraError> {
        self.devices
            .iter()
            .find(|d| d.facing == facing && d.sizes(format).any(|s| s == size))
            .cloned()
            .ok_or(CameraError::NoMatchingDevice { facing, format })
    }
}
