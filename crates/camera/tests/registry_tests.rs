use {base::Vec2, camera::*};

/// Query where one camera's characteristics cannot be read.
struct FlakyQuery {
    ids: Result<Vec<String>, CameraError>,
}

impl DeviceQuery for FlakyQuery {
    fn device_ids(&self) -> Result<Vec<String>, CameraError> {
        self.ids.clone()
    }

    fn characteristics(&self, id: &str) -> Result<DeviceDescriptor, CameraError> {
        match id {
            "0" => Ok(DeviceDescriptor::new("0", Facing::Back)
                .with_configuration(PixelFormat::Yuv420, Vec2::new(1920, 1080))
                .with_configuration(PixelFormat::Jpeg, Vec2::new(4032, 3024))),
            "2" => Ok(DeviceDescriptor::new("2", Facing::Front)
                .with_configuration(PixelFormat::Yuv420, Vec2::new(640, 480))
                .with_configuration(PixelFormat::Yuv420, Vec2::new(1280, 720))),
            _ => Err(CameraError::DeviceUnavailable(format!("camera {id} busy"))),
        }
    }
}

fn flaky() -> FlakyQuery {
    FlakyQuery {
        ids: Ok(vec!["0".to_string(), "1".to_string(), "2".to_string()]),
    }
}

#[test]
fn test_enumerate_skips_unreadable_devices() {
    let registry = DeviceRegistry::enumerate(&flaky()).unwrap();
    let ids: Vec<&str> = registry
        .list_devices()
        .iter()
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(ids, vec!["0", "2"]);
}

#[test]
fn test_enumerate_propagates_listing_failure() {
    let query = FlakyQuery {
        ids: Err(CameraError::DeviceUnavailable("camera service down".to_string())),
    };
    assert_eq!(
        DeviceRegistry::enumerate(&query).unwrap_err(),
        CameraError::DeviceUnavailable("camera service down".to_string())
    );
}

#[test]
fn test_select_by_facing_and_format() {
    let registry = DeviceRegistry::enumerate(&flaky()).unwrap();

    let front = registry
        .select_device(Facing::Front, PixelFormat::Yuv420)
        .unwrap();
    assert_eq!(front.id, "2");
    let sizes: Vec<Vec2<usize>> = front.sizes(PixelFormat::Yuv420).collect();
    assert_eq!(sizes, vec![Vec2::new(640, 480), Vec2::new(1280, 720)]);

    let jpeg = registry
        .select_device(Facing::Back, PixelFormat::Jpeg)
        .unwrap();
    assert_eq!(jpeg.id, "0");
}

#[test]
fn test_select_reports_missing_format() {
    let registry = DeviceRegistry::enumerate(&flaky()).unwrap();

    let error = registry
        .select_device(Facing::Front, PixelFormat::Jpeg)
        .unwrap_err();
    assert_eq!(
        error,
        CameraError::NoMatchingDevice {
            facing: Facing::Front,
            format: PixelFormat::Jpeg,
        }
    );
    assert!(registry.find_device(Facing::External, PixelFormat::Yuv420).is_none());
}

#[test]
fn test_synthetic_service_enumerates() {
    let registry = DeviceRegistry::enumerate(&SyntheticCameraService::default()).unwrap();
    assert_eq!(registry.list_devices().len(), 2);
    assert_eq!(
        registry
            .select_device(Facing::Front, PixelFormat::Rgb8)
            .unwrap()
            .id,
        "1"
    );
}
