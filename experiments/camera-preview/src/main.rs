use {
    base::Vec2,
    camera::{
        CameraConfig, CameraController, DisplaySurface, Facing, Frame, SessionEvent,
        SurfaceId, SyntheticCameraService,
    },
    std::{sync::Arc, time::Duration},
    tokio::sync::mpsc,
};

const WIDTH: usize = 640;
const HEIGHT: usize = 480;
const FRAMES_PER_RUN: usize = 10;

// mean luma of the Y plane
fn mean_luma(frame: &Frame) -> u8 {
    let pixels = frame
        .size()
        .area()
        .unwrap_or(0)
        .min(frame.data().len())
        .max(1);
    let sum: u64 = frame.data()[..pixels].iter().map(|&b| b as u64).sum();
    (sum / pixels as u64) as u8
}

async fn receive_frames(frames: &mut mpsc::Receiver<(u64, Duration, u8)>) {
    for _ in 0..FRAMES_PER_RUN {
        match frames.recv().await {
            Some((sequence, timestamp, luma)) => {
                log::info!(
                    "frame {} at {:.3}s, mean luma {}",
                    sequence,
                    timestamp.as_secs_f32(),
                    luma
                );
            }
            None => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    base::init_stdout_logger();

    let service = SyntheticCameraService::default()
        .with_frame_rate(30.0)
        .with_open_delay(Duration::from_millis(50));
    let controller = CameraController::new(Arc::new(service), Arc::new(|| true))?;

    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::StateChanged(state) => log::info!("camera state: {}", state),
                SessionEvent::DeviceLost(error) => log::error!("{}", error),
                SessionEvent::CaptureFailed { frame_number } => {
                    log::warn!("capture failed for frame {}", frame_number)
                }
            }
        }
    });

    // the sink runs on the camera worker, so it only extracts what it needs
    let (tx, mut frames) = mpsc::channel(FRAMES_PER_RUN);
    let config = CameraConfig::default()
        .with_facing(Facing::Front)
        .with_size(Vec2::new(WIDTH, HEIGHT))
        .with_display(DisplaySurface::new(SurfaceId(1), Vec2::new(WIDTH, HEIGHT)))
        .with_sink(move |frame: Frame| {
            let _ = tx.try_send((frame.sequence(), frame.timestamp(), mean_luma(&frame)));
        });

    controller.open(config).await?;
    controller.start_preview().await?;
    receive_frames(&mut frames).await;

    controller.stop().await?;
    log::info!("preview stopped, restarting");
    controller.start_preview().await?;
    receive_frames(&mut frames).await;

    controller.close().await?;
    let stats = controller.stats();
    log::info!(
        "delivered {}, dropped {}, discarded {}",
        stats.delivered,
        stats.dropped,
        stats.discarded
    );
    Ok(())
}
