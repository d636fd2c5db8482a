use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pose_pad::camera::{CaptureLoop, OpenCvCamera};
use pose_pad::config::Config;
use pose_pad::control::Controller;
use pose_pad::handoff::{frame_handoff, LatestSlot};
use pose_pad::keys::open_dispatch;
use pose_pad::overlay::{DisplayImage, OverlaySnapshot};
use pose_pad::pose::PoseDetector;
use pose_pad::render::MinifbRenderer;
use pose_pad::worker::{join_with_timeout, ControlCommand, InferenceWorker};

const INFERENCE_STOP_TIMEOUT: Duration = Duration::from_secs(5);
const CAPTURE_STOP_TIMEOUT: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("pose_pad {} ({})", env!("CARGO_PKG_VERSION"), env!("POSE_PAD_BUILD"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load_or_default(&config_path);

    let camera = OpenCvCamera::open(&config.camera).inspect_err(|e| error!("{:#}", e))?;
    let (width, height) = camera.resolution();

    info!("Loading model from {}", config.model.path);
    let detector = PoseDetector::new(&config.model.path, config.model.input_size)
        .with_context(|| format!("Failed to load model {}", config.model.path))
        .inspect_err(|e| error!("{:#}", e))?;

    let dispatch = open_dispatch(&config.keys).inspect_err(|e| error!("{:#}", e))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let display = Arc::new(LatestSlot::<DisplayImage>::new());
    let overlay = Arc::new(LatestSlot::<OverlaySnapshot>::new());
    let (frame_tx, frame_rx) = frame_handoff();
    let (command_tx, command_rx) = unbounded();

    let capture = CaptureLoop {
        camera,
        frames: frame_tx,
        display: display.clone(),
        shutdown: shutdown.clone(),
    }
    .spawn()?;

    let inference = InferenceWorker {
        source: detector,
        controller: Controller::new(&config, dispatch),
        frames: frame_rx,
        commands: command_rx,
        overlay: overlay.clone(),
        shutdown: shutdown.clone(),
    }
    .spawn()?;

    info!("Press P to pause, ESC to exit");
    let result = render_loop(&config, width, height, &display, &overlay, &command_tx);

    shutdown.store(true, Ordering::Release);
    // 推論側を先に止めてキーを解放させる。カメラ読み込みは止まっていることがある
    join_with_timeout("inference", inference, INFERENCE_STOP_TIMEOUT);
    join_with_timeout("capture", capture, CAPTURE_STOP_TIMEOUT);
    info!("Shutting down");
    result
}

fn render_loop(
    config: &Config,
    width: u32,
    height: u32,
    display: &LatestSlot<DisplayImage>,
    overlay: &LatestSlot<OverlaySnapshot>,
    commands: &Sender<ControlCommand>,
) -> Result<()> {
    let mut renderer = MinifbRenderer::new(
        &config.overlay.title,
        width as usize,
        height as usize,
        config.overlay.target_fps as usize,
    )?;

    while renderer.is_open() {
        if renderer.pause_pressed() && commands.send(ControlCommand::TogglePause).is_err() {
            warn!("inference thread is gone, pause ignored");
        }
        let image = display.latest();
        let snapshot = overlay.latest();
        renderer.render(image.as_deref(), snapshot.as_deref(), config.overlay.skeleton)?;
    }
    Ok(())
}
