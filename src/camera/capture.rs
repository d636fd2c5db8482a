use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat, Vec3b},
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs, VideoCaptureTrait},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::CameraConfig;
use crate::handoff::{FrameSender, LatestSlot};
use crate::overlay::DisplayImage;
use crate::worker::Frame;

/// OpenCVを使用したカメラキャプチャ
pub struct OpenCvCamera {
    capture: VideoCapture,
    width: u32,
    height: u32,
    mirror: bool,
}

impl OpenCvCamera {
    /// 設定の解像度でカメラを開く。開けなければエラー
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let mut capture = VideoCapture::new(config.index, VideoCaptureAPIs::CAP_ANY as i32)
            .context("Failed to open camera")?;

        if !capture.is_opened()? {
            anyhow::bail!("Camera {} is not available", config.index);
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)?;
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        info!(index = config.index, width, height, fps, "camera opened");

        Ok(Self {
            capture,
            width,
            height,
            mirror: config.mirror,
        })
    }

    /// 解像度を取得
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// フレームを読み込む（BGR形式、必要なら左右反転）
    pub fn read_frame(&mut self) -> Result<Mat> {
        let mut frame = Mat::default();
        self.capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if frame.empty() {
            anyhow::bail!("Empty frame received");
        }

        if !self.mirror {
            return Ok(frame);
        }
        let mut flipped = Mat::default();
        core::flip(&frame, &mut flipped, 1).context("Failed to mirror frame")?;
        Ok(flipped)
    }
}

/// BGR Mat を表示用の 0x00RRGGBB バッファに変換
pub fn to_display_image(frame: &Mat) -> Result<DisplayImage> {
    let width = frame.cols() as usize;
    let height = frame.rows() as usize;
    let mut pixels = Vec::with_capacity(width * height);

    for y in 0..height {
        let row = frame.at_row::<Vec3b>(y as i32)?;
        pixels.extend(row.iter().map(|p| ((p[2] as u32) << 16) | ((p[1] as u32) << 8) | p[0] as u32));
    }

    Ok(DisplayImage { width, height, pixels })
}

/// 取得スレッド
///
/// 表示用フレームは常に上書きで公開し、推論用フレームは推論側が空いているときだけ渡す。
pub struct CaptureLoop {
    pub camera: OpenCvCamera,
    pub frames: FrameSender<Frame<Mat>>,
    pub display: Arc<LatestSlot<DisplayImage>>,
    pub shutdown: Arc<AtomicBool>,
}

impl CaptureLoop {
    pub fn spawn(self) -> Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || self.run())
            .context("Failed to spawn capture thread")
    }

    fn run(mut self) {
        let mut dropped: u64 = 0;
        while !self.shutdown.load(Ordering::Acquire) {
            let frame = match self.camera.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("camera read failed: {:#}", e);
                    thread::sleep(Duration::from_millis(5));
                    continue;
                }
            };

            match to_display_image(&frame) {
                Ok(image) => self.display.publish(image),
                Err(e) => debug!("display conversion failed: {:#}", e),
            }

            let width = frame.cols() as u32;
            let height = frame.rows() as u32;
            if !self.frames.offer(Frame { image: frame, width, height }) {
                dropped += 1;
            }
        }
        info!(dropped, "capture stopped");
    }
}
