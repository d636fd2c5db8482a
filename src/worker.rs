use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::control::{Controller, KeyDispatch};
use crate::handoff::{FrameReceiver, LatestSlot, Take};
use crate::overlay::OverlaySnapshot;
use crate::pose::PoseSource;

/// フレーム待ちのタイムアウト。停止フラグの確認間隔も兼ねる
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 取得スレッドから推論スレッドへ渡すフレーム
pub struct Frame<I> {
    pub image: I,
    pub width: u32,
    pub height: u32,
}

/// 描画側から推論スレッドへの操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    TogglePause,
}

/// スコープを抜けるとき（パニック時も含む）に全キーを解放する
struct ReleaseGuard<D: KeyDispatch>(Controller<D>);

impl<D: KeyDispatch> Drop for ReleaseGuard<D> {
    fn drop(&mut self) {
        self.0.release_all();
    }
}

/// 推論スレッド
///
/// 最新フレームを受け取り、姿勢推定と制御パイプラインを回してオーバーレイを公開する。
pub struct InferenceWorker<S: PoseSource, D: KeyDispatch> {
    pub source: S,
    pub controller: Controller<D>,
    pub frames: FrameReceiver<Frame<S::Image>>,
    pub commands: Receiver<ControlCommand>,
    pub overlay: Arc<LatestSlot<OverlaySnapshot>>,
    pub shutdown: Arc<AtomicBool>,
}

impl<S: PoseSource, D: KeyDispatch> InferenceWorker<S, D> {
    pub fn run(self) {
        let InferenceWorker {
            mut source,
            controller,
            frames,
            commands,
            overlay,
            shutdown,
        } = self;
        let mut guard = ReleaseGuard(controller);

        while !shutdown.load(Ordering::Acquire) {
            let frame = match frames.take_timeout(POLL_INTERVAL) {
                Take::Frame(frame) => frame,
                Take::Timeout => continue,
                Take::Closed => {
                    info!("frame source closed");
                    break;
                }
            };

            let now = Instant::now();
            for command in commands.try_iter() {
                match command {
                    ControlCommand::TogglePause => guard.0.toggle_pause(now),
                }
            }

            // 一時停止中は推論しない
            let pose = if guard.0.poll_pause(now).is_running() {
                match source.estimate(&frame.image) {
                    Ok(pose) => Some(pose),
                    Err(e) => {
                        warn!("pose estimation failed: {:#}", e);
                        None
                    }
                }
            } else {
                None
            };

            let snapshot = guard.0.step(pose.as_ref(), frame.width, frame.height, now);
            overlay.publish(snapshot);
        }

        drop(guard);
        info!("inference worker stopped, keys released");
    }
}

impl<S, D> InferenceWorker<S, D>
where
    S: PoseSource + Send + 'static,
    S::Image: Send + 'static,
    D: KeyDispatch + Send + 'static,
{
    pub fn spawn(self) -> Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("inference".to_string())
            .spawn(move || self.run())
            .context("Failed to spawn inference thread")
    }
}

/// スレッドの終了を最大 `timeout` 待つ
///
/// 時間内に終わらなければ切り離して false を返す（カメラ読み込みが止まっている場合など）。
pub fn join_with_timeout(name: &str, handle: thread::JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("{} thread did not stop in {:?}, detaching", name, timeout);
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    if handle.join().is_err() {
        error!("{} thread panicked", name);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::control::keys::testing::{KeyEvent, RecordingDispatch};
    use crate::control::{KeyId, KeySet};
    use crate::handoff::frame_handoff;
    use crate::pose::{Keypoint, KeypointIndex, Pose};
    use crossbeam_channel::unbounded;

    /// 画像として Option<Pose> を受け取り、None なら推論失敗を返す
    struct ScriptedSource;

    impl PoseSource for ScriptedSource {
        type Image = Option<Pose>;

        fn estimate(&mut self, image: &Option<Pose>) -> Result<Pose> {
            image.clone().context("model invocation failed")
        }
    }

    fn running_pose() -> Pose {
        let mut pose = Pose::default();
        pose.set(KeypointIndex::LeftShoulder, Keypoint::new(0.48, 0.4, 1.0));
        pose.set(KeypointIndex::RightShoulder, Keypoint::new(0.52, 0.4, 1.0));
        pose.set(KeypointIndex::RightWrist, Keypoint::new(0.56, 0.4, 1.0));
        pose
    }

    fn wait_for_version(slot: &LatestSlot<OverlaySnapshot>, version: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while slot.version() < version {
            assert!(Instant::now() < deadline, "worker did not publish");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_worker_presses_and_releases_on_shutdown() {
        let rec = RecordingDispatch::default();
        let (tx, rx) = frame_handoff();
        let (_cmd_tx, cmd_rx) = unbounded();
        let overlay = Arc::new(LatestSlot::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = InferenceWorker {
            source: ScriptedSource,
            controller: Controller::new(&Config::default(), rec.clone()),
            frames: rx,
            commands: cmd_rx,
            overlay: overlay.clone(),
            shutdown: shutdown.clone(),
        }
        .spawn()
        .unwrap();

        assert!(tx.offer(Frame { image: Some(running_pose()), width: 1000, height: 1000 }));
        wait_for_version(&overlay, 1);
        let snapshot = overlay.latest().unwrap();
        assert_eq!(snapshot.label, "RUN");
        assert_eq!(snapshot.held, KeySet::from([KeyId::Forward]));

        shutdown.store(true, Ordering::Release);
        handle.join().unwrap();
        assert_eq!(
            rec.events(),
            vec![KeyEvent::Press(KeyId::Forward), KeyEvent::Release(KeyId::Forward)]
        );
    }

    #[test]
    fn test_estimation_failure_is_no_detection() {
        let rec = RecordingDispatch::default();
        let (tx, rx) = frame_handoff();
        let (_cmd_tx, cmd_rx) = unbounded();
        let overlay = Arc::new(LatestSlot::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = InferenceWorker {
            source: ScriptedSource,
            controller: Controller::new(&Config::default(), rec.clone()),
            frames: rx,
            commands: cmd_rx,
            overlay: overlay.clone(),
            shutdown: shutdown.clone(),
        }
        .spawn()
        .unwrap();

        assert!(tx.offer(Frame { image: Some(running_pose()), width: 1000, height: 1000 }));
        wait_for_version(&overlay, 1);
        assert!(tx.offer(Frame { image: None, width: 1000, height: 1000 }));
        wait_for_version(&overlay, 2);

        // 推論失敗は検出なし扱い: 追跡が外れてキーが解放される
        let snapshot = overlay.latest().unwrap();
        assert!(!snapshot.tracking);
        assert_eq!(
            rec.events(),
            vec![KeyEvent::Press(KeyId::Forward), KeyEvent::Release(KeyId::Forward)]
        );

        // フレーム送信側を閉じるとワーカーは終了する
        drop(tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_pause_command_releases_keys() {
        let rec = RecordingDispatch::default();
        let (tx, rx) = frame_handoff();
        let (cmd_tx, cmd_rx) = unbounded();
        let overlay = Arc::new(LatestSlot::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = InferenceWorker {
            source: ScriptedSource,
            controller: Controller::new(&Config::default(), rec.clone()),
            frames: rx,
            commands: cmd_rx,
            overlay: overlay.clone(),
            shutdown: shutdown.clone(),
        }
        .spawn()
        .unwrap();

        assert!(tx.offer(Frame { image: Some(running_pose()), width: 1000, height: 1000 }));
        wait_for_version(&overlay, 1);
        cmd_tx.send(ControlCommand::TogglePause).unwrap();
        assert!(tx.offer(Frame { image: Some(running_pose()), width: 1000, height: 1000 }));
        wait_for_version(&overlay, 2);

        let snapshot = overlay.latest().unwrap();
        assert_eq!(snapshot.pause, crate::control::PauseStatus::Paused);
        assert!(snapshot.held.is_empty());

        shutdown.store(true, Ordering::Release);
        handle.join().unwrap();
        assert_eq!(
            rec.events(),
            vec![KeyEvent::Press(KeyId::Forward), KeyEvent::Release(KeyId::Forward)]
        );
    }

    #[test]
    fn test_join_with_timeout() {
        let done = thread::spawn(|| {});
        assert!(join_with_timeout("done", done, Duration::from_secs(5)));

        let panicked = thread::spawn(|| panic!("boom"));
        assert!(join_with_timeout("panicked", panicked, Duration::from_secs(5)));

        // 止まったままのスレッドは切り離す
        let (release_tx, release_rx) = unbounded::<()>();
        let stuck = thread::spawn(move || {
            let _ = release_rx.recv();
        });
        let start = Instant::now();
        assert!(!join_with_timeout("stuck", stuck, Duration::from_millis(50)));
        assert!(start.elapsed() < Duration::from_secs(5));
        drop(release_tx);
    }
}
