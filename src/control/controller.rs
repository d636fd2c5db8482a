use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::control::jump::{JumpDebouncer, JumpPhase};
use crate::control::keys::{KeyDispatch, KeySet, KeySynchronizer};
use crate::control::pause::{PauseControl, PauseStatus};
use crate::control::zones::{Classification, ZoneClassifier};
use crate::overlay::OverlaySnapshot;
use crate::pose::Pose;
use crate::tracker::{ReferenceSmoother, ShoulderObservation, SubjectTracker, TrackingEvent};

/// 1秒ごとに更新する FPS 計測
pub struct FpsCounter {
    frames: u32,
    window_start: Option<Instant>,
    fps: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            window_start: None,
            fps: 0.0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> f32 {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = Some(now);
        }
        self.fps
    }

    /// 一時停止明けに古い区間を持ち越さない
    pub fn reset(&mut self) {
        self.frames = 0;
        self.window_start = None;
        self.fps = 0.0;
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// 1フレーム分の制御パイプライン
///
/// 追跡判定 → 基準フレーム平滑化 → ゾーン判定 → ジャンプ連打 → キー同期。
/// 追跡状態・ジャンプ状態・押下中キーはすべてこの構造体が所有する。
pub struct Controller<D: KeyDispatch> {
    tracker: SubjectTracker,
    smoother: ReferenceSmoother,
    classifier: ZoneClassifier,
    jump: JumpDebouncer,
    keys: KeySynchronizer<D>,
    pause: PauseControl,
    fps: FpsCounter,
    shoulder_confidence: f32,
}

impl<D: KeyDispatch> Controller<D> {
    pub fn new(config: &Config, dispatch: D) -> Self {
        Self {
            tracker: SubjectTracker::from_config(&config.tracking),
            smoother: ReferenceSmoother::from_config(&config.smoothing),
            classifier: ZoneClassifier::new(config.zones.clone()),
            jump: JumpDebouncer::from_config(&config.jump),
            keys: KeySynchronizer::new(dispatch),
            pause: PauseControl::new(config.pause.resume_countdown()),
            fps: FpsCounter::new(),
            shoulder_confidence: config.tracking.shoulder_confidence,
        }
    }

    pub fn held(&self) -> &KeySet {
        self.keys.held()
    }

    pub fn keys(&self) -> &KeySynchronizer<D> {
        &self.keys
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_tracking()
    }

    pub fn jump_phase(&self) -> JumpPhase {
        self.jump.phase()
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        self.pause.toggle(now);
    }

    pub fn poll_pause(&mut self, now: Instant) -> PauseStatus {
        self.pause.poll(now)
    }

    /// 全キー解放とジャンプ状態のリセット
    pub fn release_all(&mut self) {
        self.keys.release_all();
        self.jump.reset();
    }

    /// `pose` が None のサイクルは「検出なし」として扱う
    pub fn step(&mut self, pose: Option<&Pose>, width: u32, height: u32, now: Instant) -> OverlaySnapshot {
        let mut snapshot = OverlaySnapshot {
            frame_size: (width, height),
            ..Default::default()
        };

        let pause = self.pause.poll(now);
        if pause != PauseStatus::Running {
            self.release_all();
            self.fps.reset();
            snapshot.pause = pause;
            snapshot.tracking = self.tracker.is_tracking();
            return snapshot;
        }
        snapshot.fps = self.fps.tick(now);

        let observation = pose
            .and_then(|p| ShoulderObservation::from_pose(p, width, height, self.shoulder_confidence));
        let reference = match self.tracker.observe(observation.as_ref()) {
            TrackingEvent::Searching => {
                snapshot.held = self.keys.held().clone();
                return snapshot;
            }
            TrackingEvent::Lost => {
                info!("subject lost");
                self.release_all();
                self.smoother.reset();
                return snapshot;
            }
            TrackingEvent::Acquired => {
                // Acquired は観測値があるときだけ返る
                let Some(obs) = observation else {
                    return snapshot;
                };
                info!(scale = obs.reference.scale, "subject acquired");
                self.smoother.reset_to(obs.reference);
                obs.reference
            }
            TrackingEvent::Tracking => match observation {
                Some(obs) => self.smoother.apply(obs.reference),
                // lose_scale_min 以上の観測値がないと Tracking にはならない
                None => return snapshot,
            },
        };

        snapshot.tracking = true;
        snapshot.reference = Some(reference);
        snapshot.keypoints = pose.cloned();
        snapshot.zones = self
            .classifier
            .background_regions()
            .into_iter()
            .map(|(region, label)| (region.to_pixels(&reference), label))
            .collect();

        let classification = match pose {
            Some(pose) => self.classifier.classify(pose, &reference, width, height),
            None => Classification::neutral(),
        };
        snapshot.label = classification.label();

        if classification.wrists_seen == 0 {
            // 手首が見えないサイクルでは押下中のキーにもジャンプの状態にも触れない
            snapshot.held = self.keys.held().clone();
            return snapshot;
        }

        let jump_pressed = self.jump.update(classification.jump, now);
        let desired = classification.desired_keys(jump_pressed);
        debug!(label = %snapshot.label, ?desired, "classified");
        self.keys.sync(&desired);

        snapshot.color = classification.color();
        snapshot.highlight = classification
            .region(self.classifier.zones())
            .map(|region| region.to_pixels(&reference));
        snapshot.held = self.keys.held().clone();
        snapshot
    }
}
