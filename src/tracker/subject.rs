use crate::config::TrackingConfig;
use crate::pose::Pose;

/// 肩から求めた基準フレーム（ピクセル）
///
/// ジェスチャーのオフセットはすべて `scale`（肩幅）で正規化する。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub origin_x: f32,
    pub origin_y: f32,
    pub scale: f32,
}

impl ReferenceFrame {
    pub fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self { origin_x, origin_y, scale }
    }

    /// ピクセル座標を肩幅単位のオフセットに変換
    pub fn normalize(&self, px: f32, py: f32) -> (f32, f32) {
        ((px - self.origin_x) / self.scale, (py - self.origin_y) / self.scale)
    }

    /// 肩幅単位のオフセットをピクセル座標に戻す
    pub fn to_pixel(&self, fx: f32, fy: f32) -> (f32, f32) {
        (self.origin_x + fx * self.scale, self.origin_y + fy * self.scale)
    }
}

/// 1フレーム分の肩の観測値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShoulderObservation {
    /// 生の基準フレーム
    pub reference: ReferenceFrame,
    /// 肩中点の画像中央からの横ずれ（画像幅比）
    pub center_offset: f32,
}

impl ShoulderObservation {
    /// 両肩の信頼度が足りない、または座標が有限でなければ None
    pub fn from_pose(pose: &Pose, width: u32, height: u32, threshold: f32) -> Option<Self> {
        let (left, right) = pose.shoulders(threshold)?;
        let mid_x = (left.x + right.x) * 0.5;
        let mid_y = (left.y + right.y) * 0.5;
        let scale = f32::hypot(
            (left.x - right.x) * width as f32,
            (left.y - right.y) * height as f32,
        );
        let reference = ReferenceFrame::new(mid_x * width as f32, mid_y * height as f32, scale);
        // 非有限値が平滑化に入ると以後ずっと NaN になるので検出なし扱い
        if !(reference.origin_x.is_finite() && reference.origin_y.is_finite() && reference.scale.is_finite()) {
            return None;
        }
        Some(Self {
            reference,
            center_offset: mid_x - 0.5,
        })
    }
}

/// `SubjectTracker::observe` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    /// このフレームで追跡を開始した
    Acquired,
    /// 追跡継続中
    Tracking,
    /// このフレームで追跡を失った
    Lost,
    /// 未追跡のまま
    Searching,
}

impl TrackingEvent {
    pub fn is_tracking(self) -> bool {
        matches!(self, TrackingEvent::Acquired | TrackingEvent::Tracking)
    }
}

/// 追跡対象の有無をヒステリシス付きで判定する
///
/// 開始: scale > acquire_scale_min かつ 画像中央付近
/// 終了: scale < lose_scale_min
pub struct SubjectTracker {
    acquire_scale_min: f32,
    lose_scale_min: f32,
    center_tolerance: f32,
    tracking: bool,
}

impl SubjectTracker {
    pub fn new(acquire_scale_min: f32, lose_scale_min: f32, center_tolerance: f32) -> Self {
        Self {
            acquire_scale_min,
            lose_scale_min,
            center_tolerance,
            tracking: false,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.acquire_scale_min, config.lose_scale_min, config.center_tolerance)
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// 検出なし（None）は scale 0 として扱う
    pub fn observe(&mut self, observation: Option<&ShoulderObservation>) -> TrackingEvent {
        let scale = observation.map_or(0.0, |o| o.reference.scale);

        if self.tracking {
            if scale < self.lose_scale_min {
                self.tracking = false;
                TrackingEvent::Lost
            } else {
                TrackingEvent::Tracking
            }
        } else {
            let centered = observation.is_some_and(|o| o.center_offset.abs() < self.center_tolerance);
            if scale > self.acquire_scale_min && centered {
                self.tracking = true;
                TrackingEvent::Acquired
            } else {
                TrackingEvent::Searching
            }
        }
    }

    pub fn reset(&mut self) {
        self.tracking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointIndex};

    fn obs(scale: f32, center_offset: f32) -> ShoulderObservation {
        ShoulderObservation {
            reference: ReferenceFrame::new(640.0, 300.0, scale),
            center_offset,
        }
    }

    fn tracker() -> SubjectTracker {
        SubjectTracker::new(30.0, 20.0, 0.15)
    }

    #[test]
    fn test_acquire_requires_scale_and_center() {
        let mut t = tracker();
        assert_eq!(t.observe(Some(&obs(29.0, 0.0))), TrackingEvent::Searching);
        assert_eq!(t.observe(Some(&obs(30.0, 0.0))), TrackingEvent::Searching);
        assert_eq!(t.observe(Some(&obs(80.0, 0.2))), TrackingEvent::Searching);
        assert_eq!(t.observe(Some(&obs(80.0, -0.15))), TrackingEvent::Searching);
        assert_eq!(t.observe(Some(&obs(31.0, 0.1))), TrackingEvent::Acquired);
        assert!(t.is_tracking());
    }

    #[test]
    fn test_off_center_does_not_drop_tracking() {
        let mut t = tracker();
        t.observe(Some(&obs(50.0, 0.0)));
        assert_eq!(t.observe(Some(&obs(50.0, 0.4))), TrackingEvent::Tracking);
    }

    #[test]
    fn test_lose_below_lower_threshold() {
        let mut t = tracker();
        t.observe(Some(&obs(50.0, 0.0)));
        assert_eq!(t.observe(Some(&obs(20.0, 0.0))), TrackingEvent::Tracking);
        assert_eq!(t.observe(Some(&obs(19.9, 0.0))), TrackingEvent::Lost);
        assert!(!t.is_tracking());
        assert_eq!(t.observe(Some(&obs(25.0, 0.0))), TrackingEvent::Searching);
    }

    #[test]
    fn test_no_detection_counts_as_zero_scale() {
        let mut t = tracker();
        assert_eq!(t.observe(None), TrackingEvent::Searching);
        t.observe(Some(&obs(50.0, 0.0)));
        assert_eq!(t.observe(None), TrackingEvent::Lost);
    }

    #[test]
    fn test_oscillation_inside_gap_never_toggles() {
        for start_tracking in [false, true] {
            let mut t = tracker();
            if start_tracking {
                t.observe(Some(&obs(50.0, 0.0)));
            }
            for i in 0..200 {
                let scale = if i % 2 == 0 { 20.5 } else { 29.5 };
                let event = t.observe(Some(&obs(scale, 0.0)));
                assert!(matches!(event, TrackingEvent::Searching | TrackingEvent::Tracking));
                assert_eq!(t.is_tracking(), start_tracking);
            }
        }
    }

    #[test]
    fn test_one_toggle_per_full_crossing() {
        let mut t = tracker();
        let mut toggles = 0;
        let mut was = t.is_tracking();
        // 10 -> 40 -> 10 を3往復、途中でギャップ内の揺れを挟む
        let sweep = [10.0, 25.0, 29.0, 22.0, 40.0, 28.0, 21.0, 25.0, 10.0];
        for _ in 0..3 {
            for scale in sweep {
                t.observe(Some(&obs(scale, 0.0)));
                if t.is_tracking() != was {
                    toggles += 1;
                    was = t.is_tracking();
                }
            }
        }
        assert_eq!(toggles, 6);
    }

    #[test]
    fn test_observation_from_pose() {
        let mut pose = Pose::default();
        pose.set(KeypointIndex::LeftShoulder, Keypoint::new(0.45, 0.5, 1.0));
        pose.set(KeypointIndex::RightShoulder, Keypoint::new(0.55, 0.5, 1.0));

        let o = ShoulderObservation::from_pose(&pose, 400, 300, 0.3).unwrap();
        assert!((o.reference.origin_x - 200.0).abs() < 1e-3);
        assert!((o.reference.origin_y - 150.0).abs() < 1e-3);
        assert!((o.reference.scale - 40.0).abs() < 1e-3);
        assert!(o.center_offset.abs() < 1e-5);

        pose.set(KeypointIndex::RightShoulder, Keypoint::new(0.55, 0.5, 0.1));
        assert!(ShoulderObservation::from_pose(&pose, 400, 300, 0.3).is_none());
    }

    #[test]
    fn test_non_finite_shoulder_is_no_observation() {
        let mut pose = Pose::default();
        pose.set(KeypointIndex::LeftShoulder, Keypoint::new(f32::NAN, 0.5, 1.0));
        pose.set(KeypointIndex::RightShoulder, Keypoint::new(0.55, 0.5, 1.0));
        assert!(ShoulderObservation::from_pose(&pose, 400, 300, 0.3).is_none());

        pose.set(KeypointIndex::LeftShoulder, Keypoint::new(0.45, f32::INFINITY, 1.0));
        assert!(ShoulderObservation::from_pose(&pose, 400, 300, 0.3).is_none());
    }

    #[test]
    fn test_reference_normalize_roundtrip() {
        let r = ReferenceFrame::new(100.0, 50.0, 40.0);
        assert_eq!(r.normalize(160.0, 10.0), (1.5, -1.0));
        assert_eq!(r.to_pixel(1.5, -1.0), (160.0, 10.0));
    }
}
