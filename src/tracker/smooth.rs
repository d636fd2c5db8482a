use crate::config::SmoothingConfig;
use crate::tracker::subject::ReferenceFrame;

/// デッドゾーン付きローパスフィルタ
///
/// 差がしきい値未満なら値を動かさない。それ以外は残り距離の alpha 分だけ近づける。
#[derive(Debug, Clone, Copy)]
pub struct DeadZoneFilter {
    jitter_threshold: f32,
    alpha: f32,
}

impl DeadZoneFilter {
    pub fn new(jitter_threshold: f32, alpha: f32) -> Self {
        Self { jitter_threshold, alpha }
    }

    pub fn filter(&self, current: f32, raw: f32) -> f32 {
        let diff = raw - current;
        if diff.abs() < self.jitter_threshold {
            return current;
        }
        current + diff * self.alpha
    }
}

/// 基準フレーム (origin_x, origin_y, scale) の平滑化
///
/// 各成分に独立して [`DeadZoneFilter`] を適用する。
pub struct ReferenceSmoother {
    filter: DeadZoneFilter,
    prev: Option<ReferenceFrame>,
}

impl ReferenceSmoother {
    pub fn new(jitter_threshold: f32, alpha: f32) -> Self {
        Self {
            filter: DeadZoneFilter::new(jitter_threshold, alpha),
            prev: None,
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(config.jitter_threshold, config.alpha)
    }

    /// 初回はそのまま通す
    pub fn apply(&mut self, raw: ReferenceFrame) -> ReferenceFrame {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(raw);
                return raw;
            }
        };

        let f = &self.filter;
        let result = ReferenceFrame::new(
            f.filter(prev.origin_x, raw.origin_x),
            f.filter(prev.origin_y, raw.origin_y),
            f.filter(prev.scale, raw.scale),
        );
        self.prev = Some(result);
        result
    }

    /// 追跡開始時に生の値へスナップする
    pub fn reset_to(&mut self, raw: ReferenceFrame) {
        self.prev = Some(raw);
    }

    pub fn current(&self) -> Option<ReferenceFrame> {
        self.prev
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_dead_zone_holds_exactly() {
        let f = DeadZoneFilter::new(20.0, 0.8);
        let start = 123.456_f32;
        let mut value = start;
        for i in 0..1000 {
            let raw = start + if i % 2 == 0 { 19.9 } else { -19.9 };
            value = f.filter(value, raw);
        }
        assert_eq!(value.to_bits(), start.to_bits());
    }

    #[test]
    fn test_outside_dead_zone_moves_alpha_fraction() {
        let f = DeadZoneFilter::new(20.0, 0.8);
        assert!(approx_eq_f32(f.filter(100.0, 200.0), 180.0, 1e-4));
        assert!(approx_eq_f32(f.filter(100.0, 0.0), 20.0, 1e-4));
        // ちょうどしきい値の差は動く
        assert!(approx_eq_f32(f.filter(0.0, 20.0), 16.0, 1e-4));
    }

    #[test]
    fn test_exponential_approach_stops_inside_dead_zone() {
        let f = DeadZoneFilter::new(20.0, 0.8);
        let mut value = 0.0;
        let mut steps = Vec::new();
        for _ in 0..5 {
            value = f.filter(value, 500.0);
            steps.push(value);
        }
        // 400, 480, 496, 以降は残り20未満なので停止
        assert!(approx_eq_f32(steps[0], 400.0, 1e-3));
        assert!(approx_eq_f32(steps[1], 480.0, 1e-3));
        assert!(approx_eq_f32(steps[2], 496.0, 1e-3));
        assert_eq!(steps[3], steps[2]);
        assert_eq!(steps[4], steps[2]);
    }

    #[test]
    fn test_first_frame_passthrough() {
        let mut s = ReferenceSmoother::new(20.0, 0.8);
        let raw = ReferenceFrame::new(640.0, 300.0, 120.0);
        assert_eq!(s.apply(raw), raw);
        assert_eq!(s.current(), Some(raw));
    }

    #[test]
    fn test_components_filtered_independently() {
        let mut s = ReferenceSmoother::new(20.0, 0.8);
        s.reset_to(ReferenceFrame::new(600.0, 300.0, 100.0));
        let result = s.apply(ReferenceFrame::new(700.0, 310.0, 100.0));
        assert!(approx_eq_f32(result.origin_x, 680.0, 1e-3));
        assert_eq!(result.origin_y, 300.0);
        assert_eq!(result.scale, 100.0);
    }

    #[test]
    fn test_reset() {
        let mut s = ReferenceSmoother::new(20.0, 0.8);
        s.apply(ReferenceFrame::new(600.0, 300.0, 100.0));
        s.reset();
        assert_eq!(s.current(), None);
        let raw = ReferenceFrame::new(10.0, 20.0, 30.0);
        assert_eq!(s.apply(raw), raw);
    }
}
