use std::time::{Duration, Instant};

use crate::config::JumpConfig;

/// ジャンプ連打の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPhase {
    Idle,
    /// ジャンプキーを押している
    Held { since: Instant },
    /// 次の押下まで離している
    Cooldown { since: Instant },
}

/// 腕を上げ続けるジェスチャーを「押す→離す」の繰り返しに変換する
///
/// 時刻は呼び出し側から渡す。
pub struct JumpDebouncer {
    held: Duration,
    cooldown: Duration,
    phase: JumpPhase,
}

impl JumpDebouncer {
    pub fn new(held: Duration, cooldown: Duration) -> Self {
        Self {
            held,
            cooldown,
            phase: JumpPhase::Idle,
        }
    }

    pub fn from_config(config: &JumpConfig) -> Self {
        Self::new(config.held(), config.cooldown())
    }

    pub fn phase(&self) -> JumpPhase {
        self.phase
    }

    /// 戻り値: このサイクルでジャンプキーを押すべきか
    pub fn update(&mut self, trigger: bool, now: Instant) -> bool {
        if !trigger {
            self.phase = JumpPhase::Idle;
            return false;
        }

        let (next, pressed) = match self.phase {
            JumpPhase::Idle => (JumpPhase::Held { since: now }, true),
            JumpPhase::Held { since } => {
                if now.saturating_duration_since(since) > self.held {
                    (JumpPhase::Cooldown { since: now }, false)
                } else {
                    (self.phase, true)
                }
            }
            JumpPhase::Cooldown { since } => {
                if now.saturating_duration_since(since) > self.cooldown {
                    (JumpPhase::Held { since: now }, true)
                } else {
                    (self.phase, false)
                }
            }
        };
        self.phase = next;
        pressed
    }

    pub fn reset(&mut self) {
        self.phase = JumpPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> JumpDebouncer {
        JumpDebouncer::new(Duration::from_millis(400), Duration::from_millis(75))
    }

    /// (押下エッジ数, 解放エッジ数)
    fn count_edges(samples: &[bool]) -> (usize, usize) {
        let mut prev = false;
        let mut presses = 0;
        let mut releases = 0;
        for &s in samples {
            if s && !prev {
                presses += 1;
            }
            if !s && prev {
                releases += 1;
            }
            prev = s;
        }
        (presses, releases)
    }

    #[test]
    fn test_first_trigger_presses_immediately() {
        let mut j = debouncer();
        let t0 = Instant::now();
        assert!(j.update(true, t0));
        assert_eq!(j.phase(), JumpPhase::Held { since: t0 });
    }

    #[test]
    fn test_held_then_cooldown_then_held() {
        let mut j = debouncer();
        let t0 = Instant::now();
        let ms = |n: u64| t0 + Duration::from_millis(n);

        assert!(j.update(true, t0));
        assert!(j.update(true, ms(400)));
        assert!(!j.update(true, ms(401)));
        assert_eq!(j.phase(), JumpPhase::Cooldown { since: ms(401) });
        assert!(!j.update(true, ms(476)));
        assert!(j.update(true, ms(477)));
        assert_eq!(j.phase(), JumpPhase::Held { since: ms(477) });
    }

    #[test]
    fn test_trigger_false_resets() {
        let mut j = debouncer();
        let t0 = Instant::now();
        j.update(true, t0);
        j.update(true, t0 + Duration::from_millis(450));
        assert!(matches!(j.phase(), JumpPhase::Cooldown { .. }));

        assert!(!j.update(false, t0 + Duration::from_millis(460)));
        assert_eq!(j.phase(), JumpPhase::Idle);
        // 再トリガーで即押下
        assert!(j.update(true, t0 + Duration::from_millis(470)));
    }

    #[test]
    fn test_cadence_two_edges() {
        let mut j = debouncer();
        let t0 = Instant::now();
        let total = 400 + 75 + 400;
        let mut samples: Vec<bool> = (0..=total)
            .step_by(5)
            .map(|t| j.update(true, t0 + Duration::from_millis(t)))
            .collect();
        samples.push(j.update(false, t0 + Duration::from_millis(total + 5)));

        assert_eq!(count_edges(&samples), (2, 2));
    }

    #[test]
    fn test_cadence_repeats_while_held() {
        let mut j = debouncer();
        let t0 = Instant::now();
        // 2秒間 10ms 刻み。周期は約 410 + 80 ms
        let samples: Vec<bool> = (0..2000)
            .step_by(10)
            .map(|t| j.update(true, t0 + Duration::from_millis(t)))
            .collect();
        let (presses, _) = count_edges(&samples);
        assert_eq!(presses, 5);
    }

    #[test]
    fn test_reset() {
        let mut j = debouncer();
        j.update(true, Instant::now());
        j.reset();
        assert_eq!(j.phase(), JumpPhase::Idle);
    }
}
