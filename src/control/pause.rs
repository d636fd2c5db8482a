use std::time::{Duration, Instant};
use tracing::info;

/// 一時停止の状態（オーバーレイ表示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseStatus {
    #[default]
    Running,
    Paused,
    /// 再開カウントダウン中（残り秒、切り上げ）
    Resuming { remaining_secs: u64 },
}

impl PauseStatus {
    pub fn is_running(self) -> bool {
        self == PauseStatus::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PauseState {
    Running,
    Paused,
    Resuming { until: Instant },
}

/// 一時停止と再開カウントダウン
///
/// 再開直後に誤ったキー入力が出ないよう、再開はカウントダウンを経由する。
pub struct PauseControl {
    countdown: Duration,
    state: PauseState,
}

impl PauseControl {
    pub fn new(countdown: Duration) -> Self {
        Self {
            countdown,
            state: PauseState::Running,
        }
    }

    /// Running -> Paused -> Resuming。カウントダウン中は無視する
    pub fn toggle(&mut self, now: Instant) {
        self.state = match self.state {
            PauseState::Running => {
                info!("paused");
                PauseState::Paused
            }
            PauseState::Paused => {
                info!(secs = self.countdown.as_secs_f32(), "resuming");
                PauseState::Resuming { until: now + self.countdown }
            }
            resuming @ PauseState::Resuming { .. } => resuming,
        };
    }

    /// カウントダウンが終わっていれば Running に戻す
    pub fn poll(&mut self, now: Instant) -> PauseStatus {
        match self.state {
            PauseState::Running => PauseStatus::Running,
            PauseState::Paused => PauseStatus::Paused,
            PauseState::Resuming { until } => {
                if now >= until {
                    info!("resumed");
                    self.state = PauseState::Running;
                    PauseStatus::Running
                } else {
                    let remaining = until - now;
                    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                    PauseStatus::Resuming { remaining_secs: secs }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_cycle() {
        let mut p = PauseControl::new(Duration::from_secs(3));
        let t0 = Instant::now();
        assert_eq!(p.poll(t0), PauseStatus::Running);

        p.toggle(t0);
        assert_eq!(p.poll(t0), PauseStatus::Paused);
        assert_eq!(p.poll(t0 + Duration::from_secs(60)), PauseStatus::Paused);

        p.toggle(t0);
        assert_eq!(p.poll(t0), PauseStatus::Resuming { remaining_secs: 3 });
        assert_eq!(
            p.poll(t0 + Duration::from_millis(500)),
            PauseStatus::Resuming { remaining_secs: 3 }
        );
        assert_eq!(
            p.poll(t0 + Duration::from_millis(2001)),
            PauseStatus::Resuming { remaining_secs: 1 }
        );
        assert_eq!(p.poll(t0 + Duration::from_secs(3)), PauseStatus::Running);
        assert_eq!(p.poll(t0 + Duration::from_secs(4)), PauseStatus::Running);
    }

    #[test]
    fn test_toggle_ignored_while_resuming() {
        let mut p = PauseControl::new(Duration::from_secs(3));
        let t0 = Instant::now();
        p.toggle(t0);
        p.toggle(t0);
        p.toggle(t0 + Duration::from_secs(1));
        assert_eq!(
            p.poll(t0 + Duration::from_secs(1)),
            PauseStatus::Resuming { remaining_secs: 2 }
        );
        assert!(p.poll(t0 + Duration::from_secs(3)).is_running());
    }
}
