use crate::control::keys::KeySet;
use crate::control::pause::PauseStatus;
use crate::control::zones::PixelRect;
use crate::pose::Pose;
use crate::tracker::ReferenceFrame;

/// 表示用フレーム (0x00RRGGBB, 行優先)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

/// 描画側に公開する1サイクル分の状態
///
/// 推論スレッドが毎サイクル新しく作り、`LatestSlot` 経由で置き換える。公開後は変更しない。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlaySnapshot {
    pub tracking: bool,
    /// 平滑化後の基準フレーム
    pub reference: Option<ReferenceFrame>,
    pub label: String,
    /// 強調色 (0xRRGGBB)。None は待機色
    pub color: Option<u32>,
    pub highlight: Option<PixelRect>,
    /// 背景に描くゾーン (矩形, ラベル)
    pub zones: Vec<(PixelRect, &'static str)>,
    /// 生のキーポイント
    pub keypoints: Option<Pose>,
    pub held: KeySet,
    pub fps: f32,
    pub pause: PauseStatus,
    pub frame_size: (u32, u32),
}

impl OverlaySnapshot {
    /// ウィンドウタイトル用の要約
    pub fn status_line(&self) -> String {
        match self.pause {
            PauseStatus::Paused => return "Paused (P to resume)".to_string(),
            PauseStatus::Resuming { remaining_secs } => return format!("Resuming in {}", remaining_secs),
            PauseStatus::Running => {}
        }
        if !self.tracking {
            return format!("No pose / too far | {:.1} FPS", self.fps);
        }
        let keys: Vec<&str> = self.held.iter().map(|k| k.name()).collect();
        format!("{} [{}] | {:.1} FPS", self.label, keys.join(" "), self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::keys::KeyId;

    #[test]
    fn test_status_line() {
        let mut s = OverlaySnapshot {
            tracking: true,
            label: "RUN + JUMP".to_string(),
            held: KeySet::from([KeyId::Forward, KeyId::Jump]),
            fps: 29.96,
            ..Default::default()
        };
        assert_eq!(s.status_line(), "RUN + JUMP [forward jump] | 30.0 FPS");

        s.tracking = false;
        assert_eq!(s.status_line(), "No pose / too far | 30.0 FPS");

        s.pause = PauseStatus::Resuming { remaining_secs: 2 };
        assert_eq!(s.status_line(), "Resuming in 2");

        s.pause = PauseStatus::Paused;
        assert_eq!(s.status_line(), "Paused (P to resume)");
    }
}
