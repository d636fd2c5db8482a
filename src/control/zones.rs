//! 手首位置のゾーン判定
//!
//! 手首のピクセル座標を肩の基準フレームで正規化し (nx, ny)、判定帯に当てはめる。
//! nx は右向きが正、ny は下向きが正（画像座標と同じ）。
//!
//! 左右の帯（境界の扱い）:
//!
//! | 範囲 | 動作 |
//! |---|---|
//! | nx < back_sprint_start | BackSprint |
//! | back_sprint_start <= nx < back_start | Back |
//! | back_start <= nx <= run_start | Neutral |
//! | run_start < nx < sprint_start | Run |
//! | sprint_start <= nx | Sprint |
//!
//! 複数の手首の結果は [`Action::combine`] でまとめる。

use crate::config::ZoneConfig;
use crate::control::keys::{KeyId, KeySet};
use crate::pose::{KeypointIndex, Pose};
use crate::tracker::ReferenceFrame;

pub const RUN_COLOR: u32 = 0x00FF78;
pub const SPRINT_COLOR: u32 = 0xC864FF;
pub const BACK_COLOR: u32 = 0xFF6432;
pub const JUMP_COLOR: u32 = 0xFFC800;
pub const DUCK_COLOR: u32 = 0xFFC800;

/// 左右方向の動作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Neutral,
    Run,
    Sprint,
    Back,
    BackSprint,
}

impl Action {
    /// 2つの手首の結果をまとめる
    ///
    /// 同じ向きなら強い方。逆向きなら強い方、同じ強さなら前進を優先する。
    /// 結果として Neutral < Back < Run < BackSprint < Sprint の順で勝つ。
    pub fn combine(self, other: Action) -> Action {
        use Action::*;
        match (self, other) {
            (Neutral, x) | (x, Neutral) => x,
            (Sprint, _) | (_, Sprint) => Sprint,
            (BackSprint, _) | (_, BackSprint) => BackSprint,
            (Run, _) | (_, Run) => Run,
            (Back, Back) => Back,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Neutral => "NEUTRAL",
            Action::Run => "RUN",
            Action::Sprint => "SPRINT",
            Action::Back => "BACK",
            Action::BackSprint => "BACK SPRINT",
        }
    }

    pub fn keys(self) -> &'static [KeyId] {
        match self {
            Action::Neutral => &[],
            Action::Run => &[KeyId::Forward],
            Action::Sprint => &[KeyId::Forward, KeyId::Sprint],
            Action::Back => &[KeyId::Back],
            Action::BackSprint => &[KeyId::Back, KeyId::Sprint],
        }
    }

    pub fn color(self) -> Option<u32> {
        match self {
            Action::Neutral => None,
            Action::Run => Some(RUN_COLOR),
            Action::Sprint | Action::BackSprint => Some(SPRINT_COLOR),
            Action::Back => Some(BACK_COLOR),
        }
    }
}

/// 基準フレーム相対の矩形（肩幅単位）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x1: f32,
    pub x2: f32,
    pub y1: f32,
    pub y2: f32,
}

impl Region {
    pub fn new(x1: f32, x2: f32, y1: f32, y2: f32) -> Self {
        Self { x1, x2, y1, y2 }
    }

    /// origin + factor * scale でピクセル矩形に変換
    pub fn to_pixels(&self, reference: &ReferenceFrame) -> PixelRect {
        let (ax, ay) = reference.to_pixel(self.x1, self.y1);
        let (bx, by) = reference.to_pixel(self.x2, self.y2);
        PixelRect {
            x: ax.min(bx),
            y: ay.min(by),
            width: (ax - bx).abs(),
            height: (ay - by).abs(),
        }
    }
}

/// 画像上の矩形（ピクセル）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// 1サイクル分の判定結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub action: Action,
    /// 腕上げ（ジャンプのトリガー）
    pub jump: bool,
    pub duck: bool,
    /// 信頼度を満たした手首の数
    pub wrists_seen: usize,
}

impl Classification {
    pub fn neutral() -> Self {
        Self {
            action: Action::Neutral,
            jump: false,
            duck: false,
            wrists_seen: 0,
        }
    }

    pub fn label(&self) -> String {
        if self.duck {
            return "DUCK".to_string();
        }
        match (self.action, self.jump) {
            (Action::Neutral, true) => "JUMP".to_string(),
            (action, true) => format!("{} + JUMP", action.label()),
            (action, false) => action.label().to_string(),
        }
    }

    /// 強調表示の色。NEUTRAL は None
    pub fn color(&self) -> Option<u32> {
        if self.duck {
            Some(DUCK_COLOR)
        } else if self.jump {
            Some(JUMP_COLOR)
        } else {
            self.action.color()
        }
    }

    /// 押すべきキー。ジャンプキーはデバウンサーの結果で決まる
    pub fn desired_keys(&self, jump_pressed: bool) -> KeySet {
        if self.duck {
            return KeySet::from([KeyId::Duck]);
        }
        let mut keys: KeySet = self.action.keys().iter().copied().collect();
        if jump_pressed {
            keys.insert(KeyId::Jump);
        }
        keys
    }

    /// 強調表示する領域（描画専用）
    pub fn region(&self, zones: &ZoneConfig) -> Option<Region> {
        if self.duck {
            return Some(Region::new(
                -zones.duck_half_width,
                zones.duck_half_width,
                zones.zone_limit,
                zones.duck_bottom,
            ));
        }

        let (x1, x2) = match self.action {
            Action::Sprint => (zones.run_start, zones.sprint_end),
            Action::Run => (zones.run_start, zones.sprint_start),
            Action::BackSprint => (zones.back_sprint_end, zones.back_start),
            Action::Back => (zones.back_sprint_start, zones.back_start),
            Action::Neutral if self.jump => (zones.back_start, zones.run_start),
            Action::Neutral => return None,
        };
        let (y1, y2) = if self.jump {
            (zones.jump_end, zones.jump_start)
        } else {
            (zones.jump_start, zones.zone_limit)
        };
        Some(Region::new(x1, x2, y1, y2))
    }
}

/// 手首1本分の判定
#[derive(Debug, Clone, Copy, PartialEq)]
struct WristReading {
    action: Action,
    jump: bool,
    duck: bool,
}

pub struct ZoneClassifier {
    zones: ZoneConfig,
}

impl ZoneClassifier {
    pub fn new(zones: ZoneConfig) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &ZoneConfig {
        &self.zones
    }

    /// 左右の帯を判定する
    pub fn horizontal(&self, nx: f32) -> Action {
        let z = &self.zones;
        if nx < z.back_sprint_start {
            Action::BackSprint
        } else if nx < z.back_start {
            Action::Back
        } else if nx >= z.sprint_start {
            Action::Sprint
        } else if nx > z.run_start {
            Action::Run
        } else {
            Action::Neutral
        }
    }

    fn read_wrist(&self, nx: f32, ny: f32) -> WristReading {
        let z = &self.zones;
        if ny > z.zone_limit {
            // 腕を下ろした姿勢では左右もジャンプも判定しない
            let duck = z.duck_enabled && ny < z.duck_bottom && nx.abs() <= z.duck_half_width;
            return WristReading {
                action: Action::Neutral,
                jump: false,
                duck,
            };
        }
        WristReading {
            action: self.horizontal(nx),
            jump: ny < z.jump_start,
            duck: false,
        }
    }

    pub fn classify(&self, pose: &Pose, reference: &ReferenceFrame, width: u32, height: u32) -> Classification {
        let mut result = Classification::neutral();

        for index in KeypointIndex::WRISTS {
            let wrist = pose.get(index);
            if !wrist.is_valid(self.zones.wrist_confidence) {
                continue;
            }
            result.wrists_seen += 1;

            let (px, py) = wrist.to_pixel_f32(width, height);
            let (nx, ny) = reference.normalize(px, py);
            let reading = self.read_wrist(nx, ny);

            result.action = result.action.combine(reading.action);
            result.jump |= reading.jump;
            result.duck |= reading.duck;
        }

        if result.duck {
            result.action = Action::Neutral;
            result.jump = false;
        }
        result
    }

    /// 背景に描く全ゾーン (領域, ラベル)
    pub fn background_regions(&self) -> Vec<(Region, &'static str)> {
        let z = &self.zones;
        let mut regions = vec![
            (Region::new(z.back_sprint_end, z.sprint_end, z.jump_end, z.jump_start), "JUMP"),
            (Region::new(z.run_start, z.sprint_start, z.jump_start, z.zone_limit), "RUN"),
            (Region::new(z.sprint_start, z.sprint_end, z.jump_start, z.zone_limit), "SPRINT"),
            (Region::new(z.back_sprint_start, z.back_start, z.jump_start, z.zone_limit), "BACK"),
            (Region::new(z.back_sprint_end, z.back_sprint_start, z.jump_start, z.zone_limit), "SPRINT"),
        ];
        if z.duck_enabled {
            regions.push((
                Region::new(-z.duck_half_width, z.duck_half_width, z.zone_limit, z.duck_bottom),
                "DUCK",
            ));
        }
        regions
    }
}
