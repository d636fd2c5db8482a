use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// 設定値の整合性エラー
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tracking.lose_scale_min ({lose}) must be below tracking.acquire_scale_min ({acquire})")]
    Hysteresis { lose: f32, acquire: f32 },

    #[error("zones must satisfy back_sprint_start < back_start <= 0 <= run_start < sprint_start")]
    BandOrder,

    #[error("zones.jump_start ({jump}) must be below zones.zone_limit ({limit})")]
    VerticalOrder { jump: f32, limit: f32 },

    #[error("smoothing.alpha must be in (0, 1], got {0}")]
    Alpha(f32),

    #[error("{0} must be positive")]
    NonPositive(&'static str),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub zones: ZoneConfig,
    #[serde(default)]
    pub jump: JumpConfig,
    #[serde(default)]
    pub pause: PauseConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    /// 左右反転（鏡像表示）
    #[serde(default = "default_true")]
    pub mirror: bool,
}

fn default_camera_width() -> u32 { 1280 }
fn default_camera_height() -> u32 { 720 }
fn default_true() -> bool { true }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
            mirror: default_true(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: String,
    /// 入力解像度 (lightning: 192, thunder: 256)
    #[serde(default = "default_input_size")]
    pub input_size: u32,
}

fn default_model_path() -> String { "models/movenet_lightning.onnx".to_string() }
fn default_input_size() -> u32 { 192 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            input_size: default_input_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// 追跡開始に必要な肩幅（ピクセル）
    #[serde(default = "default_acquire_scale_min")]
    pub acquire_scale_min: f32,
    /// 追跡を失う肩幅（ピクセル）。acquire_scale_min より小さいこと
    #[serde(default = "default_lose_scale_min")]
    pub lose_scale_min: f32,
    /// 追跡開始時の肩中点の画像中央からの許容ずれ（画像幅比）
    #[serde(default = "default_center_tolerance")]
    pub center_tolerance: f32,
    #[serde(default = "default_keypoint_confidence")]
    pub shoulder_confidence: f32,
}

fn default_acquire_scale_min() -> f32 { 30.0 }
fn default_lose_scale_min() -> f32 { 20.0 }
fn default_center_tolerance() -> f32 { 0.15 }
fn default_keypoint_confidence() -> f32 { 0.3 }

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            acquire_scale_min: default_acquire_scale_min(),
            lose_scale_min: default_lose_scale_min(),
            center_tolerance: default_center_tolerance(),
            shoulder_confidence: default_keypoint_confidence(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothingConfig {
    /// この差未満の変化は無視する（ピクセル）
    #[serde(default = "default_jitter_threshold")]
    pub jitter_threshold: f32,
    /// 残り距離のうち1フレームで詰める割合
    #[serde(default = "default_smooth_alpha")]
    pub alpha: f32,
}

fn default_jitter_threshold() -> f32 { 20.0 }
fn default_smooth_alpha() -> f32 { 0.8 }

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            jitter_threshold: default_jitter_threshold(),
            alpha: default_smooth_alpha(),
        }
    }
}

/// 手首オフセットの判定帯（肩幅単位）
#[derive(Debug, Deserialize, Clone)]
pub struct ZoneConfig {
    #[serde(default = "default_back_sprint_end")]
    pub back_sprint_end: f32,
    #[serde(default = "default_back_sprint_start")]
    pub back_sprint_start: f32,
    #[serde(default = "default_back_start")]
    pub back_start: f32,
    #[serde(default = "default_run_start")]
    pub run_start: f32,
    #[serde(default = "default_sprint_start")]
    pub sprint_start: f32,
    #[serde(default = "default_sprint_end")]
    pub sprint_end: f32,
    #[serde(default = "default_jump_end")]
    pub jump_end: f32,
    #[serde(default = "default_jump_start")]
    pub jump_start: f32,
    /// これより下の手首は左右判定に使わない
    #[serde(default = "default_zone_limit")]
    pub zone_limit: f32,
    #[serde(default)]
    pub duck_enabled: bool,
    #[serde(default = "default_duck_bottom")]
    pub duck_bottom: f32,
    #[serde(default = "default_duck_half_width")]
    pub duck_half_width: f32,
    #[serde(default = "default_keypoint_confidence")]
    pub wrist_confidence: f32,
}

fn default_back_sprint_end() -> f32 { -3.0 }
fn default_back_sprint_start() -> f32 { -2.0 }
fn default_back_start() -> f32 { -0.5 }
fn default_run_start() -> f32 { 0.5 }
fn default_sprint_start() -> f32 { 2.0 }
fn default_sprint_end() -> f32 { 3.0 }
fn default_jump_end() -> f32 { -2.0 }
fn default_jump_start() -> f32 { -1.0 }
fn default_zone_limit() -> f32 { 0.8 }
fn default_duck_bottom() -> f32 { 2.5 }
fn default_duck_half_width() -> f32 { 0.5 }

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            back_sprint_end: default_back_sprint_end(),
            back_sprint_start: default_back_sprint_start(),
            back_start: default_back_start(),
            run_start: default_run_start(),
            sprint_start: default_sprint_start(),
            sprint_end: default_sprint_end(),
            jump_end: default_jump_end(),
            jump_start: default_jump_start(),
            zone_limit: default_zone_limit(),
            duck_enabled: false,
            duck_bottom: default_duck_bottom(),
            duck_half_width: default_duck_half_width(),
            wrist_confidence: default_keypoint_confidence(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JumpConfig {
    /// 最初の押下を保持する時間
    #[serde(default = "default_held_ms")]
    pub held_ms: u64,
    /// 連打の間の離す時間
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_held_ms() -> u64 { 400 }
fn default_cooldown_ms() -> u64 { 75 }

impl JumpConfig {
    pub fn held(&self) -> Duration {
        Duration::from_millis(self.held_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            held_ms: default_held_ms(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PauseConfig {
    /// 再開前のカウントダウン秒数
    #[serde(default = "default_resume_countdown_secs")]
    pub resume_countdown_secs: u64,
}

fn default_resume_countdown_secs() -> u64 { 3 }

impl PauseConfig {
    pub fn resume_countdown(&self) -> Duration {
        Duration::from_secs(self.resume_countdown_secs)
    }
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            resume_countdown_secs: default_resume_countdown_secs(),
        }
    }
}

/// 仮想キーの割り当て
#[derive(Debug, Deserialize, Clone)]
pub struct KeysConfig {
    /// "uinput" または "log"
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_forward_key")]
    pub forward: String,
    #[serde(default = "default_back_key")]
    pub back: String,
    #[serde(default = "default_sprint_key")]
    pub sprint: String,
    #[serde(default = "default_jump_key")]
    pub jump: String,
    #[serde(default = "default_duck_key")]
    pub duck: String,
}

fn default_backend() -> String { "uinput".to_string() }
fn default_forward_key() -> String { "D".to_string() }
fn default_back_key() -> String { "A".to_string() }
fn default_sprint_key() -> String { "R".to_string() }
fn default_jump_key() -> String { "Space".to_string() }
fn default_duck_key() -> String { "S".to_string() }

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            forward: default_forward_key(),
            back: default_back_key(),
            sprint: default_sprint_key(),
            jump: default_jump_key(),
            duck: default_duck_key(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_window_title")]
    pub title: String,
    #[serde(default = "default_true")]
    pub skeleton: bool,
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

fn default_window_title() -> String { "Pose Pad".to_string() }
fn default_target_fps() -> u32 { 60 }

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            title: default_window_title(),
            skeleton: default_true(),
            target_fps: default_target_fps(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 読み込みに失敗した場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tracking;
        if t.lose_scale_min >= t.acquire_scale_min {
            return Err(ConfigError::Hysteresis {
                lose: t.lose_scale_min,
                acquire: t.acquire_scale_min,
            });
        }
        if t.lose_scale_min <= 0.0 {
            return Err(ConfigError::NonPositive("tracking.lose_scale_min"));
        }

        let z = &self.zones;
        let bands_ok = z.back_sprint_start < z.back_start
            && z.back_start <= 0.0
            && 0.0 <= z.run_start
            && z.run_start < z.sprint_start;
        if !bands_ok {
            return Err(ConfigError::BandOrder);
        }
        if z.jump_start >= z.zone_limit {
            return Err(ConfigError::VerticalOrder {
                jump: z.jump_start,
                limit: z.zone_limit,
            });
        }

        let alpha = self.smoothing.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::Alpha(alpha));
        }
        if self.jump.held_ms == 0 {
            return Err(ConfigError::NonPositive("jump.held_ms"));
        }
        if self.jump.cooldown_ms == 0 {
            return Err(ConfigError::NonPositive("jump.cooldown_ms"));
        }
        if self.model.input_size == 0 {
            return Err(ConfigError::NonPositive("model.input_size"));
        }
        Ok(())
    }
}
