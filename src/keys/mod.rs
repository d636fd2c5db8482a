//! 物理キーへの割り当てとキー送出バックエンドの選択

#[cfg(all(feature = "uinput", target_os = "linux"))]
pub mod uinput;

use anyhow::Result;
use tracing::info;

use crate::config::KeysConfig;
use crate::control::{DispatchError, KeyDispatch, KeyId, LogDispatch};

/// 設定ファイルで指定できる物理キー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// 'A'..='Z'
    Letter(u8),
    /// '0'..='9'
    Digit(u8),
    Space,
    Enter,
    Escape,
    Tab,
    LeftShift,
    LeftControl,
    LeftAlt,
    Left,
    Right,
    Up,
    Down,
}

impl KeyCode {
    /// 大文字小文字は区別しない ("d", "Space", "left_shift" など)
    pub fn parse(name: &str) -> Result<Self, DispatchError> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        if let [c] = normalized.as_bytes() {
            return match c {
                b'a'..=b'z' => Ok(KeyCode::Letter(c.to_ascii_uppercase())),
                b'0'..=b'9' => Ok(KeyCode::Digit(c - b'0')),
                _ => Err(DispatchError::UnknownKey(name.to_string())),
            };
        }

        match normalized.as_str() {
            "space" => Ok(KeyCode::Space),
            "enter" | "return" => Ok(KeyCode::Enter),
            "esc" | "escape" => Ok(KeyCode::Escape),
            "tab" => Ok(KeyCode::Tab),
            "shift" | "leftshift" => Ok(KeyCode::LeftShift),
            "ctrl" | "control" | "leftctrl" | "leftcontrol" => Ok(KeyCode::LeftControl),
            "alt" | "leftalt" => Ok(KeyCode::LeftAlt),
            "left" => Ok(KeyCode::Left),
            "right" => Ok(KeyCode::Right),
            "up" => Ok(KeyCode::Up),
            "down" => Ok(KeyCode::Down),
            _ => Err(DispatchError::UnknownKey(name.to_string())),
        }
    }
}

/// 論理キー → 物理キー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub sprint: KeyCode,
    pub jump: KeyCode,
    pub duck: KeyCode,
}

impl KeyBindings {
    pub fn from_config(config: &KeysConfig) -> Result<Self, DispatchError> {
        Ok(Self {
            forward: KeyCode::parse(&config.forward)?,
            back: KeyCode::parse(&config.back)?,
            sprint: KeyCode::parse(&config.sprint)?,
            jump: KeyCode::parse(&config.jump)?,
            duck: KeyCode::parse(&config.duck)?,
        })
    }

    pub fn get(&self, key: KeyId) -> KeyCode {
        match key {
            KeyId::Forward => self.forward,
            KeyId::Back => self.back,
            KeyId::Sprint => self.sprint,
            KeyId::Jump => self.jump,
            KeyId::Duck => self.duck,
        }
    }
}

pub type BoxedDispatch = Box<dyn KeyDispatch + Send>;

/// 設定に従ってキー送出先を開く
///
/// キー名が不正なら起動時エラー。uinput が使えないビルドではログ出力にフォールバックする。
pub fn open_dispatch(config: &KeysConfig) -> Result<BoxedDispatch> {
    let bindings = KeyBindings::from_config(config)?;
    info!(?bindings, backend = %config.backend, "key bindings");

    match config.backend.as_str() {
        "log" => Ok(Box::new(LogDispatch)),
        "uinput" => open_uinput(bindings),
        other => anyhow::bail!("Unknown key backend: {}", other),
    }
}

#[cfg(all(feature = "uinput", target_os = "linux"))]
fn open_uinput(bindings: KeyBindings) -> Result<BoxedDispatch> {
    Ok(Box::new(uinput::UinputKeyboard::new(bindings)?))
}

#[cfg(not(all(feature = "uinput", target_os = "linux")))]
fn open_uinput(_bindings: KeyBindings) -> Result<BoxedDispatch> {
    tracing::warn!("uinput backend is not available in this build, keys are only logged");
    Ok(Box::new(LogDispatch))
}
