use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// ゲームに送る仮想キー
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyId {
    Forward,
    Back,
    Sprint,
    Jump,
    Duck,
}

impl KeyId {
    pub const ALL: [KeyId; 5] = [KeyId::Forward, KeyId::Back, KeyId::Sprint, KeyId::Jump, KeyId::Duck];

    pub fn name(self) -> &'static str {
        match self {
            KeyId::Forward => "forward",
            KeyId::Back => "back",
            KeyId::Sprint => "sprint",
            KeyId::Jump => "jump",
            KeyId::Duck => "duck",
        }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type KeySet = BTreeSet<KeyId>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown key name {0:?}")]
    UnknownKey(String),

    #[error("key backend failure: {0}")]
    Backend(String),
}

/// 仮想キーの押下・解放プリミティブ
pub trait KeyDispatch {
    fn press(&mut self, key: KeyId) -> Result<(), DispatchError>;
    fn release(&mut self, key: KeyId) -> Result<(), DispatchError>;
}

impl<D: KeyDispatch + ?Sized> KeyDispatch for Box<D> {
    fn press(&mut self, key: KeyId) -> Result<(), DispatchError> {
        (**self).press(key)
    }

    fn release(&mut self, key: KeyId) -> Result<(), DispatchError> {
        (**self).release(key)
    }
}

/// キーを送らずにログだけ出す（ドライラン用）
#[derive(Debug, Default)]
pub struct LogDispatch;

impl KeyDispatch for LogDispatch {
    fn press(&mut self, key: KeyId) -> Result<(), DispatchError> {
        info!(%key, "press");
        Ok(())
    }

    fn release(&mut self, key: KeyId) -> Result<(), DispatchError> {
        info!(%key, "release");
        Ok(())
    }
}

/// 押下中のキー集合と目標集合の差分だけを送る
///
/// 押下中集合はこの構造体だけが変更する。同じキーを解放なしに二度押すことはない。
pub struct KeySynchronizer<D: KeyDispatch> {
    dispatch: D,
    held: KeySet,
}

impl<D: KeyDispatch> KeySynchronizer<D> {
    pub fn new(dispatch: D) -> Self {
        Self {
            dispatch,
            held: KeySet::new(),
        }
    }

    pub fn held(&self) -> &KeySet {
        &self.held
    }

    pub fn dispatch(&self) -> &D {
        &self.dispatch
    }

    /// 解放を先に、押下を後に送る
    pub fn sync(&mut self, desired: &KeySet) {
        let to_release: Vec<KeyId> = self.held.difference(desired).copied().collect();
        let to_press: Vec<KeyId> = desired.difference(&self.held).copied().collect();

        for key in to_release {
            self.release_one(key);
        }
        for key in to_press {
            if let Err(e) = self.dispatch.press(key) {
                warn!(%key, "press failed: {}", e);
            }
            // 送信に失敗しても押下扱いにして、後で必ず解放を送る
            self.held.insert(key);
        }
    }

    /// 押下中のキーをすべて解放する
    pub fn release_all(&mut self) {
        if self.held.is_empty() {
            return;
        }
        debug!(count = self.held.len(), "releasing all keys");
        let held = std::mem::take(&mut self.held);
        for key in held {
            if let Err(e) = self.dispatch.release(key) {
                warn!(%key, "release failed: {}", e);
            }
        }
    }

    fn release_one(&mut self, key: KeyId) {
        if let Err(e) = self.dispatch.release(key) {
            warn!(%key, "release failed: {}", e);
        }
        self.held.remove(&key);
    }
}
