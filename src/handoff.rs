//! スレッド間の受け渡し
//!
//! - [`FrameHandoff`]: 容量1のフレーム受け渡し。未消費のフレームがあれば新しいフレームは捨てる
//! - [`LatestSlot`]: 最新値の公開。書き込みは常に上書き、読み手は最新の値だけを見る

use arc_swap::ArcSwapOption;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// `take_timeout` の結果
#[derive(Debug, PartialEq)]
pub enum Take<T> {
    Frame(T),
    Timeout,
    /// 送信側がすべて破棄された
    Closed,
}

/// 送信側（取得スレッド）
pub struct FrameSender<T> {
    tx: Sender<T>,
}

/// 受信側（推論スレッド）
pub struct FrameReceiver<T> {
    rx: Receiver<T>,
}

/// 1フレーム分のスロットを持つハンドオフを作る
pub fn frame_handoff<T>() -> (FrameSender<T>, FrameReceiver<T>) {
    let (tx, rx) = bounded(1);
    (FrameSender { tx }, FrameReceiver { rx })
}

impl<T> FrameSender<T> {
    /// フレームを渡す。スロットが埋まっていれば破棄して false を返す
    pub fn offer(&self, frame: T) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl<T> FrameReceiver<T> {
    pub fn take_timeout(&self, timeout: Duration) -> Take<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Take::Frame(frame),
            Err(RecvTimeoutError::Timeout) => Take::Timeout,
            Err(RecvTimeoutError::Disconnected) => Take::Closed,
        }
    }
}

/// 最新値を1つだけ保持する公開スロット
///
/// 書き込みはポインタの差し替えだけで、読み手も書き手もロックを取らない。
pub struct LatestSlot<T> {
    latest: ArcSwapOption<T>,
    version: AtomicU64,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            latest: ArcSwapOption::empty(),
            version: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, value: T) {
        self.latest.store(Some(Arc::new(value)));
        self.version.fetch_add(1, Ordering::Release);
    }

    /// 最新値。初回の公開前のみ None
    pub fn latest(&self) -> Option<Arc<T>> {
        self.latest.load_full()
    }

    /// 公開のたびにインクリメントされる
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
