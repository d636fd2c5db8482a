use anyhow::Result;

use super::keypoint::Pose;

/// 画像から姿勢を推定する外部モデル
///
/// 推論スレッドからのみ呼ばれる。失敗はそのサイクルの「検出なし」として扱われる。
pub trait PoseSource {
    type Image;

    fn estimate(&mut self, image: &Self::Image) -> Result<Pose>;
}
