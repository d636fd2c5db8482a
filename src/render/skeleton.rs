use crate::pose::KeypointIndex;

/// 骨格の接続定義 (開始キーポイント, 終了キーポイント)
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex); 16] = [
    // 顔
    (KeypointIndex::LeftEar, KeypointIndex::LeftEye),
    (KeypointIndex::LeftEye, KeypointIndex::Nose),
    (KeypointIndex::Nose, KeypointIndex::RightEye),
    (KeypointIndex::RightEye, KeypointIndex::RightEar),
    // 腕
    (KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder),
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow),
    (KeypointIndex::LeftElbow, KeypointIndex::LeftWrist),
    (KeypointIndex::RightShoulder, KeypointIndex::RightElbow),
    (KeypointIndex::RightElbow, KeypointIndex::RightWrist),
    // 胴体
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftHip),
    (KeypointIndex::RightShoulder, KeypointIndex::RightHip),
    (KeypointIndex::LeftHip, KeypointIndex::RightHip),
    // 脚
    (KeypointIndex::LeftHip, KeypointIndex::LeftKnee),
    (KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle),
    (KeypointIndex::RightHip, KeypointIndex::RightKnee),
    (KeypointIndex::RightKnee, KeypointIndex::RightAnkle),
];

/// 骨格線とキーポイントの色
pub const SKELETON_COLOR: u32 = 0x00FF00;

/// 待機中のゾーン塗り
pub const IDLE_ZONE_COLOR: u32 = 0x282828;
pub const IDLE_ZONE_ALPHA: u8 = 150;

/// 判定中のゾーン塗り
pub const ACTIVE_ZONE_ALPHA: u8 = 120;

pub const BORDER_COLOR: u32 = 0xFFFFFF;

/// 一時停止中の暗転
pub const DIM_COLOR: u32 = 0x000000;
pub const DIM_ALPHA: u8 = 160;

/// 表示するキーポイントの信頼度
pub const DRAW_CONFIDENCE: f32 = 0.3;
