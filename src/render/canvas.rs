use crate::control::PixelRect;
use crate::control::PauseStatus;
use crate::overlay::{DisplayImage, OverlaySnapshot};
use crate::pose::Pose;
use crate::render::skeleton::{
    ACTIVE_ZONE_ALPHA, BORDER_COLOR, DIM_ALPHA, DIM_COLOR, DRAW_CONFIDENCE, IDLE_ZONE_ALPHA, IDLE_ZONE_COLOR,
    SKELETON_COLOR, SKELETON_CONNECTIONS,
};

/// 0x00RRGGBB のピクセルバッファ
pub struct Canvas {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

/// `src` を `alpha` (0..=255) で `dst` に重ねる
pub fn blend(dst: u32, src: u32, alpha: u8) -> u32 {
    let a = alpha as u32;
    let mix = |shift: u32| {
        let d = (dst >> shift) & 0xFF;
        let s = (src >> shift) & 0xFF;
        ((s * a + d * (255 - a)) / 255) << shift
    };
    mix(16) | mix(8) | mix(0)
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: vec![0u32; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buffer[y * self.width + x])
    }

    pub fn fill(&mut self, color: u32) {
        self.buffer.fill(color);
    }

    /// フレームをバッファにコピー。サイズが違えば最近傍で拡縮する
    pub fn draw_image(&mut self, image: &DisplayImage) {
        if image.width == 0 || image.height == 0 || image.pixels.len() < image.width * image.height {
            return;
        }
        if image.width == self.width && image.height == self.height {
            self.buffer.copy_from_slice(&image.pixels[..self.width * self.height]);
            return;
        }
        for y in 0..self.height {
            let sy = y * image.height / self.height;
            for x in 0..self.width {
                let sx = x * image.width / self.width;
                self.buffer[y * self.width + x] = image.pixels[sy * image.width + sx];
            }
        }
    }

    /// 半透明の矩形塗り（画面外はクリップ）
    pub fn fill_rect(&mut self, rect: &PixelRect, color: u32, alpha: u8) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let i = y * self.width + x;
                self.buffer[i] = blend(self.buffer[i], color, alpha);
            }
        }
    }

    /// 1px の枠線
    pub fn stroke_rect(&mut self, rect: &PixelRect, color: u32) {
        let x0 = rect.x.round() as i32;
        let y0 = rect.y.round() as i32;
        let x1 = (rect.x + rect.width).round() as i32 - 1;
        let y1 = (rect.y + rect.height).round() as i32 - 1;
        if x1 < x0 || y1 < y0 {
            return;
        }
        self.draw_line(x0, y0, x1, y0, color);
        self.draw_line(x0, y1, x1, y1, color);
        self.draw_line(x0, y0, x0, y1, color);
        self.draw_line(x1, y0, x1, y1, color);
    }

    /// 画面全体を暗くする
    pub fn dim(&mut self) {
        for px in self.buffer.iter_mut() {
            *px = blend(*px, DIM_COLOR, DIM_ALPHA);
        }
    }

    /// 姿勢を描画（キーポイントは正規化座標）
    pub fn draw_pose(&mut self, pose: &Pose) {
        let w = self.width as u32;
        let h = self.height as u32;

        for (start_idx, end_idx) in SKELETON_CONNECTIONS.iter() {
            let start = pose.get(*start_idx);
            let end = pose.get(*end_idx);

            if start.is_valid(DRAW_CONFIDENCE) && end.is_valid(DRAW_CONFIDENCE) {
                let (x1, y1) = start.to_pixel(w, h);
                let (x2, y2) = end.to_pixel(w, h);
                self.draw_line(x1, y1, x2, y2, SKELETON_COLOR);
            }
        }

        for kp in pose.keypoints.iter().filter(|kp| kp.is_valid(DRAW_CONFIDENCE)) {
            let (px, py) = kp.to_pixel(w, h);
            self.draw_circle(px, py, 4, SKELETON_COLOR);
        }
    }

    /// 1サイクル分のオーバーレイを重ねる
    ///
    /// 矩形はフレーム座標で届くので、キャンバスの大きさに合わせて拡縮する。
    pub fn draw_snapshot(&mut self, snapshot: &OverlaySnapshot, skeleton: bool) {
        let (fw, fh) = snapshot.frame_size;
        let sx = if fw > 0 { self.width as f32 / fw as f32 } else { 1.0 };
        let sy = if fh > 0 { self.height as f32 / fh as f32 } else { 1.0 };
        let scale = |r: &PixelRect| PixelRect {
            x: r.x * sx,
            y: r.y * sy,
            width: r.width * sx,
            height: r.height * sy,
        };

        if snapshot.tracking && snapshot.pause.is_running() {
            for (rect, _) in &snapshot.zones {
                self.fill_rect(&scale(rect), IDLE_ZONE_COLOR, IDLE_ZONE_ALPHA);
            }
            if let (Some(rect), Some(color)) = (snapshot.highlight, snapshot.color) {
                let rect = scale(&rect);
                self.fill_rect(&rect, color, ACTIVE_ZONE_ALPHA);
                self.stroke_rect(&rect, BORDER_COLOR);
            }
            if skeleton {
                if let Some(pose) = &snapshot.keypoints {
                    self.draw_pose(pose);
                }
            }
        }

        if snapshot.pause != PauseStatus::Running {
            self.dim();
        }
    }

    fn clip(&self, rect: &PixelRect) -> Option<(usize, usize, usize, usize)> {
        let x0 = rect.x.round().max(0.0) as usize;
        let y0 = rect.y.round().max(0.0) as usize;
        let x1 = ((rect.x + rect.width).round().max(0.0) as usize).min(self.width);
        let y1 = ((rect.y + rect.height).round().max(0.0) as usize).min(self.height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    /// Bresenhamのアルゴリズムで線を描画
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointIndex};

    fn rect(x: f32, y: f32, width: f32, height: f32) -> PixelRect {
        PixelRect { x, y, width, height }
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(0x000000, 0xFFFFFF, 255), 0xFFFFFF);
        assert_eq!(blend(0x123456, 0xFFFFFF, 0), 0x123456);
        assert_eq!(blend(0x000000, 0xFF0000, 51), 0x330000);
    }

    #[test]
    fn test_fill_rect_clips_to_canvas() {
        let mut c = Canvas::new(10, 10);
        c.fill_rect(&rect(-5.0, 8.0, 8.0, 10.0), 0xFFFFFF, 255);
        assert_eq!(c.pixel(0, 9), Some(0xFFFFFF));
        assert_eq!(c.pixel(2, 8), Some(0xFFFFFF));
        assert_eq!(c.pixel(3, 8), Some(0));
        assert_eq!(c.pixel(0, 7), Some(0));

        // 完全に画面外
        c.fill_rect(&rect(20.0, 20.0, 5.0, 5.0), 0xFF0000, 255);
        assert!(c.buffer().iter().all(|&p| p != 0xFF0000));
    }

    #[test]
    fn test_stroke_rect_outline_only() {
        let mut c = Canvas::new(10, 10);
        c.stroke_rect(&rect(2.0, 2.0, 5.0, 4.0), BORDER_COLOR);
        assert_eq!(c.pixel(2, 2), Some(BORDER_COLOR));
        assert_eq!(c.pixel(6, 5), Some(BORDER_COLOR));
        assert_eq!(c.pixel(4, 2), Some(BORDER_COLOR));
        assert_eq!(c.pixel(4, 4), Some(0));
        assert_eq!(c.pixel(7, 2), Some(0));
    }

    #[test]
    fn test_draw_image_scales_nearest() {
        let image = DisplayImage {
            width: 2,
            height: 1,
            pixels: vec![0xAA0000, 0x0000BB],
        };
        let mut c = Canvas::new(4, 2);
        c.draw_image(&image);
        assert_eq!(c.buffer(), &[0xAA0000, 0xAA0000, 0x0000BB, 0x0000BB, 0xAA0000, 0xAA0000, 0x0000BB, 0x0000BB]);

        // 画素数が足りない画像は無視
        let broken = DisplayImage { width: 4, height: 4, pixels: vec![0xFFFFFF] };
        c.draw_image(&broken);
        assert_eq!(c.pixel(0, 0), Some(0xAA0000));
    }

    #[test]
    fn test_draw_pose_skips_low_confidence() {
        let mut pose = Pose::default();
        pose.set(KeypointIndex::LeftShoulder, Keypoint::new(0.2, 0.5, 0.9));
        pose.set(KeypointIndex::RightShoulder, Keypoint::new(0.8, 0.5, 0.9));
        pose.set(KeypointIndex::Nose, Keypoint::new(0.5, 0.1, 0.1));
        let mut c = Canvas::new(100, 100);
        c.draw_pose(&pose);
        assert_eq!(c.pixel(50, 50), Some(SKELETON_COLOR));
        assert_eq!(c.pixel(50, 10), Some(0));
    }

    #[test]
    fn test_snapshot_highlight_and_dim() {
        let mut snapshot = OverlaySnapshot {
            tracking: true,
            color: Some(0x00FF78),
            highlight: Some(rect(10.0, 10.0, 20.0, 20.0)),
            frame_size: (200, 200),
            ..Default::default()
        };
        let mut c = Canvas::new(100, 100);
        c.draw_snapshot(&snapshot, false);
        // フレーム座標 (10,10)-(30,30) はキャンバス上 (5,5)-(15,15)
        assert_eq!(c.pixel(5, 5), Some(BORDER_COLOR));
        assert_eq!(c.pixel(10, 10), Some(blend(0, 0x00FF78, ACTIVE_ZONE_ALPHA)));
        assert_eq!(c.pixel(20, 20), Some(0));

        c.fill(0xFFFFFF);
        snapshot.pause = PauseStatus::Paused;
        c.draw_snapshot(&snapshot, false);
        // 一時停止中はゾーンを描かずに暗転のみ
        assert_eq!(c.pixel(10, 10), Some(blend(0xFFFFFF, DIM_COLOR, DIM_ALPHA)));
    }
}
