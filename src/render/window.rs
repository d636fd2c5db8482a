use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::overlay::{DisplayImage, OverlaySnapshot};
use crate::render::canvas::Canvas;

/// minifbを使用したレンダラー
pub struct MinifbRenderer {
    window: Window,
    canvas: Canvas,
    title: String,
    status: String,
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize, target_fps: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(target_fps);

        Ok(Self {
            window,
            canvas: Canvas::new(width, height),
            title: title.to_string(),
            status: String::new(),
        })
    }

    /// ウィンドウが開いているか（Escで閉じる）
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// 一時停止キーが押されたか（押下の瞬間のみ）
    pub fn pause_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::P, KeyRepeat::No)
    }

    /// フレームとオーバーレイを描いて表示する
    pub fn render(
        &mut self,
        image: Option<&DisplayImage>,
        snapshot: Option<&OverlaySnapshot>,
        skeleton: bool,
    ) -> Result<()> {
        match image {
            Some(image) => self.canvas.draw_image(image),
            None => self.canvas.fill(0),
        }
        if let Some(snapshot) = snapshot {
            self.canvas.draw_snapshot(snapshot, skeleton);
            let status = snapshot.status_line();
            if status != self.status {
                self.window.set_title(&format!("{} - {}", self.title, status));
                self.status = status;
            }
        }
        self.update()
    }

    /// バッファをウィンドウに表示
    fn update(&mut self) -> Result<()> {
        self.window
            .update_with_buffer(self.canvas.buffer(), self.canvas.width(), self.canvas.height())?;
        Ok(())
    }
}
