use anyhow::Result;
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size, CV_32FC3},
    imgproc,
    prelude::*,
};

/// OpenCV Mat を MoveNet用の入力テンソルに変換
///
/// - BGR -> RGB
/// - size x size にリサイズ（アスペクト比は保持しない）
/// - [1, size, size, 3] の f32 テンソルに変換 (0.0-255.0)
pub fn preprocess_for_movenet(frame: &Mat, size: i32) -> Result<Array4<f32>> {
    if frame.channels() != 3 {
        anyhow::bail!("Expected a 3-channel BGR frame, got {} channels", frame.channels());
    }

    let mut resized = Mat::default();
    imgproc::resize(frame, &mut resized, Size::new(size, size), 0.0, 0.0, imgproc::INTER_LINEAR)?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    let mut float_mat = Mat::default();
    rgb.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, side, side, 3));
    for y in 0..size {
        let row = float_mat.at_row::<opencv::core::Vec3f>(y)?;
        for (x, pixel) in row.iter().enumerate() {
            for c in 0..3 {
                tensor[[0, y as usize, x, c]] = pixel[c];
            }
        }
    }

    Ok(tensor)
}
