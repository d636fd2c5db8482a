use anyhow::{anyhow, Context, Result};
use ndarray::Array4;
use opencv::core::Mat;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use tracing::info;

use super::keypoint::{Keypoint, KeypointIndex, Pose};
use super::preprocess::preprocess_for_movenet;
use super::source::PoseSource;

/// MoveNet (SinglePose) を使用した姿勢検出器
pub struct PoseDetector {
    session: Session,
    input_name: String,
    output_name: String,
    input_size: i32,
}

impl PoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| anyhow!("Model has no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| anyhow!("Model has no outputs"))?;
        info!(input = %input_name, output = %output_name, "MoveNet session ready");

        Ok(Self {
            session,
            input_name,
            output_name,
            input_size: input_size as i32,
        })
    }

    /// 前処理済みテンソルから姿勢を検出
    ///
    /// 入力: [1, S, S, 3] の f32 テンソル
    /// 出力: Pose (17キーポイント)
    pub fn detect(&mut self, input: Array4<f32>) -> Result<Pose> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        // MoveNet の出力は [1, 1, 17, 3] (y, x, confidence)
        let output: ndarray::ArrayViewD<f32> = outputs[self.output_name.as_str()]
            .try_extract_array()
            .context("Failed to extract output tensor")?;
        if output.shape() != [1, 1, KeypointIndex::COUNT, 3] {
            anyhow::bail!("Unexpected MoveNet output shape {:?}", output.shape());
        }

        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for (i, kp) in keypoints.iter_mut().enumerate() {
            let y = output[[0, 0, i, 0]];
            let x = output[[0, 0, i, 1]];
            let confidence = output[[0, 0, i, 2]];
            *kp = Keypoint::new(x, y, confidence);
        }

        Ok(Pose::new(keypoints))
    }
}

impl PoseSource for PoseDetector {
    type Image = Mat;

    fn estimate(&mut self, image: &Mat) -> Result<Pose> {
        let input = preprocess_for_movenet(image, self.input_size)?;
        self.detect(input)
    }
}
