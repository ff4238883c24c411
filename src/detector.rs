// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/detector.rs - 掌部检测器
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  anchor::{self, Anchor, AnchorConfig, ConfigError, PALM_ANCHOR_COUNT},
  decoder::{DecodeError, Detection, DetectionDecoder, MAX_RESULTS, Thresholds},
  model::Model,
  tensor::RawDetectionTensor,
};

/// 掌部检测模型的关键点数量
pub const PALM_NUM_KEYPOINTS: usize = 7;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("锚框配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("锚框数量必须为 {expected}, 实际生成 {actual}")]
  AnchorCount { expected: usize, actual: usize },
  #[error("推理引擎错误: {0}")]
  Engine(#[source] BoxedError),
  #[error("解码错误: {0}")]
  Decode(#[from] DecodeError),
}

pub struct PalmDetectorBuilder {
  anchor_config: AnchorConfig,
  anchor_count: Option<usize>,
  num_keypoints: usize,
  thresholds: Thresholds,
  max_results: usize,
}

impl Default for PalmDetectorBuilder {
  fn default() -> Self {
    PalmDetectorBuilder {
      anchor_config: AnchorConfig::palm_detection(),
      anchor_count: Some(PALM_ANCHOR_COUNT),
      num_keypoints: PALM_NUM_KEYPOINTS,
      thresholds: Thresholds::default(),
      max_results: MAX_RESULTS,
    }
  }
}

impl PalmDetectorBuilder {
  /// 使用自定义锚框配置，锚框数量不再做固定校验
  pub fn anchor_config(mut self, config: AnchorConfig) -> Self {
    self.anchor_config = config;
    self.anchor_count = None;
    self
  }

  /// 要求生成的锚框数量与模型输出一致
  pub fn anchor_count(mut self, count: usize) -> Self {
    self.anchor_count = Some(count);
    self
  }

  pub fn num_keypoints(mut self, num_keypoints: usize) -> Self {
    self.num_keypoints = num_keypoints;
    self
  }

  pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
    self.thresholds = thresholds;
    self
  }

  pub fn max_results(mut self, max_results: usize) -> Self {
    self.max_results = max_results;
    self
  }

  pub fn build<M: Model>(self, model: M) -> Result<PalmDetector<M>, DetectorError> {
    let anchors = anchor::generate(&self.anchor_config)?;

    if let Some(expected) = self.anchor_count.filter(|&n| n != anchors.len()) {
      error!("锚框数量必须为 {}, 实际生成 {}", expected, anchors.len());
      return Err(DetectorError::AnchorCount {
        expected,
        actual: anchors.len(),
      });
    }

    info!(
      "检测器就绪: 输入 {}x{}, 锚框 {} 个, 关键点 {} 个",
      self.anchor_config.input_size_width,
      self.anchor_config.input_size_height,
      anchors.len(),
      self.num_keypoints
    );

    let raw = RawDetectionTensor::zeros(anchors.len(), self.num_keypoints);
    let decoder = DetectionDecoder::new(
      self.anchor_config.input_size_width,
      self.anchor_config.input_size_height,
    )
    .with_max_results(self.max_results);

    Ok(PalmDetector {
      model,
      anchors: anchors.into_boxed_slice(),
      raw,
      decoder,
      thresholds: self.thresholds,
    })
  }
}

/// 推理引擎 + 锚框 + 解码器
///
/// 原始输出张量与解码缓冲区在多次调用之间复用，因此 [`detect`](Self::detect)
/// 需要 `&mut self`。
pub struct PalmDetector<M> {
  model: M,
  anchors: Box<[Anchor]>,
  raw: RawDetectionTensor,
  decoder: DetectionDecoder,
  thresholds: Thresholds,
}

impl<M: Model> PalmDetector<M> {
  pub fn anchors(&self) -> &[Anchor] {
    &self.anchors
  }

  pub fn thresholds(&self) -> Thresholds {
    self.thresholds
  }

  pub fn set_thresholds(&mut self, thresholds: Thresholds) {
    self.thresholds = thresholds;
  }

  pub fn detect(&mut self, input: &M::Input) -> Result<&[Detection], DetectorError>
  where
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    debug!("执行模型推理");
    self
      .model
      .infer(input, &mut self.raw)
      .map_err(|e| DetectorError::Engine(Box::new(e)))?;

    debug!("解码模型输出");
    let detections = self
      .decoder
      .decode(&self.raw, &self.anchors, self.thresholds)?;
    Ok(detections)
  }
}
