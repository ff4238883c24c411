// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/decoder.rs - 检测结果解码
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::{
  anchor::Anchor,
  geometry::{Point, Rect},
  nms::non_max_suppression,
  tensor::RawDetectionTensor,
};

/// 每次解码最多返回的检测数量
pub const MAX_RESULTS: usize = 4;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
  #[error("锚框数量 ({anchors}) 与输出张量锚框数量 ({tensor}) 不一致")]
  SizeMismatch { anchors: usize, tensor: usize },
  #[error("阈值 {name} = {value} 超出 [0, 1] 范围")]
  InvalidThreshold { name: &'static str, value: f32 },
}

/// 检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  /// 置信度 (sigmoid 之后)
  pub score: f32,
  /// 归一化边界框
  pub rect: Rect,
  /// 归一化关键点
  pub keypoints: Vec<Point>,
}

/// 解码阈值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
  pub score: f32,
  pub iou: f32,
}

impl Default for Thresholds {
  fn default() -> Self {
    Thresholds {
      score: DEFAULT_SCORE_THRESHOLD,
      iou: DEFAULT_IOU_THRESHOLD,
    }
  }
}

impl Thresholds {
  pub fn new(score: f32, iou: f32) -> Self {
    Thresholds { score, iou }
  }

  fn validate(&self) -> Result<(), DecodeError> {
    for (name, value) in [("score", self.score), ("iou", self.iou)] {
      if !(0.0..=1.0).contains(&value) {
        return Err(DecodeError::InvalidThreshold { name, value });
      }
    }
    Ok(())
  }
}

/// 检测解码器
///
/// 持有候选与结果两个工作缓冲区，每次 [`decode`](Self::decode) 开始时清空复用。
/// 返回的切片借用自解码器内部，下一次解码前需要自行拷贝。
#[derive(Debug, Clone)]
pub struct DetectionDecoder {
  /// 模型输入宽度（像素）
  grid_width: f32,
  /// 模型输入高度（像素）
  grid_height: f32,
  max_results: usize,
  candidates: Vec<Detection>,
  results: Vec<Detection>,
}

impl DetectionDecoder {
  pub fn new(input_width: u32, input_height: u32) -> Self {
    DetectionDecoder {
      grid_width: input_width as f32,
      grid_height: input_height as f32,
      max_results: MAX_RESULTS,
      candidates: Vec::new(),
      results: Vec::with_capacity(MAX_RESULTS),
    }
  }

  pub fn with_max_results(mut self, max_results: usize) -> Self {
    self.max_results = max_results;
    self
  }

  pub fn max_results(&self) -> usize {
    self.max_results
  }

  pub fn decode(
    &mut self,
    raw: &RawDetectionTensor,
    anchors: &[Anchor],
    thresholds: Thresholds,
  ) -> Result<&[Detection], DecodeError> {
    thresholds.validate()?;
    if anchors.len() != raw.anchor_count() {
      error!(
        "锚框数量不匹配: 锚框 {}, 输出张量 {}",
        anchors.len(),
        raw.anchor_count()
      );
      return Err(DecodeError::SizeMismatch {
        anchors: anchors.len(),
        tensor: raw.anchor_count(),
      });
    }

    self.candidates.clear();
    let num_keypoints = raw.num_keypoints();

    for (index, (anchor, &logit)) in anchors.iter().zip(raw.scores()).enumerate() {
      let score = sigmoid(logit);
      // NaN 同样视为未通过
      if !(score >= thresholds.score) {
        continue;
      }

      let reg = raw.regressor(index);
      let anchor_x = anchor.x * self.grid_width;
      let anchor_y = anchor.y * self.grid_height;

      let cx = (reg[0] + anchor_x) / self.grid_width;
      let cy = (reg[1] + anchor_y) / self.grid_height;
      // 高度同样按宽度归一化，与参考实现数值保持一致
      let w = reg[2] / self.grid_width;
      let h = reg[3] / self.grid_width;

      let keypoints = (0..num_keypoints)
        .map(|j| {
          let kx = (reg[4 + 2 * j] + anchor_x) / self.grid_width;
          let ky = (reg[5 + 2 * j] + anchor_y) / self.grid_height;
          Point::new(kx, ky)
        })
        .collect();

      self.candidates.push(Detection {
        score,
        rect: Rect::from_center(cx, cy, w, h),
        keypoints,
      });
    }

    non_max_suppression(
      &mut self.candidates,
      &mut self.results,
      thresholds.iou,
      self.max_results,
    );
    debug!(
      "候选 {} 个, 抑制后保留 {} 个",
      self.candidates.len(),
      self.results.len()
    );

    Ok(&self.results)
  }
}

pub fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

/// sigmoid 的反函数，便于构造测试数据
pub fn logit(p: f32) -> f32 {
  (p / (1.0 - p)).ln()
}
