// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/anchor.rs - SSD 锚框生成
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

//! 多尺度 SSD 锚框生成。
//!
//! 检测器输出张量按锚框下标逐行对齐，因此 [`generate`] 的输出顺序
//! （层 → 行 → 列 → 宽高比）是解码正确性的一部分。

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

/// 掌部检测模型的输入边长（像素）
pub const PALM_INPUT_SIZE: u32 = 192;
/// 掌部检测模型的锚框数量
pub const PALM_ANCHOR_COUNT: usize = 2016;

/// 最低层缩减模式下固定使用的宽高比与尺度
const LOWEST_LAYER_SMALL_SCALE: f32 = 0.1;
const LOWEST_LAYER_RATIOS: [f32; 3] = [1.0, 2.0, 0.5];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("层数必须至少为 1")]
  NoLayers,
  #[error("步长数量 ({strides}) 与层数 ({num_layers}) 不一致")]
  StrideCountMismatch { strides: usize, num_layers: usize },
  #[error("特征图尺寸数量不一致: 宽 {width}, 高 {height}, 层数 {num_layers}")]
  FeatureMapCountMismatch {
    width: usize,
    height: usize,
    num_layers: usize,
  },
  #[error("第 {layer} 层步长为 0")]
  ZeroStride { layer: usize },
}

/// 锚框生成配置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorConfig {
  /// 模型输入宽度（像素）
  pub input_size_width: u32,
  /// 模型输入高度（像素）
  pub input_size_height: u32,

  pub min_scale: f32,
  pub max_scale: f32,

  /// 锚框中心在网格单元内的偏移比例
  pub anchor_offset_x: f32,
  pub anchor_offset_y: f32,

  pub num_layers: usize,
  /// 显式指定的每层特征图宽度，为空时由步长推导
  pub feature_map_width: Vec<u32>,
  /// 显式指定的每层特征图高度，为空时由步长推导
  pub feature_map_height: Vec<u32>,
  pub strides: Vec<u32>,

  pub aspect_ratios: Vec<f32>,

  pub reduce_boxes_in_lowest_layer: bool,
  /// 大于 0 时每个网格额外生成一个插值尺度的锚框
  pub interpolated_scale_aspect_ratio: f32,
  /// 为真时锚框只有中心点，宽高隐含为 1.0
  pub fixed_anchor_size: bool,
}

impl AnchorConfig {
  /// 掌部检测模型 (192x192, 2016 个锚框) 的配置
  pub fn palm_detection() -> Self {
    AnchorConfig {
      input_size_width: PALM_INPUT_SIZE,
      input_size_height: PALM_INPUT_SIZE,
      min_scale: 0.1484375,
      max_scale: 0.75,
      anchor_offset_x: 0.5,
      anchor_offset_y: 0.5,
      num_layers: 4,
      feature_map_width: Vec::new(),
      feature_map_height: Vec::new(),
      strides: vec![8, 16, 16, 16],
      aspect_ratios: vec![1.0],
      reduce_boxes_in_lowest_layer: false,
      interpolated_scale_aspect_ratio: 1.0,
      fixed_anchor_size: true,
    }
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.num_layers < 1 {
      return Err(ConfigError::NoLayers);
    }
    if self.strides.len() != self.num_layers {
      return Err(ConfigError::StrideCountMismatch {
        strides: self.strides.len(),
        num_layers: self.num_layers,
      });
    }
    if !self.feature_map_width.is_empty() || !self.feature_map_height.is_empty() {
      let width = self.feature_map_width.len();
      let height = self.feature_map_height.len();
      if width != self.num_layers || height != self.num_layers {
        return Err(ConfigError::FeatureMapCountMismatch {
          width,
          height,
          num_layers: self.num_layers,
        });
      }
    }
    if let Some(layer) = self.strides.iter().position(|&s| s == 0) {
      return Err(ConfigError::ZeroStride { layer });
    }
    Ok(())
  }

  /// 第 `layer` 层的特征图尺寸 (宽, 高)
  fn feature_map_size(&self, layer: usize) -> (u32, u32) {
    if !self.feature_map_width.is_empty() {
      return (
        self.feature_map_width[layer],
        self.feature_map_height[layer],
      );
    }
    let stride = self.strides[layer];
    (
      self.input_size_width.div_ceil(stride),
      self.input_size_height.div_ceil(stride),
    )
  }

  /// 在 `min_scale` 与 `max_scale` 之间按层线性插值
  fn scale(&self, layer: usize) -> f32 {
    if self.num_layers == 1 {
      return self.min_scale;
    }
    self.min_scale
      + (self.max_scale - self.min_scale) * layer as f32 / (self.num_layers - 1) as f32
  }
}

/// 一个锚框
///
/// 坐标均为归一化的网格相对值。`size` 为 `None` 表示固定尺寸锚框。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anchor {
  pub x: f32,
  pub y: f32,
  pub size: Option<(f32, f32)>,
}

impl Anchor {
  pub fn width(&self) -> f32 {
    self.size.map(|(w, _)| w).unwrap_or(1.0)
  }

  pub fn height(&self) -> f32 {
    self.size.map(|(_, h)| h).unwrap_or(1.0)
  }
}

/// 生成某一层的 (宽高比, 尺度) 列表
fn layer_ratio_scales(config: &AnchorConfig, layer: usize) -> Vec<(f32, f32)> {
  let scale = config.scale(layer);

  if layer == 0 && config.reduce_boxes_in_lowest_layer {
    return vec![
      (LOWEST_LAYER_RATIOS[0], LOWEST_LAYER_SMALL_SCALE),
      (LOWEST_LAYER_RATIOS[1], scale),
      (LOWEST_LAYER_RATIOS[2], scale),
    ];
  }

  let mut pairs: Vec<(f32, f32)> = config
    .aspect_ratios
    .iter()
    .map(|&ratio| (ratio, scale))
    .collect();

  if config.interpolated_scale_aspect_ratio > 0.0 {
    let next_scale = if layer + 1 == config.num_layers {
      1.0
    } else {
      config.scale(layer + 1)
    };
    pairs.push((
      config.interpolated_scale_aspect_ratio,
      (scale * next_scale).sqrt(),
    ));
  }

  pairs
}

/// 根据配置生成有序锚框序列
pub fn generate(config: &AnchorConfig) -> Result<Vec<Anchor>, ConfigError> {
  if let Err(e) = config.validate() {
    error!("锚框配置无效: {}", e);
    return Err(e);
  }

  let mut anchors = Vec::new();

  for layer in 0..config.num_layers {
    let (map_w, map_h) = config.feature_map_size(layer);
    let pairs = layer_ratio_scales(config, layer);
    debug!(
      "第 {} 层: 特征图 {}x{}, 每格 {} 个锚框",
      layer,
      map_w,
      map_h,
      pairs.len()
    );

    for gy in 0..map_h {
      for gx in 0..map_w {
        let x = (gx as f32 + config.anchor_offset_x) / map_w as f32;
        let y = (gy as f32 + config.anchor_offset_y) / map_h as f32;

        for &(ratio, scale) in &pairs {
          let size = if config.fixed_anchor_size {
            None
          } else {
            let ratio_sqrt = ratio.sqrt();
            Some((scale * ratio_sqrt, scale / ratio_sqrt))
          };
          anchors.push(Anchor { x, y, size });
        }
      }
    }
  }

  info!("生成锚框 {} 个", anchors.len());
  Ok(anchors)
}
