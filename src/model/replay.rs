// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/model/replay.rs - 回放已录制的原始输出
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
use tracing::{debug, error};

use crate::{input::TensorDump, model::Model, tensor::RawDetectionTensor};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
  #[error("分类输出长度不匹配: 期望 {expected}, 实际 {actual}")]
  ScoreShape { expected: usize, actual: usize },
  #[error("回归输出行数不匹配: 期望 {expected}, 实际 {actual}")]
  RowCount { expected: usize, actual: usize },
  #[error("第 {row} 行回归长度不匹配: 期望 {expected}, 实际 {actual}")]
  RegressorShape {
    row: usize,
    expected: usize,
    actual: usize,
  },
}

/// 把录制的张量转储当作推理结果写出的引擎
///
/// 输出张量的形状由调用方固定，转储形状不一致时报错，不做截断或填充。
#[derive(Debug, Default, Clone)]
pub struct ReplayEngine;

impl Model for ReplayEngine {
  type Input = TensorDump;
  type Error = ReplayError;

  fn infer(&self, input: &Self::Input, output: &mut RawDetectionTensor) -> Result<(), Self::Error> {
    let anchor_count = output.anchor_count();
    if input.scores.len() != anchor_count {
      error!(
        "转储分类输出长度 {} 与模型锚框数 {} 不一致",
        input.scores.len(),
        anchor_count
      );
      return Err(ReplayError::ScoreShape {
        expected: anchor_count,
        actual: input.scores.len(),
      });
    }
    if input.regressors.len() != anchor_count {
      return Err(ReplayError::RowCount {
        expected: anchor_count,
        actual: input.regressors.len(),
      });
    }

    let row_len = output.row_len();
    if let Some((row, values)) = input
      .regressors
      .iter()
      .enumerate()
      .find(|(_, values)| values.len() != row_len)
    {
      return Err(ReplayError::RegressorShape {
        row,
        expected: row_len,
        actual: values.len(),
      });
    }

    output.scores_mut().copy_from_slice(&input.scores);
    for (dst, src) in output
      .regressors_mut()
      .chunks_exact_mut(row_len)
      .zip(&input.regressors)
    {
      dst.copy_from_slice(src);
    }

    debug!("回放 {} 个锚框的原始输出", anchor_count);
    Ok(())
  }
}
