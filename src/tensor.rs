// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/tensor.rs - 检测器原始输出张量
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

/// 回归行中边界框占用的长度: dx, dy, w, h
pub const BOX_REGRESSOR_LEN: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
  #[error("回归行长度 {0} 无效，需为 4 + 2K")]
  InvalidRowLength(usize),
  #[error("回归数据长度不匹配: 期望 {expected}, 实际 {actual}")]
  RegressorLength { expected: usize, actual: usize },
  #[error("第 {row} 行回归长度为 {actual}, 期望 {expected}")]
  RaggedRow {
    row: usize,
    expected: usize,
    actual: usize,
  },
}

fn check_row_len(row_len: usize) -> Result<(), TensorError> {
  if row_len < BOX_REGRESSOR_LEN || (row_len - BOX_REGRESSOR_LEN) % 2 != 0 {
    return Err(TensorError::InvalidRowLength(row_len));
  }
  Ok(())
}

/// 一次推理的原始输出
///
/// `scores` 为每个锚框的 logit，`regressors` 按行优先存储 `[锚框数, 4 + 2K]`。
/// 两者都按锚框下标对齐。
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetectionTensor {
  scores: Box<[f32]>,
  regressors: Box<[f32]>,
  row_len: usize,
}

impl RawDetectionTensor {
  /// 创建全零张量，供推理引擎写入
  pub fn zeros(anchor_count: usize, num_keypoints: usize) -> Self {
    let row_len = BOX_REGRESSOR_LEN + 2 * num_keypoints;
    RawDetectionTensor {
      scores: vec![0.0; anchor_count].into_boxed_slice(),
      regressors: vec![0.0; anchor_count * row_len].into_boxed_slice(),
      row_len,
    }
  }

  pub fn new(scores: Vec<f32>, regressors: Vec<f32>, row_len: usize) -> Result<Self, TensorError> {
    check_row_len(row_len)?;
    let expected = scores.len() * row_len;
    if regressors.len() != expected {
      return Err(TensorError::RegressorLength {
        expected,
        actual: regressors.len(),
      });
    }

    Ok(RawDetectionTensor {
      scores: scores.into_boxed_slice(),
      regressors: regressors.into_boxed_slice(),
      row_len,
    })
  }

  /// 由逐行的回归数据构造，所有行长度必须一致
  pub fn from_rows(scores: Vec<f32>, rows: &[Vec<f32>]) -> Result<Self, TensorError> {
    let row_len = rows.first().map(Vec::len).unwrap_or(BOX_REGRESSOR_LEN);
    check_row_len(row_len)?;
    if rows.len() != scores.len() {
      return Err(TensorError::RegressorLength {
        expected: scores.len() * row_len,
        actual: rows.iter().map(Vec::len).sum(),
      });
    }

    let mut regressors = Vec::with_capacity(rows.len() * row_len);
    for (row, values) in rows.iter().enumerate() {
      if values.len() != row_len {
        return Err(TensorError::RaggedRow {
          row,
          expected: row_len,
          actual: values.len(),
        });
      }
      regressors.extend_from_slice(values);
    }

    Self::new(scores, regressors, row_len)
  }

  pub fn anchor_count(&self) -> usize {
    self.scores.len()
  }

  pub fn num_keypoints(&self) -> usize {
    (self.row_len - BOX_REGRESSOR_LEN) / 2
  }

  pub fn row_len(&self) -> usize {
    self.row_len
  }

  pub fn scores(&self) -> &[f32] {
    &self.scores
  }

  pub fn scores_mut(&mut self) -> &mut [f32] {
    &mut self.scores
  }

  pub fn regressors_mut(&mut self) -> &mut [f32] {
    &mut self.regressors
  }

  /// 第 `index` 个锚框的回归行
  pub fn regressor(&self, index: usize) -> &[f32] {
    let start = index * self.row_len;
    &self.regressors[start..start + self.row_len]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zeros_has_expected_shape() {
    let tensor = RawDetectionTensor::zeros(2016, 7);
    assert_eq!(tensor.anchor_count(), 2016);
    assert_eq!(tensor.row_len(), 18);
    assert_eq!(tensor.num_keypoints(), 7);
    assert_eq!(tensor.regressor(2015).len(), 18);
  }

  #[test]
  fn rows_are_indexed_by_anchor() {
    let tensor = RawDetectionTensor::from_rows(
      vec![0.1, 0.2],
      &[vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]],
    )
    .unwrap();
    assert_eq!(tensor.regressor(1), &[5.0, 6.0, 7.0, 8.0]);
    assert_eq!(tensor.num_keypoints(), 0);
  }

  #[test]
  fn rejects_odd_keypoint_payload() {
    assert_eq!(
      RawDetectionTensor::new(vec![0.0], vec![0.0; 5], 5),
      Err(TensorError::InvalidRowLength(5))
    );
    assert_eq!(
      RawDetectionTensor::new(vec![0.0], vec![0.0; 3], 3),
      Err(TensorError::InvalidRowLength(3))
    );
  }

  #[test]
  fn rejects_short_regressors() {
    assert_eq!(
      RawDetectionTensor::new(vec![0.0, 0.0], vec![0.0; 6], 6),
      Err(TensorError::RegressorLength {
        expected: 12,
        actual: 6
      })
    );
  }

  #[test]
  fn rejects_ragged_rows() {
    let result =
      RawDetectionTensor::from_rows(vec![0.0, 0.0], &[vec![0.0; 6], vec![0.0; 4]]);
    assert_eq!(
      result,
      Err(TensorError::RaggedRow {
        row: 1,
        expected: 6,
        actual: 4
      })
    );
  }
}
