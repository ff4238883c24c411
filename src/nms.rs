// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/nms.rs - 非极大值抑制
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

use crate::decoder::Detection;

/// 贪心非极大值抑制
///
/// `candidates` 会按置信度降序就地稳定排序，分数相同的保持原有（锚框）顺序。
/// 被抑制的候选直接丢弃，不参与合并。`accepted` 会先被清空，最多保留
/// `max_results` 个结果。
pub fn non_max_suppression(
  candidates: &mut [Detection],
  accepted: &mut Vec<Detection>,
  iou_threshold: f32,
  max_results: usize,
) {
  accepted.clear();
  if max_results == 0 {
    return;
  }

  // 稳定排序
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  for candidate in candidates.iter() {
    let suppressed = accepted
      .iter()
      .any(|kept| candidate.rect.iou(&kept.rect) >= iou_threshold);
    if suppressed {
      continue;
    }

    accepted.push(candidate.clone());
    if accepted.len() >= max_results {
      break;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Rect;

  fn det(score: f32, x: f32, y: f32, w: f32, h: f32) -> Detection {
    Detection {
      score,
      rect: Rect::new(x, y, w, h),
      keypoints: Vec::new(),
    }
  }

  #[test]
  fn overlapping_lower_score_is_suppressed() {
    let a = det(0.9, 0.0, 0.0, 0.5, 0.5);
    let b = det(0.8, 0.02, 0.02, 0.5, 0.5);
    let c = det(0.75, 0.6, 0.6, 0.2, 0.2);
    let mut candidates = vec![c.clone(), b, a.clone()];
    let mut accepted = Vec::new();
    non_max_suppression(&mut candidates, &mut accepted, 0.3, 4);
    assert_eq!(accepted, vec![a, c]);
  }

  #[test]
  fn ties_keep_original_order() {
    let first = det(0.8, 0.0, 0.0, 0.1, 0.1);
    let second = det(0.8, 0.5, 0.5, 0.1, 0.1);
    let mut candidates = vec![first.clone(), second.clone()];
    let mut accepted = Vec::new();
    non_max_suppression(&mut candidates, &mut accepted, 0.3, 4);
    assert_eq!(accepted, vec![first, second]);
  }

  #[test]
  fn stops_at_max_results() {
    let mut candidates: Vec<Detection> = (0..10)
      .map(|i| det(0.5 + i as f32 * 0.01, i as f32 * 0.1, 0.0, 0.05, 0.05))
      .collect();
    let mut accepted = Vec::new();
    non_max_suppression(&mut candidates, &mut accepted, 0.3, 4);
    assert_eq!(accepted.len(), 4);
    assert!(accepted.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(accepted[0].score, 0.5 + 9.0 * 0.01);
  }

  #[test]
  fn iou_equal_to_threshold_is_suppressed() {
    // 交并比恰好为 1.0
    let a = det(0.9, 0.0, 0.0, 0.5, 0.5);
    let b = det(0.8, 0.0, 0.0, 0.5, 0.5);
    let mut candidates = vec![a.clone(), b];
    let mut accepted = Vec::new();
    non_max_suppression(&mut candidates, &mut accepted, 1.0, 4);
    assert_eq!(accepted, vec![a]);
  }

  #[test]
  fn clears_previous_results() {
    let mut accepted = vec![det(0.9, 0.0, 0.0, 0.1, 0.1)];
    non_max_suppression(&mut [], &mut accepted, 0.3, 4);
    assert!(accepted.is_empty());
  }
}
