// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/geometry.rs - 归一化矩形与关键点
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

/// 轴对齐矩形
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
  /// 左上角 x 坐标
  pub x: f32,
  /// 左上角 y 坐标
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl Rect {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Rect {
      x,
      y,
      width,
      height,
    }
  }

  /// 由中心点和宽高构造
  pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
    Rect::new(cx - width * 0.5, cy - height * 0.5, width, height)
  }

  pub fn x_max(&self) -> f32 {
    self.x + self.width
  }

  pub fn y_max(&self) -> f32 {
    self.y + self.height
  }

  pub fn area(&self) -> f32 {
    self.width * self.height
  }

  /// 计算交并比，不相交或任一面积为 0 时返回 0
  pub fn iou(&self, other: &Rect) -> f32 {
    let area_a = self.area();
    let area_b = other.area();
    if area_a <= 0.0 || area_b <= 0.0 {
      return 0.0;
    }

    let x1 = self.x.max(other.x);
    let y1 = self.y.max(other.y);
    let x2 = self.x_max().min(other.x_max());
    let y2 = self.y_max().min(other.y_max());
    if x2 <= x1 || y2 <= y1 {
      return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    intersection / (area_a + area_b - intersection)
  }
}

/// 归一化关键点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

impl Point {
  pub fn new(x: f32, y: f32) -> Self {
    Point { x, y }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn identical_rects_have_unit_iou() {
    let r = Rect::new(0.1, 0.2, 0.3, 0.4);
    assert_relative_eq!(r.iou(&r), 1.0);
  }

  #[test]
  fn disjoint_rects_have_zero_iou() {
    let a = Rect::new(0.0, 0.0, 0.5, 0.5);
    let b = Rect::new(0.6, 0.6, 0.2, 0.2);
    assert_eq!(a.iou(&b), 0.0);
    assert_eq!(b.iou(&a), 0.0);
  }

  #[test]
  fn touching_edges_do_not_overlap() {
    let a = Rect::new(0.0, 0.0, 0.5, 0.5);
    let b = Rect::new(0.5, 0.0, 0.5, 0.5);
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn zero_area_gives_zero() {
    let a = Rect::new(0.1, 0.1, 0.0, 0.5);
    assert_eq!(a.iou(&a), 0.0);
    let b = Rect::new(0.0, 0.0, 1.0, 1.0);
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn partial_overlap() {
    let a = Rect::new(0.0, 0.0, 0.5, 0.5);
    let b = Rect::new(0.25, 0.0, 0.5, 0.5);
    // 交集 0.125, 并集 0.375
    assert_relative_eq!(a.iou(&b), 1.0 / 3.0, epsilon = 1e-6);
    assert_relative_eq!(a.iou(&b), b.iou(&a));
  }

  #[test]
  fn from_center_places_top_left() {
    let r = Rect::from_center(0.5, 0.5, 0.2, 0.4);
    assert_relative_eq!(r.x, 0.4);
    assert_relative_eq!(r.y, 0.3);
    assert_relative_eq!(r.x_max(), 0.6);
  }
}
