// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/args.rs - 命令行公共参数
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

use clap::Args;
use url::Url;

use crate::decoder::{DEFAULT_IOU_THRESHOLD, DEFAULT_SCORE_THRESHOLD, MAX_RESULTS, Thresholds};

/// 解码程序共用的参数
#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
  /// 原始输出转储 (dump:///path/to/frames.json)
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径 (jsonl:///path/to/result.jsonl 或 log:)
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD, value_name = "THRESHOLD")]
  pub score_threshold: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub iou_threshold: f32,

  /// 每帧最多保留的检测数量
  #[arg(long, default_value_t = MAX_RESULTS, value_name = "COUNT")]
  pub max_results: usize,
}

impl DecodeArgs {
  pub fn thresholds(&self) -> Thresholds {
    Thresholds::new(self.score_threshold, self.iou_threshold)
  }
}
