// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/bin/dump_anchors.rs - 导出掌部检测锚框
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

use anyhow::Result;
use clap::Parser;

use tracing::info;
use zhangwen::anchor::{self, AnchorConfig};

/// 以 JSON 输出掌部检测模型的锚框
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 同时输出锚框配置
  #[arg(long)]
  pub with_config: bool,

  /// 格式化输出
  #[arg(long)]
  pub pretty: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let config = AnchorConfig::palm_detection();
  let anchors = anchor::generate(&config)?;
  info!("锚框数量: {}", anchors.len());

  let value = if args.with_config {
    serde_json::json!({ "config": config, "anchors": anchors })
  } else {
    serde_json::to_value(&anchors)?
  };

  let text = if args.pretty {
    serde_json::to_string_pretty(&value)?
  } else {
    serde_json::to_string(&value)?
  };
  println!("{}", text);

  Ok(())
}
