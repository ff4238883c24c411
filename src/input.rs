// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/input.rs - 原始输出转储输入
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
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 一帧推理的原始输出转储
///
/// `{"scores": [...], "regressors": [[dx, dy, w, h, x1, y1, ...], ...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDump {
  pub scores: Vec<f32>,
  pub regressors: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DumpFile {
  Single(TensorDump),
  Sequence(Vec<TensorDump>),
}

#[derive(Error, Debug)]
pub enum DumpInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("转储解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 从 JSON 文件读取的转储帧序列 (`dump:///path/to/frames.json`)
///
/// 文件内容可以是单个转储对象，也可以是转储对象数组。
pub struct DumpFileInput {
  frames: std::vec::IntoIter<TensorDump>,
}

impl FromUrlWithScheme for DumpFileInput {
  const SCHEME: &'static str = "dump";
}

impl FromUrl for DumpFileInput {
  type Error = DumpInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(DumpInputError::SchemeMismatch);
    }

    let content = std::fs::read_to_string(url.path())?;
    let input = Self::from_json(&content)?;
    info!("读取转储文件 {}: {} 帧", url.path(), input.len());
    Ok(input)
  }
}

impl DumpFileInput {
  pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
    let frames = match serde_json::from_str(content)? {
      DumpFile::Single(dump) => vec![dump],
      DumpFile::Sequence(dumps) => dumps,
    };
    Ok(DumpFileInput {
      frames: frames.into_iter(),
    })
  }

  pub fn len(&self) -> usize {
    self.frames.len()
  }

  pub fn is_empty(&self) -> bool {
    self.frames.len() == 0
  }
}

impl Iterator for DumpFileInput {
  type Item = TensorDump;

  fn next(&mut self) -> Option<Self::Item> {
    self.frames.next()
  }
}
