// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/output.rs - 检测结果输出
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

use std::{
  fs::File,
  io::{BufWriter, Write},
  sync::Mutex,
};

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decoder::Detection};

pub trait Render {
  type Error;
  fn render_result(&self, frame_index: usize, detections: &[Detection]) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("不支持的输出方案: {0}")]
  UnsupportedScheme(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输出文件锁已失效")]
  Poisoned,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
  frame: usize,
  detections: &'a [Detection],
}

/// 每帧写一行 JSON (`jsonl:///path/to/result.jsonl`)
pub struct JsonLinesOutput {
  writer: Mutex<BufWriter<File>>,
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonLinesOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }

    info!("写入检测结果到 {}", url.path());
    let file = File::create(url.path())?;
    Ok(JsonLinesOutput {
      writer: Mutex::new(BufWriter::new(file)),
    })
  }
}

impl Render for JsonLinesOutput {
  type Error = OutputError;

  fn render_result(&self, frame_index: usize, detections: &[Detection]) -> Result<(), Self::Error> {
    let mut writer = self.writer.lock().map_err(|_| OutputError::Poisoned)?;
    serde_json::to_writer(
      &mut *writer,
      &FrameRecord {
        frame: frame_index,
        detections,
      },
    )?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
  }
}

/// 通过日志输出检测结果 (`log:`)
#[derive(Debug, Default)]
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    Ok(LogOutput)
  }
}

impl Render for LogOutput {
  type Error = OutputError;

  fn render_result(&self, frame_index: usize, detections: &[Detection]) -> Result<(), Self::Error> {
    info!("帧 {}: 检测到 {} 个目标", frame_index, detections.len());
    for det in detections {
      info!(
        "  - {:.2}% at ({:.3}, {:.3}, {:.3}x{:.3})",
        det.score * 100.0,
        det.rect.x,
        det.rect.y,
        det.rect.width,
        det.rect.height
      );
    }
    Ok(())
  }
}

pub enum OutputWrapper {
  JsonLines(JsonLinesOutput),
  Log(LogOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      s if s == JsonLinesOutput::SCHEME => {
        Ok(OutputWrapper::JsonLines(JsonLinesOutput::from_url(url)?))
      }
      s if s == LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput::from_url(url)?)),
      scheme => {
        error!("不支持的输出方案: {}", scheme);
        Err(OutputError::UnsupportedScheme(scheme.to_string()))
      }
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame_index: usize, detections: &[Detection]) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::JsonLines(output) => output.render_result(frame_index, detections),
      OutputWrapper::Log(output) => output.render_result(frame_index, detections),
    }
  }
}
