// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/model.rs - 推理引擎接口
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

use crate::tensor::RawDetectionTensor;

/// 外部推理引擎
///
/// 引擎负责把输入写成模型张量并执行推理，然后将分类 logit 与回归结果
/// 写入调用方提供的 `output`。解码不属于引擎的职责。
pub trait Model {
  type Input;
  type Error;

  fn infer(&self, input: &Self::Input, output: &mut RawDetectionTensor) -> Result<(), Self::Error>;
}

mod replay;
pub use self::replay::{ReplayEngine, ReplayError};
