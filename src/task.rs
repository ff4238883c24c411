// 该文件是 Zhangwen （掌纹） 项目的一部分。
// src/task.rs - 检测任务
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

use std::{sync::mpsc, thread, time::Duration};
use tracing::{info, warn};

use crate::{
  decoder::Detection,
  detector::{DetectorError, PalmDetector},
  model::Model,
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, detector: PalmDetector<M>, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Error = ME>,
  O: Render<Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut detector: PalmDetector<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = std::time::Instant::now();
    let detections = detector.detect(&frame)?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);
    output.render_result(0, detections)?;
    info!("输出完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对第一帧重复推理，统计平均耗时
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    RepeatShotTask { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  /// 前两次作为预热不计入平均值，因此至少重复 3 次
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times.max(3);
    self
  }
}

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Error = ME>,
  O: Render<Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut detector: PalmDetector<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat_times);
    for i in 0..self.repeat_times {
      let now = std::time::Instant::now();
      let detections = detector.detect(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(i, detections)?;
      times.push(elapsed);
    }

    warn!(
      "平均推理时间: {:.2?}",
      times.iter().skip(2).sum::<Duration>() / (times.len() - 2) as u32
    );

    Ok(())
  }
}

/// 推理与解码放到后台线程，结果交回调用线程输出
///
/// 解码结果在工作线程内拷贝后再发送，调用线程不会持有检测器缓冲区的引用。
#[derive(Debug)]
pub struct BackgroundTask {
  frame_number: Option<usize>,
  queue_depth: usize,
}

impl Default for BackgroundTask {
  fn default() -> Self {
    BackgroundTask {
      frame_number: None,
      queue_depth: 2,
    }
  }
}

impl BackgroundTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
    self.queue_depth = queue_depth;
    self
  }
}

type FrameResult = (usize, Result<Vec<Detection>, DetectorError>);

impl<
  F: Send,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F> + Send,
  M: Model<Input = F, Error = ME> + Send,
  O: Render<Error = RE>,
> Task<I, M, O> for BackgroundTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, mut detector: PalmDetector<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let limit = self.frame_number.unwrap_or(usize::MAX);

    thread::scope(|scope| {
      let (frame_tx, frame_rx) = mpsc::sync_channel::<(usize, F)>(self.queue_depth);
      let (result_tx, result_rx) = mpsc::channel::<FrameResult>();

      scope.spawn(move || {
        for (index, frame) in input.take(limit).enumerate() {
          if frame_tx.send((index, frame)).is_err() {
            break;
          }
        }
      });

      scope.spawn(move || {
        for (index, frame) in frame_rx {
          let now = std::time::Instant::now();
          let result = detector.detect(&frame).map(<[Detection]>::to_vec);
          info!("第 {} 帧推理完成，耗时: {:.2?}", index, now.elapsed());
          if result_tx.send((index, result)).is_err() {
            warn!("结果接收端已关闭，退出工作线程");
            break;
          }
        }
      });

      let mut frame_count = 0usize;
      for (index, result) in result_rx {
        let detections = result?;
        output.render_result(index, &detections)?;
        frame_count += 1;
      }

      info!("任务完成，共处理 {} 帧", frame_count);
      Ok(())
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    anchor::AnchorConfig,
    detector::PalmDetectorBuilder,
    input::TensorDump,
    model::ReplayEngine,
  };
  use std::sync::Mutex;

  #[derive(Default)]
  struct Collect {
    frames: Mutex<Vec<(usize, Vec<Detection>)>>,
  }

  impl Render for &Collect {
    type Error = std::convert::Infallible;

    fn render_result(&self, frame_index: usize, detections: &[Detection]) -> Result<(), Self::Error> {
      self
        .frames
        .lock()
        .unwrap()
        .push((frame_index, detections.to_vec()));
      Ok(())
    }
  }

  fn detector() -> PalmDetector<ReplayEngine> {
    let config = AnchorConfig {
      input_size_width: 16,
      input_size_height: 16,
      min_scale: 0.2,
      max_scale: 0.9,
      anchor_offset_x: 0.5,
      anchor_offset_y: 0.5,
      num_layers: 1,
      feature_map_width: Vec::new(),
      feature_map_height: Vec::new(),
      strides: vec![8],
      aspect_ratios: vec![1.0],
      reduce_boxes_in_lowest_layer: false,
      interpolated_scale_aspect_ratio: 0.0,
      fixed_anchor_size: true,
    };
    PalmDetectorBuilder::default()
      .anchor_config(config)
      .num_keypoints(0)
      .build(ReplayEngine)
      .unwrap()
  }

  fn frame(hits: usize) -> TensorDump {
    let mut scores = vec![-10.0; 4];
    for score in scores.iter_mut().take(hits) {
      *score = 10.0;
    }
    TensorDump {
      scores,
      regressors: vec![vec![0.0, 0.0, 4.0, 4.0]; 4],
    }
  }

  #[test]
  fn one_shot_renders_first_frame() {
    let collect = Collect::default();
    OneShotTask
      .run_task(vec![frame(2), frame(4)].into_iter(), detector(), &collect)
      .unwrap();
    let frames = collect.frames.into_inner().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].1.len(), 2);
  }

  #[test]
  fn one_shot_without_input_fails() {
    let collect = Collect::default();
    let result = OneShotTask.run_task(Vec::<TensorDump>::new().into_iter(), detector(), &collect);
    assert!(result.is_err());
  }

  #[test]
  fn repeat_shot_repeats() {
    let collect = Collect::default();
    RepeatShotTask::default()
      .with_repeat_times(5)
      .run_task(vec![frame(1)].into_iter(), detector(), &collect)
      .unwrap();
    assert_eq!(collect.frames.into_inner().unwrap().len(), 5);
  }

  #[test]
  fn background_keeps_frame_order() {
    let collect = Collect::default();
    let frames = vec![frame(0), frame(1), frame(2), frame(3), frame(4)];
    BackgroundTask::default()
      .run_task(frames.into_iter(), detector(), &collect)
      .unwrap();
    let rendered = collect.frames.into_inner().unwrap();
    let counts: Vec<(usize, usize)> = rendered.iter().map(|(i, d)| (*i, d.len())).collect();
    assert_eq!(counts, vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
  }

  #[test]
  fn background_honours_frame_limit() {
    let collect = Collect::default();
    let frames = vec![frame(1); 6];
    BackgroundTask::default()
      .with_frame_number(Some(3))
      .run_task(frames.into_iter(), detector(), &collect)
      .unwrap();
    assert_eq!(collect.frames.into_inner().unwrap().len(), 3);
  }

  #[test]
  fn background_surfaces_engine_errors() {
    let collect = Collect::default();
    let bad = TensorDump {
      scores: vec![0.0; 2],
      regressors: vec![vec![0.0; 4]; 2],
    };
    let result = BackgroundTask::default().run_task(
      vec![frame(1), bad, frame(1)].into_iter(),
      detector(),
      &collect,
    );
    assert!(result.is_err());
    assert_eq!(collect.frames.into_inner().unwrap().len(), 1);
  }
}
