/*
 * @Description  : 训练监听器：每次`fit`完成与每轮结束时由计算图回调，通过`tracing`汇报进度
 */

use std::time::Instant;

use tracing::info;

/// 训练过程的回调接口
pub trait TrainingListener: Send {
    /// 每次`fit`完成后调用；`iteration`为完成后的迭代次数
    fn iteration_done(&mut self, graph: &str, iteration: usize, epoch: usize, score: f32);

    fn on_epoch_end(&mut self, _graph: &str, _epoch: usize) {}
}

/// 每`frequency`次迭代输出一次损失
#[derive(Debug, Clone)]
pub struct ScoreIterationListener {
    frequency: usize,
}

impl ScoreIterationListener {
    /// `frequency`为0时按1处理
    pub fn new(frequency: usize) -> Self {
        Self {
            frequency: frequency.max(1),
        }
    }
}

impl TrainingListener for ScoreIterationListener {
    fn iteration_done(&mut self, graph: &str, iteration: usize, epoch: usize, score: f32) {
        if iteration % self.frequency == 0 {
            info!(graph, iteration, epoch, score, "第{iteration}次迭代的损失: {score}");
        }
    }
}

/// 每`frequency`次迭代输出一次吞吐（迭代/秒）与损失
#[derive(Debug, Clone)]
pub struct PerformanceListener {
    frequency: usize,
    last_report: Instant,
    last_iteration: usize,
}

impl PerformanceListener {
    pub fn new(frequency: usize) -> Self {
        Self {
            frequency: frequency.max(1),
            last_report: Instant::now(),
            last_iteration: 0,
        }
    }
}

impl TrainingListener for PerformanceListener {
    fn iteration_done(&mut self, graph: &str, iteration: usize, epoch: usize, score: f32) {
        if iteration % self.frequency != 0 {
            return;
        }
        let elapsed = self.last_report.elapsed().as_secs_f64();
        let done = iteration.saturating_sub(self.last_iteration);
        let per_sec = if elapsed > 0.0 { done as f64 / elapsed } else { 0.0 };
        info!(
            graph,
            iteration,
            epoch,
            score,
            "迭代{iteration}：{per_sec:.3}次/秒，损失{score}"
        );
        self.last_report = Instant::now();
        self.last_iteration = iteration;
    }

    fn on_epoch_end(&mut self, graph: &str, epoch: usize) {
        info!(graph, epoch, "第{epoch}轮结束");
    }
}
