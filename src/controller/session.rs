/*
 * @Description  : 训练会话：迭代计数、由计数推出的轮次，以及训练开关
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 控制器的迭代计数。每个训练tick加一，
/// 轮次 = 迭代次数 / 数据集大小 + 1（从1开始）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingSession {
    iteration: usize,
    dataset_size: usize,
}

impl TrainingSession {
    /// `dataset_size`为一轮的迭代次数（迭代器的`max_size()`），为0时按1计算轮次
    pub const fn new(dataset_size: usize) -> Self {
        Self::resume(0, dataset_size)
    }

    /// 从已有的迭代次数继续（如加载模型后）
    pub const fn resume(iteration: usize, dataset_size: usize) -> Self {
        Self {
            iteration,
            dataset_size,
        }
    }

    pub const fn iteration(&self) -> usize {
        self.iteration
    }

    pub const fn dataset_size(&self) -> usize {
        self.dataset_size
    }

    pub const fn epoch(&self) -> usize {
        let size = if self.dataset_size == 0 {
            1
        } else {
            self.dataset_size
        };
        self.iteration / size + 1
    }

    /// 迭代次数加一，返回新的迭代次数
    pub fn advance(&mut self) -> usize {
        self.iteration += 1;
        self.iteration
    }
}

/// 每个训练tick完成后的回调
pub trait IterationObserver: Send {
    fn iteration_done(&mut self, session: &TrainingSession, score: f32);
}

/// 训练开关。可克隆到其他线程，每个训练tick开始时检查
#[derive(Debug, Clone, Default)]
pub struct TrainingSwitch(Arc<AtomicBool>);

impl TrainingSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
