/*
 * @Description  : 无界面的训练控制器：替代图形界面的加载/保存/训练/测试操作，
 *                 维护迭代与轮次计数，并以开关与互斥锁管理训练循环
 */

mod error;
mod handle;
mod learning;
mod session;

pub use error::ControllerError;
pub use handle::ControllerHandle;
pub use learning::{LearningController, ModelPaths, TestReport};
pub use session::{IterationObserver, TrainingSession, TrainingSwitch};

#[cfg(test)]
mod tests;
