/*
 * @Description  : 控制器的错误类型
 */

use thiserror::Error;

use crate::gan::GanError;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Gan(#[from] GanError),
    /// 上一次操作尚未结束（如训练步仍在执行），本次调用被拒绝
    #[error("控制器正忙，拒绝重入")]
    Busy,
    /// 训练开启期间不允许加载、保存与测试
    #[error("训练进行中，无法执行`{0}`")]
    TrainingInProgress(&'static str),
    /// 之前的操作在持有锁时panic
    #[error("控制器状态已损坏（锁中毒）")]
    Poisoned,
}
