/*
 * @Description  : 参数更新器（SGD / Adam / Nesterov动量）及梯度归一化策略
 *
 * `Updater`是可序列化的超参数配置；真正带状态（动量、一二阶矩）的更新器由
 * `Updater::instantiate`创建，状态按"层名:参数序号"索引，可随模型一同保存。
 */

mod adam;
mod nesterovs;
mod normalization;
mod sgd;

pub use adam::Adam;
use enum_dispatch::enum_dispatch;
pub use nesterovs::Nesterovs;
pub use normalization::GradientNormalization;
use serde::{Deserialize, Serialize};
pub use sgd::Sgd;

use super::GraphError;
use crate::tensor::Tensor;

/// 更新器的超参数配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Updater {
    Sgd {
        learning_rate: f32,
    },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    Nesterovs {
        learning_rate: f32,
        momentum: f32,
    },
}

impl Default for Updater {
    fn default() -> Self {
        Self::Sgd {
            learning_rate: 1e-3,
        }
    }
}

impl Updater {
    pub const fn sgd(learning_rate: f32) -> Self {
        Self::Sgd { learning_rate }
    }

    /// β1=0.9，β2=0.999，ε=1e-8
    pub const fn adam(learning_rate: f32) -> Self {
        Self::adam_with_beta1(learning_rate, 0.9)
    }

    pub const fn adam_with_beta1(learning_rate: f32, beta1: f32) -> Self {
        Self::Adam {
            learning_rate,
            beta1,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    pub const fn nesterovs(learning_rate: f32, momentum: f32) -> Self {
        Self::Nesterovs {
            learning_rate,
            momentum,
        }
    }

    pub const fn learning_rate(&self) -> f32 {
        match *self {
            Self::Sgd { learning_rate }
            | Self::Adam { learning_rate, .. }
            | Self::Nesterovs { learning_rate, .. } => learning_rate,
        }
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        let lr = self.learning_rate();
        if !(lr.is_finite() && lr >= 0.0) {
            return Err(GraphError::Configuration(format!(
                "学习率须为非负有限数，得到{lr}"
            )));
        }
        let in_unit = |name: &str, value: f32| {
            if (0.0..1.0).contains(&value) {
                Ok(())
            } else {
                Err(GraphError::Configuration(format!(
                    "{name}须在[0, 1)区间内，得到{value}"
                )))
            }
        };
        match *self {
            Self::Sgd { .. } => Ok(()),
            Self::Adam {
                beta1,
                beta2,
                epsilon,
                ..
            } => {
                in_unit("beta1", beta1)?;
                in_unit("beta2", beta2)?;
                if epsilon > 0.0 {
                    Ok(())
                } else {
                    Err(GraphError::Configuration(format!(
                        "epsilon须为正数，得到{epsilon}"
                    )))
                }
            }
            Self::Nesterovs { momentum, .. } => in_unit("momentum", momentum),
        }
    }

    /// 创建一个状态为空的更新器
    pub(crate) fn instantiate(&self) -> UpdaterState {
        match *self {
            Self::Sgd { learning_rate } => Sgd::new(learning_rate).into(),
            Self::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Adam::new(learning_rate, beta1, beta2, epsilon).into(),
            Self::Nesterovs {
                learning_rate,
                momentum,
            } => Nesterovs::new(learning_rate, momentum).into(),
        }
    }
}

#[enum_dispatch]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdaterState {
    Sgd,
    Adam,
    Nesterovs,
}

#[enum_dispatch(UpdaterState)]
pub trait Optimizer {
    /// 用梯度`grad`原地更新参数`param`；`key`标识该参数（"层名:参数序号"），
    /// `iteration`为所属网络当前的迭代次数（从0开始）
    fn update(&mut self, key: &str, param: &mut Tensor, grad: &Tensor, iteration: usize);

    fn learning_rate(&self) -> f32;

    /// 清空累积状态（如动量）
    fn reset(&mut self);
}

/// 参数在更新器状态表中的键
pub(crate) fn param_key(layer: &str, param_index: usize) -> String {
    format!("{layer}:{param_index}")
}
