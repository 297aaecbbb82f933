/*
 * @Description  : 网络级配置：随机种子、更新器、正则、权重初始化、梯度归一化、工作区/缓存模式等。
 *                 所有字段都有默认值（`#[serde(default)]`），构建计算图时统一校验一次。
 */

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::GraphError;
use super::optimizer::{GradientNormalization, Updater};
use crate::tensor::Tensor;

/// 激活函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Activation {
    Identity,
    #[default]
    LeakyRelu,
    Relu,
    Sigmoid,
    Tanh,
    /// 仅用于2阶`[batch, features]`的输出（按行归一化）
    Softmax,
}

/// 权重初始化方式。`Xavier`为`N(0, 2/(fan_in+fan_out))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum WeightInit {
    #[default]
    Xavier,
    Normal {
        mean: f32,
        std: f32,
    },
    Uniform {
        low: f32,
        high: f32,
    },
    Zero,
}

impl WeightInit {
    pub(crate) fn sample(
        &self,
        shape: &[usize],
        fan_in: usize,
        fan_out: usize,
        rng: &mut StdRng,
    ) -> Tensor {
        match *self {
            Self::Xavier => {
                let std = (2.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                Tensor::normal(0.0, std, shape, rng)
            }
            Self::Normal { mean, std } => Tensor::normal(mean, std, shape, rng),
            Self::Uniform { low, high } => Tensor::uniform(low, high, shape, rng),
            Self::Zero => Tensor::zeros(shape),
        }
    }

    fn validate(&self) -> Result<(), GraphError> {
        match *self {
            Self::Normal { std, .. } if !(std.is_finite() && std >= 0.0) => Err(
                GraphError::Configuration(format!("正态初始化的标准差须为非负有限数，得到{std}")),
            ),
            Self::Uniform { low, high } if !(low <= high) => Err(GraphError::Configuration(
                format!("均匀初始化的区间无效：[{low}, {high}]"),
            )),
            _ => Ok(()),
        }
    }
}

/// 卷积/池化的边界处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConvolutionMode {
    /// 输出尺寸`(H + 2p - k) / s + 1`，除不尽的边缘被截掉
    #[default]
    Truncate,
    /// 输出尺寸`ceil(H / s)`，自动补零（前少后多）
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PoolingType {
    #[default]
    Max,
    Avg,
}

/// 损失层使用的损失函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossFunction {
    /// 逐元素二元交叉熵
    Xent,
    /// 多分类负对数似然（配合softmax）
    NegativeLogLikelihood,
    Mse,
}

/// 是否在每次fit/output后释放中间激活值与梯度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WorkspaceMode {
    #[default]
    Enabled,
    None,
}

/// 释放工作区时是否保留卷积层的补零缓冲区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CacheMode {
    #[default]
    None,
    Host,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub seed: u64,
    pub updater: Updater,
    /// 偏置专用的更新器，`None`时与`updater`相同
    pub bias_updater: Option<Updater>,
    /// 权重（不含偏置）的L2正则系数
    pub l2: f32,
    pub weight_init: WeightInit,
    pub gradient_normalization: GradientNormalization,
    pub gradient_normalization_threshold: f32,
    pub training_workspace_mode: WorkspaceMode,
    pub inference_workspace_mode: WorkspaceMode,
    pub cache_mode: CacheMode,
    /// true时损失与梯度按batch取平均，false时按batch求和
    pub mini_batch: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            updater: Updater::default(),
            bias_updater: None,
            l2: 0.0,
            weight_init: WeightInit::Xavier,
            gradient_normalization: GradientNormalization::None,
            gradient_normalization_threshold: 1.0,
            training_workspace_mode: WorkspaceMode::Enabled,
            inference_workspace_mode: WorkspaceMode::Enabled,
            cache_mode: CacheMode::None,
            mini_batch: true,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), GraphError> {
        self.updater.validate()?;
        if let Some(bias_updater) = &self.bias_updater {
            bias_updater.validate()?;
        }
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return Err(GraphError::Configuration(format!(
                "L2正则系数须为非负有限数，得到{}",
                self.l2
            )));
        }
        if !(self.gradient_normalization_threshold.is_finite()
            && self.gradient_normalization_threshold > 0.0)
        {
            return Err(GraphError::Configuration(format!(
                "梯度归一化阈值须为正数，得到{}",
                self.gradient_normalization_threshold
            )));
        }
        self.weight_init.validate()
    }
}
