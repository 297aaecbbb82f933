/*
 * @Description  : 各类层/顶点的声明式配置。每个配置都可用链式方法逐项设置，
 *                 未设置的项取默认值；形状相关的合法性在构建计算图时统一校验。
 */

use serde::{Deserialize, Serialize};

use crate::nn::{Activation, ConvolutionMode, LossFunction, PoolingType, WeightInit};

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓卷积层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvolutionConf {
    pub n_out: usize,
    /// (kH, kW)
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
    /// 仅`Truncate`模式下生效的显式补零 (pH, pW)
    pub padding: (usize, usize),
    pub mode: ConvolutionMode,
    pub activation: Activation,
    /// `None`时使用网络级的权重初始化
    pub weight_init: Option<WeightInit>,
    pub bias_init: f32,
}

impl ConvolutionConf {
    pub fn new(n_out: usize, kernel: (usize, usize)) -> Self {
        Self {
            n_out,
            kernel,
            stride: (1, 1),
            padding: (0, 0),
            mode: ConvolutionMode::Truncate,
            activation: Activation::LeakyRelu,
            weight_init: None,
            bias_init: 0.0,
        }
    }

    pub const fn stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    pub const fn padding(mut self, padding: (usize, usize)) -> Self {
        self.padding = padding;
        self
    }

    pub const fn mode(mut self, mode: ConvolutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub const fn weight_init(mut self, weight_init: WeightInit) -> Self {
        self.weight_init = Some(weight_init);
        self
    }

    pub const fn bias_init(mut self, bias_init: f32) -> Self {
        self.bias_init = bias_init;
        self
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑卷积层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓池化（下采样）层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsamplingConf {
    pub pooling: PoolingType,
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
    pub padding: (usize, usize),
    pub mode: ConvolutionMode,
}

impl SubsamplingConf {
    pub const fn new(pooling: PoolingType, kernel: (usize, usize), stride: (usize, usize)) -> Self {
        Self {
            pooling,
            kernel,
            stride,
            padding: (0, 0),
            mode: ConvolutionMode::Truncate,
        }
    }

    pub const fn padding(mut self, padding: (usize, usize)) -> Self {
        self.padding = padding;
        self
    }

    pub const fn mode(mut self, mode: ConvolutionMode) -> Self {
        self.mode = mode;
        self
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑池化（下采样）层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// 局部响应归一化：b_c = a_c / (k + α·Σ a_j²)^β，j取c附近的n个通道
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LrnConf {
    pub k: f32,
    pub n: usize,
    pub alpha: f32,
    pub beta: f32,
}

impl Default for LrnConf {
    fn default() -> Self {
        Self {
            k: 2.0,
            n: 5,
            alpha: 1e-4,
            beta: 0.75,
        }
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓全连接层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseConf {
    pub n_out: usize,
    pub activation: Activation,
    pub weight_init: Option<WeightInit>,
    pub bias_init: f32,
    /// 输入的保留概率（inverted dropout），仅训练时生效；`None`表示不做dropout
    pub dropout: Option<f32>,
}

impl DenseConf {
    pub const fn new(n_out: usize) -> Self {
        Self {
            n_out,
            activation: Activation::LeakyRelu,
            weight_init: None,
            bias_init: 0.0,
            dropout: None,
        }
    }

    pub const fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub const fn weight_init(mut self, weight_init: WeightInit) -> Self {
        self.weight_init = Some(weight_init);
        self
    }

    pub const fn bias_init(mut self, bias_init: f32) -> Self {
        self.bias_init = bias_init;
        self
    }

    pub const fn dropout(mut self, retain_probability: f32) -> Self {
        self.dropout = Some(retain_probability);
        self
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑全连接层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓损失层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 逐像素损失层：对`[C, H, W]`的每个元素施加激活后计算损失，无参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnnLossConf {
    pub activation: Activation,
    pub loss: LossFunction,
}

impl CnnLossConf {
    pub const fn new(loss: LossFunction) -> Self {
        Self {
            activation: Activation::Sigmoid,
            loss,
        }
    }

    pub const fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }
}

/// 带全连接参数的输出层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConf {
    pub n_out: usize,
    pub activation: Activation,
    pub loss: LossFunction,
    pub weight_init: Option<WeightInit>,
    pub bias_init: f32,
}

impl OutputConf {
    pub const fn new(n_out: usize, loss: LossFunction) -> Self {
        Self {
            n_out,
            activation: Activation::Softmax,
            loss,
            weight_init: None,
            bias_init: 0.0,
        }
    }

    pub const fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub const fn weight_init(mut self, weight_init: WeightInit) -> Self {
        self.weight_init = Some(weight_init);
        self
    }

    pub const fn bias_init(mut self, bias_init: f32) -> Self {
        self.bias_init = bias_init;
        self
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑损失层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// 带参数或损失的层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerConf {
    Convolution(ConvolutionConf),
    Subsampling(SubsamplingConf),
    LocalResponseNormalization(LrnConf),
    Dense(DenseConf),
    CnnLoss(CnnLossConf),
    Output(OutputConf),
}

macro_rules! impl_into_layer_conf {
    ($($conf:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$conf> for LayerConf {
                fn from(conf: $conf) -> Self {
                    Self::$variant(conf)
                }
            }
        )*
    };
}

impl_into_layer_conf!(
    ConvolutionConf => Convolution,
    SubsamplingConf => Subsampling,
    LrnConf => LocalResponseNormalization,
    DenseConf => Dense,
    CnnLossConf => CnnLoss,
    OutputConf => Output,
);

/// 无参数的图顶点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexConf {
    /// 沿通道轴拼接全部输入
    Merge,
    /// 把单个样本重塑为`shape`（不含batch维），元素个数须不变
    Reshape { shape: Vec<usize> },
}
