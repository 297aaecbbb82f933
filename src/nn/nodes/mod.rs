/*
 * @Description  : 计算图中的节点：图输入、无参数顶点（拼接/重塑）以及各种层。
 *                 节点粒度为"层"，每个节点自行缓存前向所需的中间结果并实现自己的反向传播。
 *
 * 形状约定：
 * - 节点声明的`output_shape`是单个样本的形状（不含batch维），如卷积层为`[C, H, W]`；
 * - 运行时的张量带batch维，如`[batch, C, H, W]`、`[batch, features]`。
 */

mod activation;
mod convolution;
mod dense;
mod input;
mod loss;
mod lrn;
mod merge;
mod reshape;
mod subsampling;

pub(crate) use convolution::ConvolutionLayer;
pub(crate) use dense::DenseLayer;
use enum_dispatch::enum_dispatch;
pub(crate) use input::Input;
pub(crate) use loss::{CnnLossLayer, OutputLayer};
pub(crate) use lrn::LocalResponseNormalization;
pub(crate) use merge::MergeVertex;
use rand::rngs::StdRng;
pub(crate) use reshape::ReshapeVertex;
use serde::{Deserialize, Serialize};
pub(crate) use subsampling::SubsamplingLayer;

use super::GraphError;
use crate::tensor::Tensor;

/// 节点在所属计算图中的序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// 前向传播时各节点共享的运行环境
pub(crate) struct ForwardContext<'a> {
    pub training: bool,
    /// 图持有的随机源（dropout用）
    pub rng: &'a mut StdRng,
}

/// 一个节点反向传播的结果
#[derive(Debug, Default)]
pub(crate) struct Gradients {
    /// 对每个输入的梯度（顺序同输入），不需要时为空
    pub inputs: Vec<Tensor>,
    /// 对每个参数的梯度（顺序同`params`），不需要时为空
    pub params: Vec<Tensor>,
}

#[enum_dispatch]
#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Input,
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓顶点↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    MergeVertex,
    ReshapeVertex,
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑顶点↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    ConvolutionLayer,
    LocalResponseNormalization,
    SubsamplingLayer,
    DenseLayer,
    CnnLossLayer,
    OutputLayer,
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}

#[enum_dispatch(NodeType)]
pub(crate) trait TraitNode {
    /// 节点类型名，如"Convolution"
    fn kind(&self) -> &'static str;

    /// 单个样本的输出形状
    fn output_shape(&self) -> &[usize];

    /// 配置摘要（用于summary与描述符）
    fn describe(&self) -> String;

    /// 是否为"层"（顶点与图输入不计入层数）
    fn is_layer(&self) -> bool {
        true
    }

    /// 是否为损失层（只能作为图输出）
    fn is_loss(&self) -> bool {
        false
    }

    /// 参数列表，有参数的层约定为`[权重, 偏置]`
    fn params(&self) -> &[Tensor] {
        &[]
    }

    fn params_mut(&mut self) -> &mut [Tensor] {
        Default::default()
    }

    /// 根据输入计算本节点的值，并缓存反向传播所需的中间结果
    fn forward(
        &mut self,
        inputs: &[&Tensor],
        ctx: &mut ForwardContext<'_>,
    ) -> Result<Tensor, GraphError>;

    /// 已知损失对本节点输出的梯度`upstream`，计算对输入及参数的梯度
    fn backward(
        &mut self,
        upstream: &Tensor,
        need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<Gradients, GraphError>;

    /// 损失层：根据标签计算损失值，以及对输入（和参数）的梯度
    fn loss(
        &mut self,
        _labels: &Tensor,
        _mini_batch: bool,
        _need_param_grads: bool,
        _need_input_grads: bool,
    ) -> Result<(f32, Gradients), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}节点不是损失层，无法计算损失",
            self.kind()
        )))
    }

    /// 释放前向缓存；`keep_cache`为true时保留可复用的缓冲区
    fn release(&mut self, _keep_cache: bool) {}
}

/// 前向缓存缺失时的统一错误
pub(crate) fn missing_forward(kind: &str) -> GraphError {
    GraphError::ComputationError(format!("{kind}层在反向传播前未执行前向传播"))
}

/// 检查运行时输入（带batch维）与声明形状是否一致
pub(crate) fn check_input_shape(
    kind: &str,
    input: &Tensor,
    expected: &[usize],
) -> Result<(), GraphError> {
    if input.dimension() == expected.len() + 1 && &input.shape()[1..] == expected {
        Ok(())
    } else {
        Err(GraphError::ShapeMismatch {
            expected: expected.to_vec(),
            got: input.shape().to_vec(),
            message: format!("{kind}层的输入形状（不含batch维）与声明不一致"),
        })
    }
}

/// 卷积/池化在一个空间维上的输出尺寸及前后补零量
pub(crate) fn output_extent(
    input: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    mode: crate::nn::ConvolutionMode,
) -> Option<(usize, usize, usize)> {
    if kernel == 0 || stride == 0 || input == 0 {
        return None;
    }
    match mode {
        crate::nn::ConvolutionMode::Truncate => {
            let padded = input + 2 * padding;
            (padded >= kernel).then(|| ((padded - kernel) / stride + 1, padding, padding))
        }
        crate::nn::ConvolutionMode::Same => {
            let out = input.div_ceil(stride);
            let total = ((out - 1) * stride + kernel).saturating_sub(input);
            Some((out, total / 2, total - total / 2))
        }
    }
}
