/*
 * @Description  : 计算图：由`Topology`构建，按声明顺序执行前向、逆序执行反向，
 *                 持有各层参数、更新器状态、随机源、迭代/轮次计数与训练监听器。
 *
 * 实现按职责拆分到子模块：
 * - builder.rs：校验拓扑并构建节点
 * - access.rs：层与参数的访问、可训练标记、计数器
 * - forward.rs：前向传播与推理输出
 * - fit.rs：反向传播与参数更新
 * - serialization.rs：模型文件的保存/加载
 * - describe.rs：描述符与摘要
 */

mod access;
mod builder;
mod describe;
mod error;
mod fit;
mod forward;
mod serialization;

use std::collections::HashMap;
use std::fmt;

pub use describe::{GraphDescriptor, NodeDescriptor};
pub use error::GraphError;
use rand::rngs::StdRng;

use super::listener::TrainingListener;
use super::nodes::{NodeId, NodeType};
use super::optimizer::UpdaterState;
use super::{NetworkConfig, Topology};
use crate::tensor::Tensor;

/// 图中的一个节点及其接线信息
#[derive(Debug, Clone)]
pub(crate) struct NodeHandle {
    name: String,
    inputs: Vec<NodeId>,
    trainable: bool,
    /// 反向传播是否需要经过本节点（本节点或其上游含可训练参数）
    requires_grad: bool,
    node: NodeType,
    value: Option<Tensor>,
}

pub struct ComputationGraph {
    name: String,
    topology: Topology,
    config: NetworkConfig,
    nodes: Vec<NodeHandle>,
    name_to_id: HashMap<String, NodeId>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    /// 所有层（不含顶点与图输入），按声明顺序
    layers: Vec<NodeId>,
    updater: UpdaterState,
    bias_updater: Option<UpdaterState>,
    rng: StdRng,
    iteration_count: usize,
    epoch_count: usize,
    score: f32,
    listeners: Vec<Box<dyn TrainingListener>>,
}

impl fmt::Debug for ComputationGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationGraph")
            .field("name", &self.name)
            .field("layers", &self.layers.len())
            .field("nodes", &self.nodes.len())
            .field("iteration_count", &self.iteration_count)
            .field("epoch_count", &self.epoch_count)
            .finish_non_exhaustive()
    }
}
