/*
 * @Description  : 神经网络模块：以层为粒度的计算图（构建、前向、反向、更新、持久化）
 *                 以及其拓扑声明、更新器、训练监听器与评估工具
 */

mod config;
mod evaluation;
mod graph;
mod listener;
mod nodes;
mod optimizer;
mod topology;

pub use config::{
    Activation, CacheMode, ConvolutionMode, LossFunction, NetworkConfig, PoolingType, WeightInit,
    WorkspaceMode,
};
pub use evaluation::Evaluation;
pub use graph::{ComputationGraph, GraphDescriptor, GraphError, NodeDescriptor};
pub use listener::{PerformanceListener, ScoreIterationListener, TrainingListener};
pub use nodes::NodeId;
pub use optimizer::{
    Adam, GradientNormalization, Nesterovs, Optimizer, Sgd, Updater, UpdaterState,
};
pub use topology::{
    CnnLossConf, ConvolutionConf, DenseConf, GraphInput, InputType, LayerConf, LrnConf, NodeConf,
    OutputConf, SubsamplingConf, Topology, TopologyEntry, VertexConf,
};

#[cfg(test)]
mod tests;
