use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use super::{ComputationGraph, GraphError, NodeHandle};
use crate::nn::nodes::{
    CnnLossLayer, ConvolutionLayer, DenseLayer, Input, LocalResponseNormalization, MergeVertex,
    NodeId, NodeType, OutputLayer, ReshapeVertex, SubsamplingLayer, TraitNode,
};
use crate::nn::topology::{LayerConf, NodeConf, VertexConf};
use crate::nn::{NetworkConfig, Topology, WeightInit};

impl ComputationGraph {
    /// 按拓扑构建计算图。
    ///
    /// 每个条目的输入都须是此前已声明的节点或图输入；名字不可重复；层恰好1个输入，
    /// 拼接顶点至少1个输入；形状在构建时逐层推导并校验；图输出不可为空，
    /// 损失层必须是图输出且不能被其它节点消费。任一条不满足即返回`GraphError::Configuration`，
    /// 不会产出半成品。
    pub fn new(name: &str, topology: Topology, config: NetworkConfig) -> Result<Self, GraphError> {
        config.validate()?;
        if topology.inputs().is_empty() {
            return Err(GraphError::Configuration(format!("计算图`{name}`至少需要1个图输入")));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut nodes: Vec<NodeHandle> = Vec::new();
        let mut name_to_id: HashMap<String, NodeId> = HashMap::new();

        let mut register = |node_name: &str, nodes_len: usize| -> Result<NodeId, GraphError> {
            let id = NodeId(nodes_len);
            if name_to_id.insert(node_name.to_string(), id).is_some() {
                return Err(GraphError::Configuration(format!(
                    "计算图`{name}`中存在重名节点`{node_name}`"
                )));
            }
            Ok(id)
        };

        // 1. 图输入
        let mut inputs = Vec::with_capacity(topology.inputs().len());
        for input in topology.inputs() {
            inputs.push(register(&input.name, nodes.len())?);
            nodes.push(NodeHandle {
                name: input.name.clone(),
                inputs: Vec::new(),
                trainable: false,
                requires_grad: false,
                node: Input::new(input.input_type.shape()).into(),
                value: None,
            });
        }

        // 2. 层与顶点（按声明顺序，因此节点序号即拓扑序）
        for entry in topology.entries() {
            let mut input_ids = Vec::with_capacity(entry.inputs.len());
            for input_name in &entry.inputs {
                let id = lookup(&nodes, input_name).ok_or_else(|| {
                    GraphError::Configuration(format!(
                        "`{}`的输入`{input_name}`未在此前声明",
                        entry.name
                    ))
                })?;
                if nodes[id.0].node.is_loss() {
                    return Err(GraphError::Configuration(format!(
                        "损失层`{input_name}`不能作为`{}`的输入",
                        entry.name
                    )));
                }
                input_ids.push(id);
            }

            let expected_arity = match &entry.node {
                NodeConf::Vertex(VertexConf::Merge) => None,
                _ => Some(1),
            };
            let arity_ok = match expected_arity {
                Some(n) => input_ids.len() == n,
                None => !input_ids.is_empty(),
            };
            if !arity_ok {
                return Err(GraphError::Configuration(format!(
                    "`{}`的输入个数不对：需要{}，得到{}",
                    entry.name,
                    expected_arity.map_or_else(|| "至少1个".to_string(), |n| format!("{n}个")),
                    input_ids.len()
                )));
            }

            let input_shapes = input_ids
                .iter()
                .map(|id| nodes[id.0].node.output_shape())
                .collect::<Vec<_>>();
            let node = build_node(&entry.node, &input_shapes, config.weight_init, &mut rng)
                .map_err(|e| match e {
                    GraphError::Configuration(msg) => {
                        GraphError::Configuration(format!("`{}`: {msg}", entry.name))
                    }
                    other => other,
                })?;

            let has_params = !node.params().is_empty();
            let requires_grad = (entry.trainable && has_params)
                || input_ids.iter().any(|id| nodes[id.0].requires_grad);
            register(&entry.name, nodes.len())?;
            nodes.push(NodeHandle {
                name: entry.name.clone(),
                inputs: input_ids,
                trainable: entry.trainable,
                requires_grad,
                node,
                value: None,
            });
        }

        // 3. 图输出
        if topology.outputs().is_empty() {
            return Err(GraphError::Configuration(format!("计算图`{name}`未设置输出")));
        }
        let mut outputs = Vec::with_capacity(topology.outputs().len());
        for output in topology.outputs() {
            let id = lookup(&nodes, output).ok_or_else(|| {
                GraphError::Configuration(format!("图输出`{output}`未声明"))
            })?;
            outputs.push(id);
        }
        if let Some(dangling) = nodes
            .iter()
            .enumerate()
            .find(|(i, h)| h.node.is_loss() && !outputs.contains(&NodeId(*i)))
        {
            return Err(GraphError::Configuration(format!(
                "损失层`{}`必须是图输出",
                dangling.1.name
            )));
        }

        let layers = nodes
            .iter()
            .enumerate()
            .filter(|(_, h)| h.node.is_layer())
            .map(|(i, _)| NodeId(i))
            .collect::<Vec<_>>();
        let updater = config.updater.instantiate();
        let bias_updater = config.bias_updater.as_ref().map(|u| u.instantiate());

        let graph = Self {
            name: name.to_string(),
            topology,
            config,
            nodes,
            name_to_id,
            inputs,
            outputs,
            layers,
            updater,
            bias_updater,
            rng,
            iteration_count: 0,
            epoch_count: 0,
            score: 0.0,
            listeners: Vec::new(),
        };
        debug!(
            graph = %graph.name,
            layers = graph.layers.len(),
            params = graph.num_params(),
            "计算图构建完成\n{}",
            graph.summary()
        );
        Ok(graph)
    }
}

fn lookup(nodes: &[NodeHandle], name: &str) -> Option<NodeId> {
    nodes
        .iter()
        .position(|h| h.name == name)
        .map(NodeId)
}

fn build_node(
    conf: &NodeConf,
    input_shapes: &[&[usize]],
    default_init: WeightInit,
    rng: &mut StdRng,
) -> Result<NodeType, GraphError> {
    Ok(match conf {
        NodeConf::Vertex(VertexConf::Merge) => MergeVertex::new(input_shapes)?.into(),
        NodeConf::Vertex(VertexConf::Reshape { shape }) => {
            ReshapeVertex::new(input_shapes[0], shape)?.into()
        }
        NodeConf::Layer(layer) => {
            let input_shape = input_shapes[0];
            match layer {
                LayerConf::Convolution(c) => {
                    ConvolutionLayer::new(c, input_shape, default_init, rng)?.into()
                }
                LayerConf::Subsampling(c) => SubsamplingLayer::new(c, input_shape)?.into(),
                LayerConf::LocalResponseNormalization(c) => {
                    LocalResponseNormalization::new(c, input_shape)?.into()
                }
                LayerConf::Dense(c) => DenseLayer::new(c, input_shape, default_init, rng)?.into(),
                LayerConf::CnnLoss(c) => CnnLossLayer::new(c, input_shape)?.into(),
                LayerConf::Output(c) => OutputLayer::new(c, input_shape, default_init, rng)?.into(),
            }
        }
    })
}
