/*
 * @Description  : 计算图的声明式拓扑：图输入、按声明顺序排列的具名层/顶点条目（每个条目列出其输入名）、图输出。
 *                 拓扑本身只是数据，可序列化、可复制、可在组装阶段被改写（如替换某条目的输入）；
 *                 名字解析、元数必须一致、形状推导等校验都在`ComputationGraph::new`中完成。
 */

mod layers;

pub use layers::*;
use serde::{Deserialize, Serialize};

use super::GraphError;

/// 图输入的类型（单个样本，不含batch维）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputType {
    Convolutional {
        height: usize,
        width: usize,
        channels: usize,
    },
    FeedForward {
        size: usize,
    },
}

impl InputType {
    pub const fn convolutional(height: usize, width: usize, channels: usize) -> Self {
        Self::Convolutional {
            height,
            width,
            channels,
        }
    }

    /// 单个样本的形状：卷积输入为`[C, H, W]`，全连接输入为`[size]`
    pub fn shape(&self) -> Vec<usize> {
        match *self {
            Self::Convolutional {
                height,
                width,
                channels,
            } => vec![channels, height, width],
            Self::FeedForward { size } => vec![size],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInput {
    pub name: String,
    pub input_type: InputType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeConf {
    Layer(LayerConf),
    Vertex(VertexConf),
}

impl NodeConf {
    pub const fn is_layer(&self) -> bool {
        matches!(self, Self::Layer(_))
    }
}

/// 一个具名节点及其（有序的）输入名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyEntry {
    pub name: String,
    pub node: NodeConf,
    pub inputs: Vec<String>,
    /// false时该层参数不参与优化器更新（冻结）
    pub trainable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    inputs: Vec<GraphInput>,
    entries: Vec<TopologyEntry>,
    outputs: Vec<String>,
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, name: &str, input_type: InputType) -> &mut Self {
        self.inputs.push(GraphInput {
            name: name.to_string(),
            input_type,
        });
        self
    }

    pub fn add_layer(
        &mut self,
        name: &str,
        layer: impl Into<LayerConf>,
        inputs: &[&str],
    ) -> &mut Self {
        self.entries.push(TopologyEntry {
            name: name.to_string(),
            node: NodeConf::Layer(layer.into()),
            inputs: to_strings(inputs),
            trainable: true,
        });
        self
    }

    pub fn add_vertex(&mut self, name: &str, vertex: VertexConf, inputs: &[&str]) -> &mut Self {
        self.entries.push(TopologyEntry {
            name: name.to_string(),
            node: NodeConf::Vertex(vertex),
            inputs: to_strings(inputs),
            trainable: true,
        });
        self
    }

    /// 追加已有的条目（保持其顺序与可训练标记）
    pub fn extend_entries<I: IntoIterator<Item = TopologyEntry>>(&mut self, entries: I) -> &mut Self {
        self.entries.extend(entries);
        self
    }

    pub fn set_outputs(&mut self, outputs: &[&str]) -> &mut Self {
        self.outputs = to_strings(outputs);
        self
    }

    /// 改写某个条目的输入接线
    pub fn set_entry_inputs(&mut self, name: &str, inputs: &[&str]) -> Result<(), GraphError> {
        let entry = self.entry_mut(name)?;
        entry.inputs = to_strings(inputs);
        Ok(())
    }

    pub fn set_trainable(&mut self, name: &str, trainable: bool) -> Result<(), GraphError> {
        self.entry_mut(name)?.trainable = trainable;
        Ok(())
    }

    /// 冻结全部条目
    pub fn freeze_all(&mut self) -> &mut Self {
        self.entries.iter_mut().for_each(|e| e.trainable = false);
        self
    }

    pub fn inputs(&self) -> &[GraphInput] {
        &self.inputs
    }

    pub fn entries(&self) -> &[TopologyEntry] {
        &self.entries
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn entry(&self, name: &str) -> Option<&TopologyEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// 按声明顺序返回所有层（不含顶点）的名字
    pub fn layer_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.node.is_layer())
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn num_layers(&self) -> usize {
        self.entries.iter().filter(|e| e.node.is_layer()).count()
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut TopologyEntry, GraphError> {
        self.entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))
    }
}
