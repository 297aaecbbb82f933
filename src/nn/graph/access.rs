use super::{ComputationGraph, GraphError};
use crate::nn::listener::TrainingListener;
use crate::nn::nodes::{NodeId, TraitNode};
use crate::nn::{NetworkConfig, Topology};
use crate::tensor::Tensor;

impl ComputationGraph {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓基本信息↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    pub const fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|id| self.nodes[id.0].name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|id| self.nodes[id.0].name.as_str()).collect()
    }

    /// 节点个数（含图输入与顶点）
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// 参数总个数（标量个数）
    pub fn num_params(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|id| self.nodes[id.0].node.params())
            .map(Tensor::size)
            .sum()
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑基本信息↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓层与参数↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    /// 层数（不含顶点与图输入）
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// 按声明顺序返回所有层名
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|id| self.nodes[id.0].name.as_str()).collect()
    }

    pub fn layer_name(&self, index: usize) -> Result<&str, GraphError> {
        Ok(&self.nodes[self.layer_id(index)?.0].name)
    }

    /// 层名对应的层序号
    pub fn layer_index(&self, name: &str) -> Option<usize> {
        let id = self.name_to_id.get(name)?;
        self.layers.iter().position(|l| l == id)
    }

    /// 层的种类名，如"Convolution"、"Dense"
    pub fn layer_kind(&self, index: usize) -> Result<&'static str, GraphError> {
        Ok(self.nodes[self.layer_id(index)?.0].node.kind())
    }

    pub fn layer_params(&self, index: usize) -> Result<&[Tensor], GraphError> {
        Ok(self.nodes[self.layer_id(index)?.0].node.params())
    }

    /// 覆盖某层的全部参数；个数与每个参数的形状都须与现有参数一致
    pub fn set_layer_params(&mut self, index: usize, params: &[Tensor]) -> Result<(), GraphError> {
        let id = self.layer_id(index)?;
        let handle = &mut self.nodes[id.0];
        let current = handle.node.params_mut();
        if current.len() != params.len() {
            return Err(GraphError::ShapeMismatch {
                expected: vec![current.len()],
                got: vec![params.len()],
                message: format!("层`{}`的参数个数不一致", handle.name),
            });
        }
        for (dst, src) in current.iter().zip(params) {
            if !dst.is_same_shape(src) {
                return Err(GraphError::ShapeMismatch {
                    expected: dst.shape().to_vec(),
                    got: src.shape().to_vec(),
                    message: format!("层`{}`的参数形状不一致", handle.name),
                });
            }
        }
        current.clone_from_slice(params);
        Ok(())
    }

    pub fn is_layer_trainable(&self, index: usize) -> Result<bool, GraphError> {
        Ok(self.nodes[self.layer_id(index)?.0].trainable)
    }

    /// 冻结/解冻某层。冻结的层仍参与前向与梯度回传，但优化器不更新其参数
    pub fn set_layer_trainable(&mut self, index: usize, trainable: bool) -> Result<(), GraphError> {
        let id = self.layer_id(index)?;
        self.nodes[id.0].trainable = trainable;
        let name = self.nodes[id.0].name.clone();
        self.topology.set_trainable(&name, trainable)?;
        self.refresh_requires_grad();
        Ok(())
    }

    fn layer_id(&self, index: usize) -> Result<NodeId, GraphError> {
        self.layers.get(index).copied().ok_or_else(|| {
            GraphError::NodeNotFound(format!(
                "层序号{index}越界（计算图`{}`共{}层）",
                self.name,
                self.layers.len()
            ))
        })
    }

    pub(super) fn refresh_requires_grad(&mut self) {
        for i in 0..self.nodes.len() {
            let handle = &self.nodes[i];
            let own = handle.trainable && !handle.node.params().is_empty();
            let upstream = handle.inputs.iter().any(|id| self.nodes[id.0].requires_grad);
            self.nodes[i].requires_grad = own || upstream;
        }
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑层与参数↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓训练状态↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub const fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    pub const fn epoch_count(&self) -> usize {
        self.epoch_count
    }

    pub fn increment_epoch(&mut self) {
        self.epoch_count += 1;
        for listener in &mut self.listeners {
            listener.on_epoch_end(&self.name, self.epoch_count);
        }
    }

    /// 最近一次`fit`的损失
    pub const fn score(&self) -> f32 {
        self.score
    }

    pub fn set_listeners(&mut self, listeners: Vec<Box<dyn TrainingListener>>) {
        self.listeners = listeners;
    }

    pub fn take_listeners(&mut self) -> Vec<Box<dyn TrainingListener>> {
        std::mem::take(&mut self.listeners)
    }

    pub fn add_listener(&mut self, listener: Box<dyn TrainingListener>) {
        self.listeners.push(listener);
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑训练状态↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}
