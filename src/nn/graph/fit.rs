/*
 * @Description  : 一次训练迭代：前向（训练模式）→ 损失层求梯度 → 逆序反向传播 → 逐层更新参数
 *
 * 参数更新的顺序：梯度归一化 → 权重（不含偏置）加上L2项 → 更新器（偏置可用单独的更新器）。
 * 冻结（trainable = false）的层照常回传梯度，但不计算也不更新自身参数。
 */

use tracing::trace;

use super::{ComputationGraph, GraphError};
use crate::data::MultiDataSet;
use crate::nn::WorkspaceMode;
use crate::nn::nodes::{Gradients, TraitNode};
use crate::nn::optimizer::{Optimizer, param_key};
use crate::tensor::Tensor;

/// 参数约定为`[权重, 偏置]`
const BIAS_INDEX: usize = 1;

impl ComputationGraph {
    /// 用一组（多输入、多输出的）数据训练一次，返回本次的损失
    pub fn fit(&mut self, data: &MultiDataSet) -> Result<f32, GraphError> {
        let features = data.features().iter().collect::<Vec<_>>();
        let labels = data.labels().iter().collect::<Vec<_>>();
        self.fit_tensors(&features, &labels)
    }

    pub fn fit_tensors(&mut self, features: &[&Tensor], labels: &[&Tensor]) -> Result<f32, GraphError> {
        if labels.len() != self.outputs.len() {
            return Err(GraphError::InvalidOperation(format!(
                "计算图`{}`有{}个输出，但给了{}个标签",
                self.name,
                self.outputs.len(),
                labels.len()
            )));
        }
        let result = self
            .forward_pass(features, true)
            .and_then(|()| self.backward_and_update(labels));
        if self.config.training_workspace_mode == WorkspaceMode::Enabled {
            self.release_workspace();
        }
        let score = result?;

        self.score = score;
        self.iteration_count += 1;
        trace!(graph = %self.name, iteration = self.iteration_count, score, "fit完成");
        for listener in &mut self.listeners {
            listener.iteration_done(&self.name, self.iteration_count, self.epoch_count, score);
        }
        Ok(score)
    }

    fn backward_and_update(&mut self, labels: &[&Tensor]) -> Result<f32, GraphError> {
        let n = self.nodes.len();
        let mini_batch = self.config.mini_batch;
        let mut upstream: Vec<Option<Tensor>> = vec![None; n];
        let mut param_grads: Vec<Option<Vec<Tensor>>> = vec![None; n];
        let mut score = 0.0;

        // 1. 损失层
        for (k, id) in self.outputs.clone().into_iter().enumerate() {
            let (need_params, need_inputs) = self.grad_needs(id.0);
            let handle = &mut self.nodes[id.0];
            if !handle.node.is_loss() {
                return Err(GraphError::InvalidOperation(format!(
                    "图输出`{}`不是损失层，无法训练",
                    handle.name
                )));
            }
            let (s, grads) = handle.node.loss(labels[k], mini_batch, need_params, need_inputs)?;
            score += s;
            self.scatter(id.0, grads, &mut upstream, &mut param_grads);
        }

        // 2. 逆序反向传播
        for i in (0..n).rev() {
            let Some(g) = upstream[i].take() else {
                continue;
            };
            if self.nodes[i].node.is_loss() || self.nodes[i].inputs.is_empty() {
                continue;
            }
            let (need_params, need_inputs) = self.grad_needs(i);
            if !need_params && !need_inputs {
                continue;
            }
            let grads = self.nodes[i].node.backward(&g, need_params, need_inputs)?;
            self.scatter(i, grads, &mut upstream, &mut param_grads);
        }

        // 3. 更新参数
        let l2 = self.config.l2;
        let normalization = self.config.gradient_normalization;
        let threshold = self.config.gradient_normalization_threshold;
        let iteration = self.iteration_count;
        for id in self.layers.clone() {
            let Some(mut grads) = param_grads[id.0].take() else {
                continue;
            };
            let handle = &mut self.nodes[id.0];
            normalization.apply(&mut grads, threshold);
            let params = handle.node.params_mut();
            if l2 > 0.0 {
                if let (Some(g), Some(w)) = (grads.first_mut(), params.first()) {
                    *g += &(w * l2);
                }
                score += 0.5 * l2 * params.first().map_or(0.0, Tensor::square_sum);
            }
            for (index, (param, grad)) in params.iter_mut().zip(&grads).enumerate() {
                let key = param_key(&handle.name, index);
                let updater = match (&mut self.bias_updater, index) {
                    (Some(bias_updater), BIAS_INDEX) => bias_updater,
                    _ => &mut self.updater,
                };
                updater.update(&key, param, grad, iteration);
            }
        }
        Ok(score)
    }

    /// (是否需要参数梯度, 是否需要输入梯度)
    fn grad_needs(&self, index: usize) -> (bool, bool) {
        let handle = &self.nodes[index];
        let need_params = handle.trainable && !handle.node.params().is_empty();
        let need_inputs = handle.inputs.iter().any(|id| self.nodes[id.0].requires_grad);
        (need_params, need_inputs)
    }

    /// 把节点`index`的梯度分发给其输入（累加）并记录参数梯度
    fn scatter(
        &self,
        index: usize,
        grads: Gradients,
        upstream: &mut [Option<Tensor>],
        param_grads: &mut [Option<Vec<Tensor>>],
    ) {
        if !grads.params.is_empty() {
            param_grads[index] = Some(grads.params);
        }
        for (id, g) in self.nodes[index].inputs.iter().zip(grads.inputs) {
            if !self.nodes[id.0].requires_grad {
                continue;
            }
            match &mut upstream[id.0] {
                Some(acc) => *acc += &g,
                slot @ None => *slot = Some(g),
            }
        }
    }
}
