use super::{ComputationGraph, GraphError};
use crate::nn::nodes::{ForwardContext, TraitNode};
use crate::nn::{CacheMode, WorkspaceMode};
use crate::tensor::Tensor;

impl ComputationGraph {
    /// 推理：按图输入的声明顺序喂入数据，返回各图输出的值（顺序同输出声明）。
    /// 推理模式下不做dropout；工作区开启时结束后释放中间结果。
    pub fn output(&mut self, features: &[&Tensor]) -> Result<Vec<Tensor>, GraphError> {
        let result = self.forward_pass(features, false).map(|()| self.collect_outputs());
        if self.config.inference_workspace_mode == WorkspaceMode::Enabled {
            self.release_workspace();
        }
        result?
    }

    /// 单输出的便捷版本，返回第一个图输出
    pub fn output_single(&mut self, features: &[&Tensor]) -> Result<Tensor, GraphError> {
        self.output(features)?
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::InvalidOperation("计算图没有输出".to_string()))
    }

    /// 从头到尾计算所有节点的值
    pub(super) fn forward_pass(&mut self, features: &[&Tensor], training: bool) -> Result<(), GraphError> {
        if features.len() != self.inputs.len() {
            return Err(GraphError::InvalidOperation(format!(
                "计算图`{}`需要{}个输入，得到{}个",
                self.name,
                self.inputs.len(),
                features.len()
            )));
        }
        let mut ctx = ForwardContext {
            training,
            rng: &mut self.rng,
        };
        for i in 0..self.nodes.len() {
            let (done, rest) = self.nodes.split_at_mut(i);
            let handle = &mut rest[0];
            // 冻结的层按推理模式计算（不做dropout）
            ctx.training = training && handle.trainable;
            let value = if let Some(k) = self.inputs.iter().position(|id| id.0 == i) {
                handle.node.forward(&[features[k]], &mut ctx)?
            } else {
                let inputs = handle
                    .inputs
                    .iter()
                    .map(|id| {
                        done[id.0].value.as_ref().ok_or_else(|| {
                            GraphError::ComputationError(format!(
                                "`{}`的输入`{}`没有值",
                                handle.name, done[id.0].name
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                handle.node.forward(&inputs, &mut ctx)?
            };
            handle.value = Some(value);
        }
        Ok(())
    }

    fn collect_outputs(&self) -> Result<Vec<Tensor>, GraphError> {
        self.outputs
            .iter()
            .map(|id| {
                self.nodes[id.0].value.clone().ok_or_else(|| {
                    GraphError::ComputationError(format!("图输出`{}`没有值", self.nodes[id.0].name))
                })
            })
            .collect()
    }

    /// 释放所有节点的值与前向缓存
    pub(super) fn release_workspace(&mut self) {
        let keep_cache = self.config.cache_mode == CacheMode::Host;
        for handle in &mut self.nodes {
            handle.value = None;
            handle.node.release(keep_cache);
        }
    }
}
