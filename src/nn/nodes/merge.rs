use super::{ForwardContext, Gradients, TraitNode};
use crate::nn::GraphError;
use crate::tensor::Tensor;

/// 沿通道轴拼接全部输入：`[C1, H, W] + [C2, H, W] -> [C1 + C2, H, W]`
#[derive(Debug, Clone)]
pub(crate) struct MergeVertex {
    channels: Vec<usize>,
    shape: Vec<usize>,
}

impl MergeVertex {
    pub(crate) fn new(input_shapes: &[&[usize]]) -> Result<Self, GraphError> {
        let first = input_shapes
            .first()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GraphError::Configuration("Merge顶点至少需要1个非标量输入".to_string()))?;
        for shape in &input_shapes[1..] {
            if shape.len() != first.len() || shape[1..] != first[1..] {
                return Err(GraphError::Configuration(format!(
                    "Merge顶点的输入除通道外须同形，得到{first:?}与{shape:?}"
                )));
            }
        }
        let channels = input_shapes.iter().map(|s| s[0]).collect::<Vec<_>>();
        let mut shape = first.to_vec();
        shape[0] = channels.iter().sum();
        Ok(Self { channels, shape })
    }
}

impl TraitNode for MergeVertex {
    fn kind(&self) -> &'static str {
        "Merge"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("channels {:?}", self.channels)
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn forward(&mut self, inputs: &[&Tensor], _ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        Ok(Tensor::concat_channels(inputs)?)
    }

    fn backward(
        &mut self,
        upstream: &Tensor,
        _need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<Gradients, GraphError> {
        let inputs = if need_input_grads {
            upstream.split_channels(&self.channels)?
        } else {
            Vec::new()
        };
        Ok(Gradients {
            inputs,
            params: Vec::new(),
        })
    }
}
