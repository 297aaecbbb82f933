use super::{ForwardContext, Gradients, TraitNode};
use crate::nn::GraphError;
use crate::tensor::Tensor;

/// 按行优先顺序重新解释单个样本的形状
#[derive(Debug, Clone)]
pub(crate) struct ReshapeVertex {
    input_shape: Vec<usize>,
    shape: Vec<usize>,
}

impl ReshapeVertex {
    pub(crate) fn new(input_shape: &[usize], shape: &[usize]) -> Result<Self, GraphError> {
        let (from, to) = (
            input_shape.iter().product::<usize>(),
            shape.iter().product::<usize>(),
        );
        if from != to || shape.is_empty() {
            return Err(GraphError::Configuration(format!(
                "Reshape顶点无法把{input_shape:?}（{from}个元素）重塑为{shape:?}（{to}个元素）"
            )));
        }
        Ok(Self {
            input_shape: input_shape.to_vec(),
            shape: shape.to_vec(),
        })
    }
}

fn with_batch(batch: usize, shape: &[usize]) -> Vec<usize> {
    std::iter::once(batch).chain(shape.iter().copied()).collect()
}

impl TraitNode for ReshapeVertex {
    fn kind(&self) -> &'static str {
        "Reshape"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("{:?} -> {:?}", self.input_shape, self.shape)
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn forward(&mut self, inputs: &[&Tensor], _ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        let input = inputs[0];
        Ok(input.reshape(&with_batch(input.batch_size(), &self.shape))?)
    }

    fn backward(
        &mut self,
        upstream: &Tensor,
        _need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<Gradients, GraphError> {
        let inputs = if need_input_grads {
            vec![upstream.reshape(&with_batch(upstream.batch_size(), &self.input_shape))?]
        } else {
            Vec::new()
        };
        Ok(Gradients {
            inputs,
            params: Vec::new(),
        })
    }
}
