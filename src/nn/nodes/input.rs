use super::{ForwardContext, Gradients, TraitNode, check_input_shape};
use crate::nn::GraphError;
use crate::tensor::Tensor;

/// 图输入节点，值由调用方喂入
#[derive(Debug, Clone)]
pub(crate) struct Input {
    shape: Vec<usize>,
}

impl Input {
    pub(crate) const fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }
}

impl TraitNode for Input {
    fn kind(&self) -> &'static str {
        "Input"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("{:?}", self.shape)
    }

    fn is_layer(&self) -> bool {
        false
    }

    fn forward(&mut self, inputs: &[&Tensor], _ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        let fed = inputs
            .first()
            .ok_or_else(|| GraphError::InvalidOperation("图输入节点未被喂入数据".to_string()))?;
        check_input_shape(self.kind(), fed, &self.shape)?;
        Ok((*fed).clone())
    }

    fn backward(&mut self, _upstream: &Tensor, _: bool, _: bool) -> Result<Gradients, GraphError> {
        Ok(Gradients::default())
    }
}
