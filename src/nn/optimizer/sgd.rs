use serde::{Deserialize, Serialize};

use super::Optimizer;
use crate::tensor::Tensor;

/// 随机梯度下降：θ = θ - α * ∇θ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    learning_rate: f32,
}

impl Sgd {
    pub const fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, _key: &str, param: &mut Tensor, grad: &Tensor, _iteration: usize) {
        *param -= &(grad * self.learning_rate);
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn reset(&mut self) {
        // SGD 无状态
    }
}
