use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Optimizer;
use crate::tensor::Tensor;

/// Nesterov动量：
/// - `v_prev` = v
/// - v = μ * v - α * g
/// - θ = θ - μ * `v_prev` + (1 + μ) * v
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nesterovs {
    learning_rate: f32,
    momentum: f32,
    velocity: BTreeMap<String, Tensor>,
}

impl Nesterovs {
    pub const fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: BTreeMap::new(),
        }
    }
}

impl Optimizer for Nesterovs {
    fn update(&mut self, key: &str, param: &mut Tensor, grad: &Tensor, _iteration: usize) {
        let (lr, mu) = (self.learning_rate, self.momentum);
        let v = self
            .velocity
            .entry(key.to_string())
            .or_insert_with(|| Tensor::zeros(grad.shape()));
        let v_prev = v.clone();
        *v = &*v * mu - grad * lr;
        *param += &(v_prev * (-mu) + &*v * (1.0 + mu));
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn reset(&mut self) {
        self.velocity.clear();
    }
}
