use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Optimizer;
use crate::tensor::Tensor;

/// Adam: Adaptive Moment Estimation
/// - m = β1 * m + (1 - β1) * g
/// - v = β2 * v + (1 - β2) * g²
/// - `α_t` = α * √(1 - β2^t) / (1 - β1^t)
/// - θ = θ - `α_t` * m / (√v + ε)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// 一阶矩估计
    m: BTreeMap<String, Tensor>,
    /// 二阶矩估计
    v: BTreeMap<String, Tensor>,
}

impl Adam {
    pub const fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: BTreeMap::new(),
            v: BTreeMap::new(),
        }
    }
}

impl Optimizer for Adam {
    fn update(&mut self, key: &str, param: &mut Tensor, grad: &Tensor, iteration: usize) {
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let m = self
            .m
            .entry(key.to_string())
            .or_insert_with(|| Tensor::zeros(grad.shape()));
        *m = &*m * beta1 + grad * (1.0 - beta1);
        let v = self
            .v
            .entry(key.to_string())
            .or_insert_with(|| Tensor::zeros(grad.shape()));
        *v = &*v * beta2 + grad.map(|g| g * g) * (1.0 - beta2);

        let t = (iteration + 1) as i32;
        let alpha_t = self.learning_rate * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t));
        let step = m.zip_map(v, |m, v| alpha_t * m / (v.sqrt() + epsilon));
        *param -= &step;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
    }
}
