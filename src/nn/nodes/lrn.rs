/*
 * @Description  : 局部响应归一化（跨通道）
 *
 * 前向：s_c = k + α·Σ_{j∈N(c)} a_j²，b_c = a_c · s_c^(-β)
 * 反向：dL/da_i = g_i·s_i^(-β) - 2αβ·a_i·Σ_{c∈N(i)} g_c·a_c·s_c^(-β-1)
 * 其中N(c)为以c为中心、宽n的通道窗口（越界部分忽略），邻域关系对称。
 */

use rayon::prelude::*;

use super::{ForwardContext, Gradients, TraitNode, check_input_shape, missing_forward};
use crate::nn::GraphError;
use crate::nn::topology::LrnConf;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub(crate) struct LocalResponseNormalization {
    conf: LrnConf,
    shape: Vec<usize>,
    input: Option<Tensor>,
    /// 每个位置的s_c
    scale: Vec<f32>,
}

impl LocalResponseNormalization {
    pub(crate) fn new(conf: &LrnConf, input_shape: &[usize]) -> Result<Self, GraphError> {
        if input_shape.len() != 3 {
            return Err(GraphError::Configuration(format!(
                "局部响应归一化层的输入须为[C, H, W]，得到{input_shape:?}"
            )));
        }
        if conf.n == 0 || conf.k <= 0.0 {
            return Err(GraphError::Configuration(format!(
                "局部响应归一化的参数无效：n={}，k={}",
                conf.n, conf.k
            )));
        }
        Ok(Self {
            conf: conf.clone(),
            shape: input_shape.to_vec(),
            input: None,
            scale: Vec::new(),
        })
    }

    fn neighbours(&self, c: usize) -> std::ops::Range<usize> {
        let half = self.conf.n / 2;
        c.saturating_sub(half)..(c + half + 1).min(self.shape[0])
    }
}

impl TraitNode for LocalResponseNormalization {
    fn kind(&self) -> &'static str {
        "LocalResponseNormalization"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        format!(
            "k={} n={} alpha={} beta={}",
            self.conf.k, self.conf.n, self.conf.alpha, self.conf.beta
        )
    }

    fn forward(&mut self, inputs: &[&Tensor], _ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        let input = inputs[0];
        check_input_shape(self.kind(), input, &self.shape)?;
        let (c, plane) = (self.shape[0], self.shape[1] * self.shape[2]);
        let data = input.standard_slice();
        let (k, alpha, beta) = (self.conf.k, self.conf.alpha, self.conf.beta);
        let windows = (0..c).map(|ci| self.neighbours(ci)).collect::<Vec<_>>();

        let mut scale = vec![0.0f32; data.len()];
        let mut out = vec![0.0f32; data.len()];
        scale
            .par_chunks_mut(c * plane)
            .zip(out.par_chunks_mut(c * plane))
            .zip(data.par_chunks(c * plane))
            .for_each(|((s, o), a)| {
                for (ci, window) in windows.iter().enumerate() {
                    for p in 0..plane {
                        let sum: f32 = window.clone().map(|j| a[j * plane + p].powi(2)).sum();
                        let idx = ci * plane + p;
                        s[idx] = k + alpha * sum;
                        o[idx] = a[idx] * s[idx].powf(-beta);
                    }
                }
            });
        self.scale = scale;
        self.input = Some(input.clone());
        Ok(Tensor::from_vec_exact(out, input.shape()))
    }

    fn backward(
        &mut self,
        upstream: &Tensor,
        _need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<Gradients, GraphError> {
        let input = self.input.as_ref().ok_or_else(|| missing_forward(self.kind()))?;
        if !need_input_grads {
            return Ok(Gradients::default());
        }
        let (c, plane) = (self.shape[0], self.shape[1] * self.shape[2]);
        let (alpha, beta) = (self.conf.alpha, self.conf.beta);
        let a_all = input.standard_slice();
        let g_all = upstream.standard_slice();
        let windows = (0..c).map(|ci| self.neighbours(ci)).collect::<Vec<_>>();

        let mut dx = vec![0.0f32; a_all.len()];
        dx.par_chunks_mut(c * plane)
            .zip(a_all.par_chunks(c * plane))
            .zip(g_all.par_chunks(c * plane))
            .zip(self.scale.par_chunks(c * plane))
            .for_each(|(((d, a), g), s)| {
                for p in 0..plane {
                    // t_c = g_c·a_c·s_c^(-β-1)
                    let t = (0..c)
                        .map(|ci| {
                            let idx = ci * plane + p;
                            g[idx] * a[idx] * s[idx].powf(-beta - 1.0)
                        })
                        .collect::<Vec<_>>();
                    for (ci, window) in windows.iter().enumerate() {
                        let idx = ci * plane + p;
                        let cross: f32 = window.clone().map(|j| t[j]).sum();
                        d[idx] = g[idx] * s[idx].powf(-beta) - 2.0 * alpha * beta * a[idx] * cross;
                    }
                }
            });
        Ok(Gradients {
            inputs: vec![Tensor::from_vec_exact(dx, input.shape())],
            params: Vec::new(),
        })
    }

    fn release(&mut self, _keep_cache: bool) {
        self.input = None;
        self.scale = Vec::new();
    }
}
