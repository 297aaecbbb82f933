/*
 * @Description  : 全连接层：Y = f(X·W + b)
 *
 * - 输入为任意形状的样本，内部展平为[batch, n_in]
 * - 权重 [n_in, n_out]，偏置 [n_out]
 * - dropout作用于输入（inverted dropout：保留的元素除以保留概率），仅训练时生效
 */

use rand::rngs::StdRng;

use super::{ForwardContext, Gradients, TraitNode, check_input_shape, missing_forward};
use crate::nn::topology::DenseConf;
use crate::nn::{Activation, GraphError, WeightInit};
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub(crate) struct DenseLayer {
    input_shape: Vec<usize>,
    n_in: usize,
    n_out: usize,
    activation: Activation,
    dropout: Option<f32>,
    shape: Vec<usize>,
    params: Vec<Tensor>,

    // 前向缓存
    /// 实际参与计算的输入（已展平、已dropout）
    input: Option<Tensor>,
    dropout_mask: Option<Tensor>,
    pre_activation: Option<Tensor>,
    activated: Option<Tensor>,
}

impl DenseLayer {
    pub(crate) fn new(
        conf: &DenseConf,
        input_shape: &[usize],
        default_init: WeightInit,
        rng: &mut StdRng,
    ) -> Result<Self, GraphError> {
        Self::with_parts(
            input_shape,
            conf.n_out,
            conf.activation,
            conf.dropout,
            conf.weight_init.unwrap_or(default_init),
            conf.bias_init,
            rng,
        )
    }

    pub(crate) fn with_parts(
        input_shape: &[usize],
        n_out: usize,
        activation: Activation,
        dropout: Option<f32>,
        init: WeightInit,
        bias_init: f32,
        rng: &mut StdRng,
    ) -> Result<Self, GraphError> {
        let n_in = input_shape.iter().product::<usize>();
        if n_in == 0 || n_out == 0 {
            return Err(GraphError::Configuration(format!(
                "全连接层的输入/输出维度须大于0：输入{input_shape:?}，输出{n_out}"
            )));
        }
        if let Some(p) = dropout {
            if !(p > 0.0 && p <= 1.0) {
                return Err(GraphError::Configuration(format!(
                    "dropout的保留概率须在(0, 1]区间内，得到{p}"
                )));
            }
        }
        let weights = init.sample(&[n_in, n_out], n_in, n_out, rng);
        let bias = Tensor::full(bias_init, &[n_out]);
        Ok(Self {
            input_shape: input_shape.to_vec(),
            n_in,
            n_out,
            activation,
            dropout,
            shape: vec![n_out],
            params: vec![weights, bias],
            input: None,
            dropout_mask: None,
            pre_activation: None,
            activated: None,
        })
    }

    /// 计算激活前的值Z = X·W + b
    pub(crate) fn linear_forward(
        &mut self,
        input: &Tensor,
        ctx: &mut ForwardContext<'_>,
    ) -> Result<Tensor, GraphError> {
        check_input_shape("Dense", input, &self.input_shape)?;
        let mut x = input.reshape(&[input.batch_size(), self.n_in])?;
        self.dropout_mask = match self.dropout {
            Some(p) if ctx.training && p < 1.0 => {
                let mask = Tensor::uniform(0.0, 1.0, x.shape(), ctx.rng)
                    .map(|u| if u < p { 1.0 / p } else { 0.0 });
                x *= &mask;
                Some(mask)
            }
            _ => None,
        };
        let z = x.mat_mul(&self.params[0])?.add_row_vector(&self.params[1])?;
        self.input = Some(x);
        Ok(z)
    }

    /// 已知dL/dZ，求对输入与参数的梯度
    pub(crate) fn linear_backward(
        &self,
        dz: &Tensor,
        need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<Gradients, GraphError> {
        let x = self.input.as_ref().ok_or_else(|| missing_forward("Dense"))?;
        let mut grads = Gradients::default();
        if need_param_grads {
            grads.params = vec![x.t_mat_mul(dz)?, dz.sum_rows()?];
        }
        if need_input_grads {
            let mut dx = dz.mat_mul_t(&self.params[0])?;
            if let Some(mask) = &self.dropout_mask {
                dx *= mask;
            }
            let shape = std::iter::once(dz.batch_size())
                .chain(self.input_shape.iter().copied())
                .collect::<Vec<_>>();
            grads.inputs = vec![dx.reshape(&shape)?];
        }
        Ok(grads)
    }
}

impl TraitNode for DenseLayer {
    fn kind(&self) -> &'static str {
        "Dense"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        let dropout = self
            .dropout
            .map(|p| format!(" dropout={p}"))
            .unwrap_or_default();
        format!("{}->{} {:?}{dropout}", self.n_in, self.n_out, self.activation)
    }

    fn params(&self) -> &[Tensor] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Tensor] {
        &mut self.params
    }

    fn forward(&mut self, inputs: &[&Tensor], ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        let z = self.linear_forward(inputs[0], ctx)?;
        let a = self.activation.apply(&z);
        self.pre_activation = Some(z);
        self.activated = Some(a.clone());
        Ok(a)
    }

    fn backward(
        &mut self,
        upstream: &Tensor,
        need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<Gradients, GraphError> {
        let (z, a) = match (&self.pre_activation, &self.activated) {
            (Some(z), Some(a)) => (z, a),
            _ => return Err(missing_forward(self.kind())),
        };
        let dz = self.activation.backprop(z, a, upstream);
        self.linear_backward(&dz, need_param_grads, need_input_grads)
    }

    fn release(&mut self, _keep_cache: bool) {
        self.input = None;
        self.dropout_mask = None;
        self.pre_activation = None;
        self.activated = None;
    }
}
