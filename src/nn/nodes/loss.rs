/*
 * @Description  : 损失层
 *
 * - `CnnLossLayer`：逐元素激活 + 损失，无参数，用于图像重建（如sigmoid + 二元交叉熵）
 * - `OutputLayer`：全连接 + 激活 + 损失，用于分类（如softmax + 负对数似然）
 *
 * 损失值为整个batch的总和；`mini_batch`为true时损失与梯度再除以batch大小。
 * sigmoid + 交叉熵、softmax + 负对数似然两种组合直接使用 dL/dz = a - y，避免数值问题。
 */

use rand::rngs::StdRng;

use super::{DenseLayer, ForwardContext, Gradients, TraitNode, check_input_shape, missing_forward};
use crate::nn::topology::{CnnLossConf, OutputConf};
use crate::nn::{Activation, GraphError, LossFunction, WeightInit};
use crate::tensor::Tensor;

const LOG_EPSILON: f32 = 1e-7;

/// 返回(损失, dL/dz)，均已按`mini_batch`缩放
fn loss_and_delta(
    activation: Activation,
    loss: LossFunction,
    z: &Tensor,
    a: &Tensor,
    labels: &Tensor,
    mini_batch: bool,
) -> Result<(f32, Tensor), GraphError> {
    if labels.shape() != a.shape() {
        return Err(GraphError::ShapeMismatch {
            expected: a.shape().to_vec(),
            got: labels.shape().to_vec(),
            message: "标签形状须与损失层输出一致".to_string(),
        });
    }
    let features = (a.size() / a.batch_size().max(1)).max(1) as f32;
    let clip = |p: f32| p.clamp(LOG_EPSILON, 1.0 - LOG_EPSILON);
    let score = match loss {
        LossFunction::Xent => -a
            .zip_map(labels, |p, y| y * clip(p).ln() + (1.0 - y) * (1.0 - clip(p)).ln())
            .sum(),
        LossFunction::NegativeLogLikelihood => -a.zip_map(labels, |p, y| y * clip(p).ln()).sum(),
        LossFunction::Mse => a.zip_map(labels, |p, y| (p - y) * (p - y)).sum() / features,
    };
    let delta = match (activation, loss) {
        (Activation::Sigmoid, LossFunction::Xent)
        | (Activation::Softmax, LossFunction::NegativeLogLikelihood) => a - labels,
        _ => {
            let da = match loss {
                LossFunction::Xent => a.zip_map(labels, |p, y| {
                    let p = clip(p);
                    (p - y) / (p * (1.0 - p))
                }),
                LossFunction::NegativeLogLikelihood => a.zip_map(labels, |p, y| -y / clip(p)),
                LossFunction::Mse => a.zip_map(labels, |p, y| 2.0 * (p - y) / features),
            };
            activation.backprop(z, a, &da)
        }
    };
    if mini_batch {
        let batch = a.batch_size().max(1) as f32;
        Ok((score / batch, delta / batch))
    } else {
        Ok((score, delta))
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓逐元素损失层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone)]
pub(crate) struct CnnLossLayer {
    activation: Activation,
    loss: LossFunction,
    shape: Vec<usize>,
    pre_activation: Option<Tensor>,
    activated: Option<Tensor>,
}

impl CnnLossLayer {
    pub(crate) fn new(conf: &CnnLossConf, input_shape: &[usize]) -> Result<Self, GraphError> {
        if input_shape.len() != 3 {
            return Err(GraphError::Configuration(format!(
                "CnnLoss层的输入须为[C, H, W]，得到{input_shape:?}"
            )));
        }
        if conf.activation == Activation::Softmax {
            return Err(GraphError::Configuration("CnnLoss层不支持softmax激活".to_string()));
        }
        Ok(Self {
            activation: conf.activation,
            loss: conf.loss,
            shape: input_shape.to_vec(),
            pre_activation: None,
            activated: None,
        })
    }
}

impl TraitNode for CnnLossLayer {
    fn kind(&self) -> &'static str {
        "CnnLoss"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("{:?} {:?}", self.activation, self.loss)
    }

    fn is_loss(&self) -> bool {
        true
    }

    fn forward(&mut self, inputs: &[&Tensor], _ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        let z = inputs[0];
        check_input_shape(self.kind(), z, &self.shape)?;
        let a = self.activation.apply(z);
        self.pre_activation = Some(z.clone());
        self.activated = Some(a.clone());
        Ok(a)
    }

    fn backward(&mut self, _upstream: &Tensor, _: bool, _: bool) -> Result<Gradients, GraphError> {
        Err(GraphError::InvalidOperation(
            "损失层只能作为图输出，梯度由`loss`计算".to_string(),
        ))
    }

    fn loss(
        &mut self,
        labels: &Tensor,
        mini_batch: bool,
        _need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<(f32, Gradients), GraphError> {
        let (z, a) = match (&self.pre_activation, &self.activated) {
            (Some(z), Some(a)) => (z, a),
            _ => return Err(missing_forward(self.kind())),
        };
        let (score, delta) = loss_and_delta(self.activation, self.loss, z, a, labels, mini_batch)?;
        let inputs = if need_input_grads { vec![delta] } else { Vec::new() };
        Ok((
            score,
            Gradients {
                inputs,
                params: Vec::new(),
            },
        ))
    }

    fn release(&mut self, _keep_cache: bool) {
        self.pre_activation = None;
        self.activated = None;
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑逐元素损失层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓输出层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone)]
pub(crate) struct OutputLayer {
    /// 线性部分复用全连接层（不带激活与dropout）
    dense: DenseLayer,
    activation: Activation,
    loss: LossFunction,
    shape: Vec<usize>,
    pre_activation: Option<Tensor>,
    activated: Option<Tensor>,
}

impl OutputLayer {
    pub(crate) fn new(
        conf: &OutputConf,
        input_shape: &[usize],
        default_init: WeightInit,
        rng: &mut StdRng,
    ) -> Result<Self, GraphError> {
        let dense = DenseLayer::with_parts(
            input_shape,
            conf.n_out,
            Activation::Identity,
            None,
            conf.weight_init.unwrap_or(default_init),
            conf.bias_init,
            rng,
        )?;
        Ok(Self {
            dense,
            activation: conf.activation,
            loss: conf.loss,
            shape: vec![conf.n_out],
            pre_activation: None,
            activated: None,
        })
    }
}

impl TraitNode for OutputLayer {
    fn kind(&self) -> &'static str {
        "Output"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        format!(
            "{} {:?} {:?}",
            self.dense.describe().replace(" Identity", ""),
            self.activation,
            self.loss
        )
    }

    fn is_loss(&self) -> bool {
        true
    }

    fn params(&self) -> &[Tensor] {
        self.dense.params()
    }

    fn params_mut(&mut self) -> &mut [Tensor] {
        self.dense.params_mut()
    }

    fn forward(&mut self, inputs: &[&Tensor], ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        let z = self.dense.linear_forward(inputs[0], ctx)?;
        let a = self.activation.apply(&z);
        self.pre_activation = Some(z);
        self.activated = Some(a.clone());
        Ok(a)
    }

    fn backward(&mut self, _upstream: &Tensor, _: bool, _: bool) -> Result<Gradients, GraphError> {
        Err(GraphError::InvalidOperation(
            "损失层只能作为图输出，梯度由`loss`计算".to_string(),
        ))
    }

    fn loss(
        &mut self,
        labels: &Tensor,
        mini_batch: bool,
        need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<(f32, Gradients), GraphError> {
        let (z, a) = match (&self.pre_activation, &self.activated) {
            (Some(z), Some(a)) => (z, a),
            _ => return Err(missing_forward(self.kind())),
        };
        let (score, delta) = loss_and_delta(self.activation, self.loss, z, a, labels, mini_batch)?;
        let grads = self
            .dense
            .linear_backward(&delta, need_param_grads, need_input_grads)?;
        Ok((score, grads))
    }

    fn release(&mut self, keep_cache: bool) {
        self.dense.release(keep_cache);
        self.pre_activation = None;
        self.activated = None;
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑输出层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
