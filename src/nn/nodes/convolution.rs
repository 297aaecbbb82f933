/*
 * @Description  : 2D 卷积层（含偏置与激活）
 *
 * - 输入 [batch, C_in, H, W]，输出 [batch, C_out, H', W']
 * - 权重 [C_out, C_in, kH, kW]，偏置 [C_out]
 * - `Truncate`模式使用显式补零，`Same`模式自动补零（前少后多）
 * - 前向与对输入的梯度按batch维用Rayon并行，对权重的梯度按输出通道并行
 * - 补零后的输入缓存在`padded`中，`CacheMode::Host`下释放工作区时保留其容量
 */

use rand::rngs::StdRng;
use rayon::prelude::*;

use super::{ForwardContext, Gradients, TraitNode, check_input_shape, missing_forward, output_extent};
use crate::nn::topology::ConvolutionConf;
use crate::nn::{Activation, ConvolutionMode, GraphError, WeightInit};
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub(crate) struct ConvolutionLayer {
    in_channels: usize,
    out_channels: usize,
    kernel: (usize, usize),
    stride: (usize, usize),
    mode: ConvolutionMode,
    activation: Activation,
    /// (上, 左, 下, 右)
    pads: (usize, usize, usize, usize),
    input_hw: (usize, usize),
    shape: Vec<usize>,
    params: Vec<Tensor>,

    // 前向缓存
    batch: usize,
    padded: Vec<f32>,
    pre_activation: Option<Tensor>,
    activated: Option<Tensor>,
}

impl ConvolutionLayer {
    pub(crate) fn new(
        conf: &ConvolutionConf,
        input_shape: &[usize],
        default_init: WeightInit,
        rng: &mut StdRng,
    ) -> Result<Self, GraphError> {
        if input_shape.len() != 3 {
            return Err(GraphError::Configuration(format!(
                "卷积层的输入须为[C, H, W]，得到{input_shape:?}"
            )));
        }
        if conf.n_out == 0 {
            return Err(GraphError::Configuration("卷积层的输出通道数须大于0".to_string()));
        }
        if conf.activation == Activation::Softmax {
            return Err(GraphError::Configuration("卷积层不支持softmax激活".to_string()));
        }
        let (in_channels, h, w) = (input_shape[0], input_shape[1], input_shape[2]);
        let (kh, kw) = conf.kernel;
        let extent = |input, kernel, stride, padding| {
            output_extent(input, kernel, stride, padding, conf.mode).ok_or_else(|| {
                GraphError::Configuration(format!(
                    "卷积输出尺寸无效：输入{h}x{w}，核{:?}，步长{:?}，填充{:?}，模式{:?}",
                    conf.kernel, conf.stride, conf.padding, conf.mode
                ))
            })
        };
        let (out_h, top, bottom) = extent(h, kh, conf.stride.0, conf.padding.0)?;
        let (out_w, left, right) = extent(w, kw, conf.stride.1, conf.padding.1)?;

        let fan_in = in_channels * kh * kw;
        let fan_out = conf.n_out * kh * kw;
        let init = conf.weight_init.unwrap_or(default_init);
        let weights = init.sample(&[conf.n_out, in_channels, kh, kw], fan_in, fan_out, rng);
        let bias = Tensor::full(conf.bias_init, &[conf.n_out]);

        Ok(Self {
            in_channels,
            out_channels: conf.n_out,
            kernel: conf.kernel,
            stride: conf.stride,
            mode: conf.mode,
            activation: conf.activation,
            pads: (top, left, bottom, right),
            input_hw: (h, w),
            shape: vec![conf.n_out, out_h, out_w],
            params: vec![weights, bias],
            batch: 0,
            padded: Vec::new(),
            pre_activation: None,
            activated: None,
        })
    }

    const fn padded_hw(&self) -> (usize, usize) {
        let (top, left, bottom, right) = self.pads;
        (self.input_hw.0 + top + bottom, self.input_hw.1 + left + right)
    }

    /// 把输入拷贝进补零缓冲区（复用已有容量）
    fn fill_padded(&mut self, input: &[f32]) {
        let (h, w) = self.input_hw;
        let (hp, wp) = self.padded_hw();
        let (top, left, _, _) = self.pads;
        let c = self.in_channels;
        self.padded.clear();
        self.padded.resize(self.batch * c * hp * wp, 0.0);
        self.padded
            .par_chunks_mut(c * hp * wp)
            .zip(input.par_chunks(c * h * w))
            .for_each(|(dst, src)| {
                for ci in 0..c {
                    for y in 0..h {
                        let from = ci * h * w + y * w;
                        let to = ci * hp * wp + (y + top) * wp + left;
                        dst[to..to + w].copy_from_slice(&src[from..from + w]);
                    }
                }
            });
    }
}

impl TraitNode for ConvolutionLayer {
    fn kind(&self) -> &'static str {
        "Convolution"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        format!(
            "{}x{}/{} {:?} {}->{} {:?}",
            self.kernel.0, self.kernel.1, self.stride.0, self.mode, self.in_channels, self.out_channels, self.activation
        )
    }

    fn params(&self) -> &[Tensor] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Tensor] {
        &mut self.params
    }

    fn forward(&mut self, inputs: &[&Tensor], _ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        let input = inputs[0];
        check_input_shape(
            self.kind(),
            input,
            &[self.in_channels, self.input_hw.0, self.input_hw.1],
        )?;
        self.batch = input.batch_size();
        self.fill_padded(&input.standard_slice());

        let (hp, wp) = self.padded_hw();
        let (in_c, out_c) = (self.in_channels, self.out_channels);
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        let (out_h, out_w) = (self.shape[1], self.shape[2]);
        let weights = self.params[0].standard_slice();
        let bias = self.params[1].standard_slice();

        let mut out = vec![0.0f32; self.batch * out_c * out_h * out_w];
        out.par_chunks_mut(out_c * out_h * out_w)
            .zip(self.padded.par_chunks(in_c * hp * wp))
            .for_each(|(dst, sample)| {
                for oc in 0..out_c {
                    for oy in 0..out_h {
                        for ox in 0..out_w {
                            let mut sum = bias[oc];
                            for ic in 0..in_c {
                                for ky in 0..kh {
                                    let row = ic * hp * wp + (oy * sh + ky) * wp + ox * sw;
                                    let w_row = ((oc * in_c + ic) * kh + ky) * kw;
                                    for kx in 0..kw {
                                        sum += sample[row + kx] * weights[w_row + kx];
                                    }
                                }
                            }
                            dst[(oc * out_h + oy) * out_w + ox] = sum;
                        }
                    }
                }
            });

        let pre = Tensor::from_vec_exact(out, &[self.batch, out_c, out_h, out_w]);
        let activated = self.activation.apply(&pre);
        self.pre_activation = Some(pre);
        self.activated = Some(activated.clone());
        Ok(activated)
    }

    /// 对于 Y = f(conv(X, W) + b):
    /// - dL/dZ = f'(Z) ⊙ dL/dY
    /// - dL/db = Σ dL/dZ
    /// - dL/dW = 补零输入与dL/dZ的相关运算
    /// - dL/dX = dL/dZ的转置卷积，再裁掉补零部分
    fn backward(
        &mut self,
        upstream: &Tensor,
        need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<Gradients, GraphError> {
        let (pre, activated) = match (&self.pre_activation, &self.activated) {
            (Some(pre), Some(activated)) => (pre, activated),
            _ => return Err(missing_forward(self.kind())),
        };
        if upstream.shape() != pre.shape() {
            return Err(GraphError::ShapeMismatch {
                expected: pre.shape().to_vec(),
                got: upstream.shape().to_vec(),
                message: "卷积层收到的上游梯度形状不对".to_string(),
            });
        }
        let dz = self.activation.backprop(pre, activated, upstream);
        let dz = dz.standard_slice();

        let batch = self.batch;
        let (h, w) = self.input_hw;
        let (hp, wp) = self.padded_hw();
        let (top, left, _, _) = self.pads;
        let (in_c, out_c) = (self.in_channels, self.out_channels);
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        let (out_h, out_w) = (self.shape[1], self.shape[2]);
        let out_size = out_c * out_h * out_w;
        let padded_size = in_c * hp * wp;

        let mut grads = Gradients::default();
        if need_param_grads {
            let padded = &self.padded;
            let mut dw = vec![0.0f32; out_c * in_c * kh * kw];
            dw.par_chunks_mut(in_c * kh * kw)
                .enumerate()
                .for_each(|(oc, dw_oc)| {
                    for b in 0..batch {
                        let sample = &padded[b * padded_size..(b + 1) * padded_size];
                        for oy in 0..out_h {
                            for ox in 0..out_w {
                                let g = dz[b * out_size + (oc * out_h + oy) * out_w + ox];
                                if g == 0.0 {
                                    continue;
                                }
                                for ic in 0..in_c {
                                    for ky in 0..kh {
                                        let row = ic * hp * wp + (oy * sh + ky) * wp + ox * sw;
                                        let w_row = (ic * kh + ky) * kw;
                                        for kx in 0..kw {
                                            dw_oc[w_row + kx] += g * sample[row + kx];
                                        }
                                    }
                                }
                            }
                        }
                    }
                });
            let mut db = vec![0.0f32; out_c];
            for sample in dz.chunks(out_size) {
                for (oc, plane) in sample.chunks(out_h * out_w).enumerate() {
                    db[oc] += plane.iter().sum::<f32>();
                }
            }
            grads.params = vec![
                Tensor::from_vec_exact(dw, self.params[0].shape()),
                Tensor::from_vec_exact(db, &[out_c]),
            ];
        }

        if need_input_grads {
            let weights = self.params[0].standard_slice();
            let mut dx = vec![0.0f32; batch * in_c * h * w];
            dx.par_chunks_mut(in_c * h * w)
                .zip(dz.par_chunks(out_size))
                .for_each(|(dx_b, dz_b)| {
                    let mut grad_padded = vec![0.0f32; padded_size];
                    for oc in 0..out_c {
                        for oy in 0..out_h {
                            for ox in 0..out_w {
                                let g = dz_b[(oc * out_h + oy) * out_w + ox];
                                if g == 0.0 {
                                    continue;
                                }
                                for ic in 0..in_c {
                                    for ky in 0..kh {
                                        let row = ic * hp * wp + (oy * sh + ky) * wp + ox * sw;
                                        let w_row = ((oc * in_c + ic) * kh + ky) * kw;
                                        for kx in 0..kw {
                                            grad_padded[row + kx] += g * weights[w_row + kx];
                                        }
                                    }
                                }
                            }
                        }
                    }
                    for ic in 0..in_c {
                        for y in 0..h {
                            let from = ic * hp * wp + (y + top) * wp + left;
                            let to = ic * h * w + y * w;
                            dx_b[to..to + w].copy_from_slice(&grad_padded[from..from + w]);
                        }
                    }
                });
            grads.inputs = vec![Tensor::from_vec_exact(dx, &[batch, in_c, h, w])];
        }
        Ok(grads)
    }

    fn release(&mut self, keep_cache: bool) {
        self.pre_activation = None;
        self.activated = None;
        if keep_cache {
            self.padded.clear();
        } else {
            self.padded = Vec::new();
        }
    }
}
