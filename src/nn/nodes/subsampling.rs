/*
 * @Description  : 池化（下采样）层，支持最大池化与平均池化
 *
 * 补零区域不参与计算：最大池化只在窗口内的有效位置取最大值，
 * 平均池化只对有效位置求平均。
 */

use rayon::prelude::*;

use super::{ForwardContext, Gradients, TraitNode, check_input_shape, missing_forward, output_extent};
use crate::nn::topology::SubsamplingConf;
use crate::nn::{ConvolutionMode, GraphError, PoolingType};
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub(crate) struct SubsamplingLayer {
    pooling: PoolingType,
    kernel: (usize, usize),
    stride: (usize, usize),
    mode: ConvolutionMode,
    /// (上, 左)
    offsets: (usize, usize),
    input_shape: Vec<usize>,
    shape: Vec<usize>,
    // 前向缓存：最大池化为每个输出位置记录取到最大值的输入下标（样本内），
    // 平均池化记录窗口内有效元素的个数
    batch: usize,
    argmax: Vec<usize>,
    counts: Vec<usize>,
    forwarded: bool,
}

impl SubsamplingLayer {
    pub(crate) fn new(conf: &SubsamplingConf, input_shape: &[usize]) -> Result<Self, GraphError> {
        if input_shape.len() != 3 {
            return Err(GraphError::Configuration(format!(
                "池化层的输入须为[C, H, W]，得到{input_shape:?}"
            )));
        }
        if conf.padding.0 >= conf.kernel.0 || conf.padding.1 >= conf.kernel.1 {
            return Err(GraphError::Configuration(format!(
                "池化的填充{:?}须小于核{:?}",
                conf.padding, conf.kernel
            )));
        }
        let (c, h, w) = (input_shape[0], input_shape[1], input_shape[2]);
        let extent = |input, kernel, stride, padding| {
            output_extent(input, kernel, stride, padding, conf.mode).ok_or_else(|| {
                GraphError::Configuration(format!(
                    "池化输出尺寸无效：输入{h}x{w}，核{:?}，步长{:?}，填充{:?}",
                    conf.kernel, conf.stride, conf.padding
                ))
            })
        };
        let (out_h, top, _) = extent(h, conf.kernel.0, conf.stride.0, conf.padding.0)?;
        let (out_w, left, _) = extent(w, conf.kernel.1, conf.stride.1, conf.padding.1)?;
        Ok(Self {
            pooling: conf.pooling,
            kernel: conf.kernel,
            stride: conf.stride,
            mode: conf.mode,
            offsets: (top, left),
            input_shape: input_shape.to_vec(),
            shape: vec![c, out_h, out_w],
            batch: 0,
            argmax: Vec::new(),
            counts: Vec::new(),
            forwarded: false,
        })
    }

    /// 输出位置(oy, ox)对应窗口在输入中的有效行、列范围
    fn window(&self, oy: usize, ox: usize) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let (h, w) = (self.input_shape[1], self.input_shape[2]);
        let (top, left) = self.offsets;
        let y0 = (oy * self.stride.0) as isize - top as isize;
        let x0 = (ox * self.stride.1) as isize - left as isize;
        let clip = |start: isize, len: usize, limit: usize| {
            let begin = start.max(0) as usize;
            let end = (start + len as isize).clamp(0, limit as isize) as usize;
            begin.min(end)..end
        };
        (clip(y0, self.kernel.0, h), clip(x0, self.kernel.1, w))
    }
}

impl TraitNode for SubsamplingLayer {
    fn kind(&self) -> &'static str {
        "Subsampling"
    }

    fn output_shape(&self) -> &[usize] {
        &self.shape
    }

    fn describe(&self) -> String {
        format!(
            "{:?} {}x{}/{} {:?}",
            self.pooling, self.kernel.0, self.kernel.1, self.stride.0, self.mode
        )
    }

    fn forward(&mut self, inputs: &[&Tensor], _ctx: &mut ForwardContext<'_>) -> Result<Tensor, GraphError> {
        let input = inputs[0];
        check_input_shape(self.kind(), input, &self.input_shape)?;
        self.batch = input.batch_size();
        let data = input.standard_slice();
        let (c, h, w) = (self.input_shape[0], self.input_shape[1], self.input_shape[2]);
        let (out_h, out_w) = (self.shape[1], self.shape[2]);
        let out_size = c * out_h * out_w;

        let windows = (0..out_h * out_w)
            .map(|i| self.window(i / out_w, i % out_w))
            .collect::<Vec<_>>();
        self.counts = windows.iter().map(|(ys, xs)| ys.len() * xs.len()).collect();

        let mut out = vec![0.0f32; self.batch * out_size];
        let mut argmax = vec![0usize; self.batch * out_size];
        let pooling = self.pooling;
        out.par_chunks_mut(out_size)
            .zip(argmax.par_chunks_mut(out_size))
            .zip(data.par_chunks(c * h * w))
            .for_each(|((dst, arg), sample)| {
                for ci in 0..c {
                    for (i, (ys, xs)) in windows.iter().enumerate() {
                        let o = ci * out_h * out_w + i;
                        match pooling {
                            PoolingType::Max => {
                                let mut best = f32::NEG_INFINITY;
                                let mut best_idx = 0;
                                for y in ys.clone() {
                                    for x in xs.clone() {
                                        let idx = (ci * h + y) * w + x;
                                        if sample[idx] > best {
                                            best = sample[idx];
                                            best_idx = idx;
                                        }
                                    }
                                }
                                dst[o] = best;
                                arg[o] = best_idx;
                            }
                            PoolingType::Avg => {
                                let mut sum = 0.0;
                                for y in ys.clone() {
                                    for x in xs.clone() {
                                        sum += sample[(ci * h + y) * w + x];
                                    }
                                }
                                dst[o] = sum / (ys.len() * xs.len()).max(1) as f32;
                            }
                        }
                    }
                }
            });
        self.argmax = argmax;
        self.forwarded = true;
        Ok(Tensor::from_vec_exact(out, &[self.batch, c, out_h, out_w]))
    }

    fn backward(
        &mut self,
        upstream: &Tensor,
        _need_param_grads: bool,
        need_input_grads: bool,
    ) -> Result<Gradients, GraphError> {
        if !self.forwarded {
            return Err(missing_forward(self.kind()));
        }
        if !need_input_grads {
            return Ok(Gradients::default());
        }
        let g = upstream.standard_slice();
        let (c, h, w) = (self.input_shape[0], self.input_shape[1], self.input_shape[2]);
        let (out_h, out_w) = (self.shape[1], self.shape[2]);
        let out_size = c * out_h * out_w;
        let windows = (0..out_h * out_w)
            .map(|i| self.window(i / out_w, i % out_w))
            .collect::<Vec<_>>();

        let mut dx = vec![0.0f32; self.batch * c * h * w];
        let (pooling, argmax, counts) = (self.pooling, &self.argmax, &self.counts);
        dx.par_chunks_mut(c * h * w)
            .enumerate()
            .for_each(|(b, dx_b)| {
                for ci in 0..c {
                    for (i, (ys, xs)) in windows.iter().enumerate() {
                        let o = b * out_size + ci * out_h * out_w + i;
                        match pooling {
                            PoolingType::Max => dx_b[argmax[o]] += g[o],
                            PoolingType::Avg => {
                                let share = g[o] / counts[i].max(1) as f32;
                                for y in ys.clone() {
                                    for x in xs.clone() {
                                        dx_b[(ci * h + y) * w + x] += share;
                                    }
                                }
                            }
                        }
                    }
                }
            });
        Ok(Gradients {
            inputs: vec![Tensor::from_vec_exact(dx, &[self.batch, c, h, w])],
            params: Vec::new(),
        })
    }

    fn release(&mut self, keep_cache: bool) {
        self.forwarded = false;
        if keep_cache {
            self.argmax.clear();
        } else {
            self.argmax = Vec::new();
        }
    }
}
