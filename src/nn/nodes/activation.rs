use crate::nn::Activation;
use crate::tensor::Tensor;

const LEAKY_RELU_ALPHA: f32 = 0.01;

impl Activation {
    /// 前向：a = f(z)
    pub(crate) fn apply(&self, z: &Tensor) -> Tensor {
        match self {
            Self::Identity => z.clone(),
            Self::LeakyRelu => z.map(|x| if x > 0.0 { x } else { LEAKY_RELU_ALPHA * x }),
            Self::Relu => z.map(|x| x.max(0.0)),
            Self::Sigmoid => z.map(sigmoid),
            Self::Tanh => z.map(f32::tanh),
            Self::Softmax => softmax_rows(z),
        }
    }

    /// 反向：已知dL/da，求dL/dz。`z`为激活前的值，`a`为激活后的值
    pub(crate) fn backprop(&self, z: &Tensor, a: &Tensor, upstream: &Tensor) -> Tensor {
        match self {
            Self::Identity => upstream.clone(),
            Self::LeakyRelu => z.zip_map(upstream, |x, g| if x > 0.0 { g } else { LEAKY_RELU_ALPHA * g }),
            Self::Relu => z.zip_map(upstream, |x, g| if x > 0.0 { g } else { 0.0 }),
            Self::Sigmoid => a.zip_map(upstream, |y, g| g * y * (1.0 - y)),
            Self::Tanh => a.zip_map(upstream, |y, g| g * (1.0 - y * y)),
            Self::Softmax => softmax_rows_backprop(a, upstream),
        }
    }
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// 对首维之外的全部元素做softmax（即按样本归一化）
fn softmax_rows(z: &Tensor) -> Tensor {
    let batch = z.batch_size().max(1);
    let cols = z.size() / batch;
    let mut out = z.standard_slice().into_owned();
    for row in out.chunks_mut(cols.max(1)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for v in row.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        row.iter_mut().for_each(|v| *v /= sum);
    }
    Tensor::from_vec_exact(out, z.shape())
}

/// dz_i = a_i * (g_i - Σ_j g_j a_j)
fn softmax_rows_backprop(a: &Tensor, upstream: &Tensor) -> Tensor {
    let batch = a.batch_size().max(1);
    let cols = (a.size() / batch).max(1);
    let a_data = a.standard_slice();
    let mut out = upstream.standard_slice().into_owned();
    for (g_row, a_row) in out.chunks_mut(cols).zip(a_data.chunks(cols)) {
        let dot: f32 = g_row.iter().zip(a_row).map(|(g, y)| g * y).sum();
        for (g, y) in g_row.iter_mut().zip(a_row) {
            *g = y * (*g - dot);
        }
    }
    Tensor::from_vec_exact(out, a.shape())
}

