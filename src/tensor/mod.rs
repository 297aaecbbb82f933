use ndarray::{Array, IxDyn};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod image;
mod ops;
mod property;
mod shape;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。本crate中的图像张量统一为4阶`[batch, channel, height, width]`，
/// 全连接层内部为2阶`[batch, features]`，参数张量的阶数由所属层决定。
/// 注：这里的相等（`==`）是逐元素的严格相等，两份参数拷贝相等即意味着逐位一致（NaN除外）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: Array<f32, IxDyn>,
}

impl Tensor {
    /// 以给定数据和形状创建张量。`data`的长度必须和`shape`中所有元素的乘积相等，否则panic。
    /// 若不希望panic，请使用`try_new`。
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        match Self::try_new(data, shape) {
            Ok(tensor) => tensor,
            Err(e) => panic!("{e}"),
        }
    }

    /// 同`new`，但长度与形状不匹配时返回错误
    pub fn try_new(data: &[f32], shape: &[usize]) -> Result<Self, TensorError> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// 直接接管`Vec`的所有权来创建张量（避免一次拷贝）
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self, TensorError> {
        let len = data.len();
        Array::from_shape_vec(IxDyn(shape), data)
            .map(|data| Self { data })
            .map_err(|_| TensorError::DataLenMismatch {
                len,
                shape: shape.to_vec(),
            })
    }

    /// 同`from_vec`，但长度与形状不匹配时panic，供内部按形状分配好缓冲区的场合使用
    pub(crate) fn from_vec_exact(data: Vec<f32>, shape: &[usize]) -> Self {
        match Self::from_vec(data, shape) {
            Ok(tensor) => tensor,
            Err(e) => panic!("{e}"),
        }
    }

    pub(crate) const fn from_array(data: Array<f32, IxDyn>) -> Self {
        Self { data }
    }

    /// 创建一个全为`value`的张量
    pub fn full(value: f32, shape: &[usize]) -> Self {
        Self {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(0.0, shape)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::full(1.0, shape)
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间，随机源由调用方提供（便于固定种子复现）
    pub fn uniform<R: Rng>(min: f32, max: f32, shape: &[usize], rng: &mut R) -> Self {
        let dist = Uniform::from(min..=max);
        Self {
            data: Array::from_shape_simple_fn(IxDyn(shape), || dist.sample(rng)),
        }
    }

    /// 创建一个服从正态分布N(mean, std_dev²)的随机张量（Box-Muller变换）
    pub fn normal<R: Rng>(mean: f32, std_dev: f32, shape: &[usize], rng: &mut R) -> Self {
        let unit = Uniform::new(f32::EPSILON, 1.0);
        // Box-Muller每次产生两个样本，第二个留给下一个元素
        let mut spare: Option<f32> = None;
        let data = Array::from_shape_simple_fn(IxDyn(shape), || {
            if let Some(z1) = spare.take() {
                return mean + std_dev * z1;
            }
            let u1 = unit.sample(rng);
            let u2 = unit.sample(rng);
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            spare = Some(r * theta.sin());
            mean + std_dev * r * theta.cos()
        });
        Self { data }
    }

    /// 将同一行数据重复`rows`次，得到形状为`[rows, row.len()]`的矩阵（常用于按batch复制标签）
    pub fn repeat_row(row: &[f32], rows: usize) -> Self {
        Self {
            data: Array::from_shape_fn(IxDyn(&[rows, row.len()]), |idx| row[idx[1]]),
        }
    }
}
