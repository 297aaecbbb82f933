/*
 * @Description  : 张量的形状相关操作：重塑、按通道拼接/拆分、按batch取样本
 *                 通道轴约定为第1轴（`[batch, channel, ...]`）
 */

use super::Tensor;
use crate::errors::{Operator, TensorError};
use ndarray::{Axis, IxDyn};

const CHANNEL_AXIS: usize = 1;

impl Tensor {
    /// 按行优先顺序重新解释数据的形状（元素个数须一致）
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        if self.size() != shape.iter().product::<usize>() {
            return Err(TensorError::IncompatibleReshape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            });
        }
        let data = self
            .data
            .as_standard_layout()
            .into_owned()
            .into_shape(IxDyn(shape))
            .map_err(|_| TensorError::IncompatibleReshape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            })?;
        Ok(Self::from_array(data))
    }

    /// 把`[batch, ...]`展平为`[batch, features]`
    pub fn flatten_batch(&self) -> Result<Self, TensorError> {
        let batch = self.batch_size();
        let features = self.size() / batch.max(1);
        self.reshape(&[batch, features])
    }

    /// 沿通道轴拼接多个张量，除通道轴外其余维度须一致
    pub fn concat_channels(tensors: &[&Self]) -> Result<Self, TensorError> {
        let first = tensors.first().ok_or(TensorError::EmptyList)?;
        for t in &tensors[1..] {
            let same_rank = t.dimension() == first.dimension();
            let others_match = same_rank
                && t.shape()
                    .iter()
                    .zip(first.shape())
                    .enumerate()
                    .all(|(axis, (a, b))| axis == CHANNEL_AXIS || a == b);
            if !others_match {
                return Err(TensorError::OperatorError {
                    operator: Operator::Concat,
                    tensor1_shape: first.shape().to_vec(),
                    tensor2_shape: t.shape().to_vec(),
                });
            }
        }
        let views = tensors.iter().map(|t| t.data.view()).collect::<Vec<_>>();
        let data = ndarray::concatenate(Axis(CHANNEL_AXIS), &views).map_err(|_| {
            TensorError::OperatorError {
                operator: Operator::Concat,
                tensor1_shape: first.shape().to_vec(),
                tensor2_shape: tensors[tensors.len() - 1].shape().to_vec(),
            }
        })?;
        // `concatenate`的结果可能不是标准布局，统一转换
        Ok(Self::from_array(data.as_standard_layout().into_owned()))
    }

    /// 沿通道轴按`sizes`拆分，是`concat_channels`的逆操作
    pub fn split_channels(&self, sizes: &[usize]) -> Result<Vec<Self>, TensorError> {
        let total = sizes.iter().sum::<usize>();
        if self.dimension() <= CHANNEL_AXIS || self.shape()[CHANNEL_AXIS] != total {
            return Err(TensorError::OperatorError {
                operator: Operator::Concat,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: vec![total],
            });
        }
        let mut start = 0;
        let mut parts = Vec::with_capacity(sizes.len());
        for &size in sizes {
            let part = self
                .data
                .slice_axis(Axis(CHANNEL_AXIS), (start..start + size).into())
                .as_standard_layout()
                .into_owned();
            parts.push(Self::from_array(part));
            start += size;
        }
        Ok(parts)
    }

    /// 取出第`index`个样本，保留batch维（结果batch为1）
    pub fn select_batch(&self, index: usize) -> Result<Self, TensorError> {
        if index >= self.batch_size() {
            return Err(TensorError::ValueMustSatisfyComparison {
                value_name: "batch大小".to_string(),
                operator: crate::errors::ComparisonOperator::GreaterThan,
                threshold: index,
            });
        }
        let part = self
            .data
            .slice_axis(Axis(0), (index..=index).into())
            .as_standard_layout()
            .into_owned();
        Ok(Self::from_array(part))
    }

    /// 每一行最大值所在的列索引（用于分类评估），张量须为2阶
    pub fn argmax_rows(&self) -> Result<Vec<usize>, TensorError> {
        if self.dimension() != 2 {
            return Err(TensorError::DimensionMismatch {
                expected: 2,
                got: self.dimension(),
            });
        }
        Ok(self
            .data
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(best_i, best), (i, &v)| {
                        if v > best { (i, v) } else { (best_i, best) }
                    })
                    .0
            })
            .collect())
    }
}
