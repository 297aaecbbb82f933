/*
 * @Description  : 训练样本与多输入/多输出数据集
 *
 * 一个`TrainingExample`是一组(输入图像, 掩码, 原图)，形状分别为
 * `[batch, C, H, W]`、`[batch, 1, H, W]`、`[batch, C, H, W]`；
 * 由迭代器每步产出、被一次训练消费后即丢弃。
 */

use super::DataError;
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    input: Tensor,
    mask: Tensor,
    ground_truth: Tensor,
}

impl TrainingExample {
    /// 三者须为4阶张量，batch与空间尺寸一致，掩码为单通道，输入与原图形状相同
    pub fn new(input: Tensor, mask: Tensor, ground_truth: Tensor) -> Result<Self, DataError> {
        if input.dimension() != 4 {
            return Err(DataError::ShapeMismatch {
                expected: vec![1, 3, 0, 0],
                got: input.shape().to_vec(),
                message: "输入图像须为[batch, C, H, W]".to_string(),
            });
        }
        if !input.is_same_shape(&ground_truth) {
            return Err(DataError::ShapeMismatch {
                expected: input.shape().to_vec(),
                got: ground_truth.shape().to_vec(),
                message: "原图与输入图像的形状须一致".to_string(),
            });
        }
        let (batch, height, width) = (input.shape()[0], input.shape()[2], input.shape()[3]);
        let expected_mask = [batch, 1, height, width];
        if mask.shape() != expected_mask {
            return Err(DataError::ShapeMismatch {
                expected: expected_mask.to_vec(),
                got: mask.shape().to_vec(),
                message: "掩码须为与输入同尺寸的单通道图".to_string(),
            });
        }
        Ok(Self {
            input,
            mask,
            ground_truth,
        })
    }

    pub const fn input(&self) -> &Tensor {
        &self.input
    }

    pub const fn mask(&self) -> &Tensor {
        &self.mask
    }

    pub const fn ground_truth(&self) -> &Tensor {
        &self.ground_truth
    }

    /// (高, 宽)
    pub fn image_size(&self) -> (usize, usize) {
        (self.input.shape()[2], self.input.shape()[3])
    }

    /// 对三张图逐一原地变换（预处理器用）
    pub fn map_images<F: Fn(&mut Tensor)>(&mut self, f: F) {
        f(&mut self.input);
        f(&mut self.mask);
        f(&mut self.ground_truth);
    }

    /// 生成器训练用的数据：特征`[输入, 掩码]`，标签`[原图]`
    pub fn to_multi_dataset(&self) -> MultiDataSet {
        MultiDataSet::new(
            vec![self.input.clone(), self.mask.clone()],
            vec![self.ground_truth.clone()],
        )
    }
}

/// 多输入、多输出的一组数据，顺序分别对应计算图的输入与输出声明顺序
#[derive(Debug, Clone, PartialEq)]
pub struct MultiDataSet {
    features: Vec<Tensor>,
    labels: Vec<Tensor>,
}

impl MultiDataSet {
    pub const fn new(features: Vec<Tensor>, labels: Vec<Tensor>) -> Self {
        Self { features, labels }
    }

    pub fn features(&self) -> &[Tensor] {
        &self.features
    }

    pub fn labels(&self) -> &[Tensor] {
        &self.labels
    }
}
