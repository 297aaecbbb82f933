/*
 * @Description  : 判别器的2类独热标签。全程固定 REAL = [0, 1]、FAKE = [1, 0]（类别1表示真实）。
 */

use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelPair {
    Real,
    Fake,
}

impl LabelPair {
    pub const fn one_hot(self) -> [f32; 2] {
        match self {
            Self::Real => [0.0, 1.0],
            Self::Fake => [1.0, 0.0],
        }
    }

    /// 独热编码中为1的类别下标
    pub const fn class_index(self) -> usize {
        match self {
            Self::Real => 1,
            Self::Fake => 0,
        }
    }

    pub const fn from_class_index(index: usize) -> Option<Self> {
        match index {
            1 => Some(Self::Real),
            0 => Some(Self::Fake),
            _ => None,
        }
    }

    /// 形状为`[batch, 2]`的标签张量，每行都是本标签的独热编码
    pub fn tensor(self, batch: usize) -> Tensor {
        Tensor::repeat_row(&self.one_hot(), batch)
    }
}
