use crate::tensor::Tensor;
use ndarray::Zip;

impl Tensor {
    /// 所有元素之和（纯数）
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// 所有元素的平均值；空张量返回0
    pub fn mean(&self) -> f32 {
        if self.size() == 0 {
            0.0
        } else {
            self.sum() / self.size() as f32
        }
    }

    /// 元素平方和
    pub fn square_sum(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum()
    }

    /// L2范数
    pub fn l2_norm(&self) -> f32 {
        self.square_sum().sqrt()
    }

    /// 逐元素映射
    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Self {
        Self::from_array(self.data.mapv(f))
    }

    /// 原地逐元素映射
    pub fn map_inplace<F: Fn(f32) -> f32>(&mut self, f: F) {
        self.data.mapv_inplace(f);
    }

    /// 两个同形张量逐元素组合，形状不一致时panic
    pub fn zip_map<F: Fn(f32, f32) -> f32>(&self, other: &Self, f: F) -> Self {
        assert!(
            self.is_same_shape(other),
            "zip_map的两个张量形状须一致：{:?} vs {:?}",
            self.shape(),
            other.shape()
        );
        let mut out = self.data.clone();
        Zip::from(&mut out)
            .and(&other.data)
            .for_each(|a, &b| *a = f(*a, b));
        Self::from_array(out)
    }

    pub fn sqrt(&self) -> Self {
        self.map(f32::sqrt)
    }

    /// 将每个元素限制在[min, max]
    pub fn clamp(&self, min: f32, max: f32) -> Self {
        self.map(|x| x.clamp(min, max))
    }

    /// 与另一个同形张量的均方误差
    pub fn mse(&self, other: &Self) -> f32 {
        self.zip_map(other, |a, b| (a - b) * (a - b)).mean()
    }
}
