/*
 * @Description  : 二分类评估：混淆矩阵及准确率、精确率、召回率、F1。
 *                 以类别1为正类（在GAN中即"真"）。
 */

use std::fmt;

use super::GraphError;
use crate::tensor::Tensor;

/// 2类混淆矩阵，`matrix[实际][预测]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    matrix: [[usize; 2]; 2],
}

impl Evaluation {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计一批结果；`labels`与`predictions`形状均为`[batch, 2]`，按每行最大值取类别
    pub fn eval(&mut self, labels: &Tensor, predictions: &Tensor) -> Result<(), GraphError> {
        if !labels.is_same_shape(predictions) || labels.dimension() != 2 || labels.shape()[1] != 2 {
            return Err(GraphError::ShapeMismatch {
                expected: labels.shape().to_vec(),
                got: predictions.shape().to_vec(),
                message: "评估要求标签与预测形状一致且为[batch, 2]".to_string(),
            });
        }
        for (actual, predicted) in labels.argmax_rows()?.into_iter().zip(predictions.argmax_rows()?) {
            self.matrix[actual][predicted] += 1;
        }
        Ok(())
    }

    /// 合并另一份评估结果
    pub fn merge(&mut self, other: &Self) {
        for (row, other_row) in self.matrix.iter_mut().zip(&other.matrix) {
            for (cell, other_cell) in row.iter_mut().zip(other_row) {
                *cell += other_cell;
            }
        }
    }

    pub const fn confusion_matrix(&self) -> [[usize; 2]; 2] {
        self.matrix
    }

    pub fn count(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    const fn true_positives(&self) -> usize {
        self.matrix[1][1]
    }

    const fn false_positives(&self) -> usize {
        self.matrix[0][1]
    }

    const fn false_negatives(&self) -> usize {
        self.matrix[1][0]
    }

    /// 无样本时为0
    pub fn accuracy(&self) -> f64 {
        ratio(self.matrix[0][0] + self.matrix[1][1], self.count())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives(), self.true_positives() + self.false_positives())
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives(), self.true_positives() + self.false_negatives())
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    /// 多行文本形式的统计结果
    pub fn stats(&self) -> String {
        self.to_string()
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "样本数: {}", self.count())?;
        writeln!(f, "准确率: {:.4}", self.accuracy())?;
        writeln!(f, "精确率: {:.4}", self.precision())?;
        writeln!(f, "召回率: {:.4}", self.recall())?;
        writeln!(f, "F1: {:.4}", self.f1())?;
        writeln!(f, "混淆矩阵（行为实际，列为预测）:")?;
        for (class, row) in self.matrix.iter().enumerate() {
            writeln!(f, "  {class}: {:>6} {:>6}", row[0], row[1])?;
        }
        Ok(())
    }
}
