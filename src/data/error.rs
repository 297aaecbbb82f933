//! 数据集相关错误类型定义

use std::path::PathBuf;

use thiserror::Error;

use crate::errors::TensorError;

#[derive(Debug, Error)]
pub enum DataError {
    /// 数据集中没有任何样本
    #[error("数据集为空")]
    EmptyDataset,

    /// 索引越界
    #[error("索引越界: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// 形状不匹配
    #[error("形状不匹配: 期望 {expected:?}, 实际 {got:?}。{message}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },

    #[error("参数无效: {0}")]
    InvalidArgument(String),

    /// 文件未找到
    #[error("文件未找到: {0}")]
    FileNotFound(PathBuf),

    /// 图像读取/解码错误
    #[error("图像错误: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}
