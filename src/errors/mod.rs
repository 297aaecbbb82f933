use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    // 数字比较用
    #[error("{value_name}须{operator}{threshold}")]
    ValueMustSatisfyComparison {
        value_name: String,
        operator: ComparisonOperator,
        threshold: usize,
    },
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    #[error("数据长度{len}与形状{shape:?}所需的元素个数不一致")]
    DataLenMismatch { len: usize, shape: Vec<usize> },
    #[error("无法将形状{from:?}重塑为{to:?}：元素个数不一致")]
    IncompatibleReshape { from: Vec<usize>, to: Vec<usize> },
    #[error("张量列表为空")]
    EmptyList,
    #[error("张量维数须为{expected}，实际为{got}")]
    DimensionMismatch { expected: usize, got: usize },
}
