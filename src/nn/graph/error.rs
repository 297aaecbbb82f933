/*
 * @Description  : 计算图模块的错误类型
 */

use thiserror::Error;

use crate::errors::TensorError;

/// 计算图的构建、运行与持久化错误
#[derive(Debug, Error)]
pub enum GraphError {
    /// 拓扑接线/形状/超参数有误，构建失败且不会留下半成品
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("节点未找到: {0}")]
    NodeNotFound(String),
    #[error("无效操作: {0}")]
    InvalidOperation(String),
    #[error("形状不匹配: 期望{expected:?}，实际{got:?}。{message}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("计算错误: {0}")]
    ComputationError(String),
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
    /// 模型文件格式有误（magic不符、版本不符、反序列化失败等）
    #[error("格式错误: {0}")]
    Format(String),
}
