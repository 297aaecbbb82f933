/*
 * @Description  : GAN模块的错误类型
 */

use thiserror::Error;

use crate::data::DataError;
use crate::errors::TensorError;
use crate::nn::GraphError;

#[derive(Debug, Error)]
pub enum GanError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
    /// 组合网络的层数不等于生成器层数与判别器层数之和，或判别器层不是组合网络层列表的后缀
    #[error(
        "层数不匹配：组合网络共{total}层，判别器{discriminator}层，生成器应为{generator}层。{message}"
    )]
    LayerCountMismatch {
        total: usize,
        discriminator: usize,
        generator: usize,
        message: String,
    },
    #[error("配置错误: {0}")]
    Config(String),
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
