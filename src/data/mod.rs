//! 数据模块
//!
//! 提供修复任务的训练样本、样本迭代器与预处理。
//!
//! # 主要组件
//!
//! - [`TrainingExample`]: 一组(输入图像, 掩码, 原图)
//! - [`MultiDataSet`]: 计算图多输入/多输出训练用的一组数据
//! - [`ImageDataSetIterator`]: 样本迭代器接口
//! - [`MemoryDataSetIterator`]: 内存中的样本迭代器（每张图重复多次、可洗牌）
//! - [`FileEntry`]: 由三个图像文件组成的样本条目
//! - [`ImagePreProcessingScaler`]: 像素值缩放预处理器
//! - [`DataError`]: 数据相关错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use only_inpaint::data::{ImageDataSetIterator, ImagePreProcessingScaler, MemoryDataSetIterator};
//!
//! let mut iterator = MemoryDataSetIterator::from_files(&entries, 20, 42)?;
//! iterator.set_pre_processor(Box::new(ImagePreProcessingScaler::default()));
//! while let Some(example) = iterator.next() {
//!     gan.fit_example(&example, true)?;
//! }
//! iterator.reset();
//! ```

mod error;
mod example;
mod file;
mod iterator;
mod transforms;

pub use error::DataError;
pub use example::{MultiDataSet, TrainingExample};
pub use file::FileEntry;
pub use iterator::{ImageDataSetIterator, MemoryDataSetIterator};
pub use transforms::{ExamplePreProcessor, ImagePreProcessingScaler};

#[cfg(test)]
mod tests;
