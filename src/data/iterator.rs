/*
 * @Description  : 图像样本迭代器
 *
 * 内存实现把n个样本的每一个重复`iterations_per_picture`次：
 * - `max_size = (n - 1) * iterations_per_picture`；
 * - 第p次顺序调用`next()`（p从1到`max_size`）返回当前排列中的第`p / iterations_per_picture`个样本；
 * - `reset()`回到开头并重新洗牌。
 */

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{DataError, ExamplePreProcessor, FileEntry, TrainingExample};

pub trait ImageDataSetIterator {
    fn has_next(&self) -> bool;

    /// 顺序取下一个样本，耗尽后返回`None`
    fn next(&mut self) -> Option<TrainingExample>;

    /// 按当前排列中的位置取样本
    fn next_at(&self, index: usize) -> Result<TrainingExample, DataError>;

    /// 均匀随机取一个样本，不影响顺序迭代的进度
    fn next_random(&mut self) -> TrainingExample;

    /// Fisher–Yates洗牌
    fn shuffle(&mut self);

    /// 回到开头并重新洗牌
    fn reset(&mut self);

    /// 一轮中`next()`可返回的次数
    fn max_size(&self) -> usize;

    /// 不同样本的个数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MemoryDataSetIterator {
    examples: Vec<TrainingExample>,
    iterations_per_picture: usize,
    max_size: usize,
    pointer: usize,
    rng: StdRng,
    pre_processor: Option<Box<dyn ExamplePreProcessor>>,
}

impl MemoryDataSetIterator {
    /// 每张图默认重复的次数
    pub const DEFAULT_ITERATIONS_PER_PICTURE: usize = 20;

    /// 创建后立即洗牌一次
    pub fn new(
        examples: Vec<TrainingExample>,
        iterations_per_picture: usize,
        seed: u64,
    ) -> Result<Self, DataError> {
        if examples.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        if iterations_per_picture == 0 {
            return Err(DataError::InvalidArgument(
                "每张图的迭代次数须大于0".to_string(),
            ));
        }
        let max_size = (examples.len() - 1) * iterations_per_picture;
        let mut iterator = Self {
            examples,
            iterations_per_picture,
            max_size,
            pointer: 0,
            rng: StdRng::seed_from_u64(seed),
            pre_processor: None,
        };
        iterator.shuffle();
        debug!(
            examples = iterator.examples.len(),
            iterations_per_picture, max_size, "样本迭代器已创建"
        );
        Ok(iterator)
    }

    /// 从图像文件三元组加载全部样本
    pub fn from_files(
        entries: &[FileEntry],
        iterations_per_picture: usize,
        seed: u64,
    ) -> Result<Self, DataError> {
        let examples = entries
            .iter()
            .map(FileEntry::load)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(examples, iterations_per_picture, seed)
    }

    pub const fn iterations_per_picture(&self) -> usize {
        self.iterations_per_picture
    }

    /// 当前已顺序取出的次数
    pub const fn pointer(&self) -> usize {
        self.pointer
    }

    /// 设置预处理器，并立即作用于全部样本
    pub fn set_pre_processor(&mut self, pre_processor: Box<dyn ExamplePreProcessor>) {
        for example in &mut self.examples {
            pre_processor.pre_process(example);
        }
        self.pre_processor = Some(pre_processor);
    }

    pub fn pre_processor(&self) -> Option<&dyn ExamplePreProcessor> {
        self.pre_processor.as_deref()
    }

    /// 当前排列下的全部样本
    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }
}

impl fmt::Debug for MemoryDataSetIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDataSetIterator")
            .field("examples", &self.examples.len())
            .field("iterations_per_picture", &self.iterations_per_picture)
            .field("max_size", &self.max_size)
            .field("pointer", &self.pointer)
            .finish_non_exhaustive()
    }
}

impl ImageDataSetIterator for MemoryDataSetIterator {
    fn has_next(&self) -> bool {
        self.pointer < self.max_size
    }

    fn next(&mut self) -> Option<TrainingExample> {
        if !self.has_next() {
            return None;
        }
        self.pointer += 1;
        Some(self.examples[self.pointer / self.iterations_per_picture].clone())
    }

    fn next_at(&self, index: usize) -> Result<TrainingExample, DataError> {
        self.examples
            .get(index)
            .cloned()
            .ok_or(DataError::IndexOutOfBounds {
                index,
                len: self.examples.len(),
            })
    }

    fn next_random(&mut self) -> TrainingExample {
        let index = self.rng.gen_range(0..self.examples.len());
        self.examples[index].clone()
    }

    fn shuffle(&mut self) {
        self.examples.shuffle(&mut self.rng);
    }

    fn reset(&mut self) {
        self.pointer = 0;
        self.shuffle();
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}
