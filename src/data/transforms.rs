//! 样本预处理器
//!
//! 预处理器在设置到迭代器时对全部样本原地生效一次，之后迭代产出的样本都是处理过的。

use super::TrainingExample;

pub trait ExamplePreProcessor: Send {
    fn pre_process(&self, example: &mut TrainingExample);
}

/// 将像素值从`[0, max_pixel]`线性映射到`[min_range, max_range]`，默认`[0, 255] → [0, 1]`。
/// 作用于输入图、掩码与原图。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePreProcessingScaler {
    min_range: f32,
    max_range: f32,
    max_pixel: f32,
}

impl Default for ImagePreProcessingScaler {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl ImagePreProcessingScaler {
    pub const fn new(min_range: f32, max_range: f32) -> Self {
        Self {
            min_range,
            max_range,
            max_pixel: 255.0,
        }
    }

    pub const fn with_max_pixel(mut self, max_pixel: f32) -> Self {
        self.max_pixel = max_pixel;
        self
    }

    pub fn scale(&self, value: f32) -> f32 {
        self.min_range + value / self.max_pixel * (self.max_range - self.min_range)
    }
}

impl ExamplePreProcessor for ImagePreProcessingScaler {
    fn pre_process(&self, example: &mut TrainingExample) {
        example.map_images(|image| image.map_inplace(|v| self.scale(v)));
    }
}
