/*
 * @Description  : 由(输入图, 原图, 掩码)三个图像文件组成的样本条目
 */

use std::path::{Path, PathBuf};

use super::{DataError, TrainingExample};
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    input: PathBuf,
    output: PathBuf,
    mask: PathBuf,
}

impl FileEntry {
    /// `input`为待修复图，`output`为原图（期望输出），`mask`为标出缺损区域的灰度图
    pub fn new<P: Into<PathBuf>>(input: P, output: P, mask: P) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            mask: mask.into(),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn mask(&self) -> &Path {
        &self.mask
    }

    /// 读取三张图并组成样本。像素保持原值`[0, 255]`，归一化交给预处理器。
    /// 三张图的尺寸须一致。
    pub fn load(&self) -> Result<TrainingExample, DataError> {
        for path in [&self.input, &self.output, &self.mask] {
            if !path.exists() {
                return Err(DataError::FileNotFound(path.clone()));
            }
        }
        let input = image::open(&self.input)?.to_rgb8();
        let output = image::open(&self.output)?.to_rgb8();
        let mask = image::open(&self.mask)?.to_luma8();
        let size = input.dimensions();
        for (name, other) in [("原图", output.dimensions()), ("掩码", mask.dimensions())] {
            if other != size {
                return Err(DataError::ShapeMismatch {
                    expected: vec![size.1 as usize, size.0 as usize],
                    got: vec![other.1 as usize, other.0 as usize],
                    message: format!("{name}与输入图的尺寸不一致"),
                });
            }
        }
        let raw = |t: Tensor| t * 255.0;
        TrainingExample::new(
            raw(Tensor::from_rgb_image(&input)),
            raw(Tensor::from_gray_image(&mask)),
            raw(Tensor::from_rgb_image(&output)),
        )
    }
}
