/*
 * @Description  : 张量与`image`库图像之间的转换。
 *                 张量端统一为`[1, C, H, W]`，像素值归一化到[0, 1]；图像端为8位RGB或灰度图。
 */

use super::Tensor;
use crate::errors::TensorError;
use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::{Array, IxDyn};

impl Tensor {
    /// 将RGB图像转换为`[1, 3, H, W]`张量，像素值缩放到[0, 1]
    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let (w, h) = image.dimensions();
        let data = Array::from_shape_fn(IxDyn(&[1, 3, h as usize, w as usize]), |idx| {
            let pixel = image.get_pixel(idx[3] as u32, idx[2] as u32);
            f32::from(pixel[idx[1]]) / 255.0
        });
        Self::from_array(data)
    }

    /// 将灰度图（如修复掩码）转换为`[1, 1, H, W]`张量，像素值缩放到[0, 1]
    pub fn from_gray_image(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let data = Array::from_shape_fn(IxDyn(&[1, 1, h as usize, w as usize]), |idx| {
            f32::from(image.get_pixel(idx[3] as u32, idx[2] as u32)[0]) / 255.0
        });
        Self::from_array(data)
    }

    /// 将`[1, 3, H, W]`（或`[3, H, W]`）张量渲染为RGB图像，值先被限制在[0, 1]
    pub fn to_rgb_image(&self) -> Result<RgbImage, TensorError> {
        let (h, w) = self.image_hw(3)?;
        let view = self.data.view().into_shape(IxDyn(&[3, h, w])).map_err(|_| {
            TensorError::IncompatibleReshape {
                from: self.shape().to_vec(),
                to: vec![3, h, w],
            }
        })?;
        Ok(RgbImage::from_fn(w as u32, h as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgb([
                to_u8(view[[0, y, x]]),
                to_u8(view[[1, y, x]]),
                to_u8(view[[2, y, x]]),
            ])
        }))
    }

    /// 将`[1, 1, H, W]`张量渲染为灰度图
    pub fn to_gray_image(&self) -> Result<GrayImage, TensorError> {
        let (h, w) = self.image_hw(1)?;
        let data = self.standard_slice();
        Ok(GrayImage::from_fn(w as u32, h as u32, |x, y| {
            Luma([to_u8(data[y as usize * w + x as usize])])
        }))
    }

    fn image_hw(&self, channels: usize) -> Result<(usize, usize), TensorError> {
        let shape = self.shape();
        let ok = match shape {
            [1, c, _, _] | [c, _, _] => *c == channels,
            _ => false,
        };
        if !ok {
            return Err(TensorError::DimensionMismatch {
                expected: channels,
                got: if shape.len() >= 3 { shape[shape.len() - 3] } else { 0 },
            });
        }
        Ok((shape[shape.len() - 2], shape[shape.len() - 1]))
    }
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
