/*
 * @Description  : GAN的全部可调项：图像尺寸、生成器/判别器结构、两个网络的训练配置、
 *                 判别器训练的假/真样本次数比、每张图的迭代次数。
 *                 所有字段都有默认值（`#[serde(default)]`），可从JSON文件部分覆盖，构建前统一`validate()`。
 */

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::GanError;
use crate::nn::{GradientNormalization, NetworkConfig, Updater, WeightInit};

/// 原图的通道数（RGB）
pub const IMAGE_CHANNELS: usize = 3;
/// 掩码的通道数
pub const MASK_CHANNELS: usize = 1;
/// 生成器每级下采样的通道倍数（2x2空间缩小对应4倍通道，保证解码时的重塑元素个数不变）
pub const CHANNEL_MULTIPLIER: usize = 4;

/// 组合网络（含生成器）默认的学习率
pub const LEARNING_RATE: f32 = 2e-4;
/// 组合网络默认Adam的β1
pub const LEARNING_BETA1: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 编码器的级数，每级通道×4、尺寸减半
    pub stages: usize,
    /// 编码/解码卷积核
    pub kernel: (usize, usize),
    /// 最后输出RGB的卷积核
    pub output_kernel: (usize, usize),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            stages: 5,
            kernel: (2, 2),
            output_kernel: (2, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscriminatorConfig {
    /// DISCNN1..DISCNN5的输出通道数
    pub conv_widths: [usize; 5],
    /// DISFFN1、DISFFN2的宽度
    pub dense_widths: [usize; 2],
    /// DISFFN2输入的保留概率
    pub dropout: f32,
    /// 全连接层与输出层的权重初始化
    pub dense_weight_init: WeightInit,
    /// 若干卷积层与全连接层的偏置初值
    pub non_zero_bias: f32,
    /// 输出层的偏置初值
    pub output_bias: f32,
    /// 判别器网络的训练配置
    pub network: NetworkConfig,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            conv_widths: [96, 256, 384, 384, 256],
            dense_widths: [4096, 2047],
            dropout: 0.5,
            dense_weight_init: WeightInit::Normal {
                mean: 0.0,
                std: 5e-3,
            },
            non_zero_bias: 1.0,
            output_bias: 0.1,
            network: NetworkConfig {
                weight_init: WeightInit::Normal {
                    mean: 0.0,
                    std: 0.1,
                },
                updater: Updater::nesterovs(1e-2, 0.9),
                bias_updater: Some(Updater::nesterovs(2e-2, 0.9)),
                gradient_normalization: GradientNormalization::RenormalizeL2PerLayer,
                l2: 5e-4,
                mini_batch: false,
                ..NetworkConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GanConfig {
    pub height: usize,
    pub width: usize,
    pub generator: GeneratorConfig,
    pub discriminator: DiscriminatorConfig,
    /// 组合网络的训练配置（生成器部分由它更新）
    pub network: NetworkConfig,
    /// 每步在假样本上训练判别器的次数
    pub fake_fits: usize,
    /// 每步在真样本上训练判别器的次数
    pub real_fits: usize,
    pub iterations_per_picture: usize,
}

impl Default for GanConfig {
    fn default() -> Self {
        Self {
            height: 256,
            width: 256,
            generator: GeneratorConfig::default(),
            discriminator: DiscriminatorConfig::default(),
            network: NetworkConfig {
                updater: Updater::adam_with_beta1(LEARNING_RATE, LEARNING_BETA1),
                l2: 5e-4,
                ..NetworkConfig::default()
            },
            fake_fits: 3,
            real_fits: 2,
            iterations_per_picture: 20,
        }
    }
}

impl GanConfig {
    /// 生成器与判别器输入的基础通道数（图像 + 掩码）
    pub const fn base_channels() -> usize {
        IMAGE_CHANNELS + MASK_CHANNELS
    }

    pub fn validate(&self) -> Result<(), GanError> {
        let stages = self.generator.stages;
        if stages == 0 {
            return Err(GanError::Config("生成器至少需要1级".to_string()));
        }
        let factor = 1usize.checked_shl(stages as u32).unwrap_or(0);
        if factor == 0 || self.height == 0 || self.width == 0 {
            return Err(GanError::Config(format!(
                "图像尺寸{}x{}或生成器级数{stages}无效",
                self.height, self.width
            )));
        }
        if self.height % factor != 0 || self.width % factor != 0 {
            return Err(GanError::Config(format!(
                "图像尺寸{}x{}须能被2^{stages}={factor}整除",
                self.height, self.width
            )));
        }
        let kernels = [self.generator.kernel, self.generator.output_kernel];
        if kernels.iter().any(|&(h, w)| h == 0 || w == 0) {
            return Err(GanError::Config("卷积核尺寸须大于0".to_string()));
        }
        let d = &self.discriminator;
        if d.conv_widths.contains(&0) || d.dense_widths.contains(&0) {
            return Err(GanError::Config("判别器各层宽度须大于0".to_string()));
        }
        if !(d.dropout > 0.0 && d.dropout <= 1.0) {
            return Err(GanError::Config(format!(
                "dropout的保留概率须在(0, 1]区间内，得到{}",
                d.dropout
            )));
        }
        if self.iterations_per_picture == 0 {
            return Err(GanError::Config("每张图的迭代次数须大于0".to_string()));
        }
        d.network.validate()?;
        self.network.validate()?;
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, GanError> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| GanError::Config(format!("配置文件解析失败: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GanError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| GanError::Config(format!("配置序列化失败: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }
}
