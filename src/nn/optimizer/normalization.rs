use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// 梯度归一化/裁剪策略，作用于单个层的全部参数梯度（`PerLayer`）或逐个参数（`PerParamType`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GradientNormalization {
    #[default]
    None,
    /// g / ‖g_layer‖₂
    RenormalizeL2PerLayer,
    /// g / ‖g_param‖₂
    RenormalizeL2PerParamType,
    /// 逐元素裁剪到[-threshold, threshold]
    ClipElementWiseAbsoluteValue,
    /// 若‖g_layer‖₂ > threshold，则缩放到threshold
    ClipL2PerLayer,
    /// 若‖g_param‖₂ > threshold，则缩放到threshold
    ClipL2PerParamType,
}

impl GradientNormalization {
    /// 对某一层的参数梯度原地归一化
    pub fn apply(&self, grads: &mut [Tensor], threshold: f32) {
        match self {
            Self::None => {}
            Self::RenormalizeL2PerLayer => {
                let norm = layer_l2(grads);
                if norm > 0.0 {
                    grads.iter_mut().for_each(|g| *g *= 1.0 / norm);
                }
            }
            Self::RenormalizeL2PerParamType => {
                for g in grads.iter_mut() {
                    let norm = g.l2_norm();
                    if norm > 0.0 {
                        *g *= 1.0 / norm;
                    }
                }
            }
            Self::ClipElementWiseAbsoluteValue => {
                grads
                    .iter_mut()
                    .for_each(|g| g.map_inplace(|x| x.clamp(-threshold, threshold)));
            }
            Self::ClipL2PerLayer => {
                let norm = layer_l2(grads);
                if norm > threshold {
                    grads.iter_mut().for_each(|g| *g *= threshold / norm);
                }
            }
            Self::ClipL2PerParamType => {
                for g in grads.iter_mut() {
                    let norm = g.l2_norm();
                    if norm > threshold {
                        *g *= threshold / norm;
                    }
                }
            }
        }
    }
}

fn layer_l2(grads: &[Tensor]) -> f32 {
    grads.iter().map(Tensor::square_sum).sum::<f32>().sqrt()
}
