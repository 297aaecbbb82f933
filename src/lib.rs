//! # Only Inpaint
//!
//! `only_inpaint`用纯rust实现基于GAN的图像修复（inpainting）训练：
//! 带跳连的编码-解码生成器、AlexNet式的真/假判别器，以及由生成器与冻结判别器组成的组合网络，
//! 按"判别器（假样本、真样本）→ 参数同步 → 组合网络"的顺序交替训练。
//!
//! 模块自底向上：
//! - [`tensor`]：基于`ndarray`的张量
//! - [`nn`]：以层为粒度的计算图（构建、前向、反向、更新、保存/加载）
//! - [`data`]：训练样本与迭代器
//! - [`gan`]：网络结构、标签约定、参数同步与训练编排
//! - [`controller`]：无界面的加载/保存/训练/测试控制器
//!

pub mod controller;
pub mod data;
pub mod errors;
pub mod gan;
pub mod nn;
pub mod tensor;
pub mod utils;
