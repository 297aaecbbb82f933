/*
 * @Description  : GAN训练编排：判别器与组合网络（生成器 + 冻结的判别器）的交替训练与参数同步。
 *
 * 每一步：
 * 1. （可选）判别器阶段：组合网络前向得到修复图（假样本），
 *    判别器在(假图, 掩码) → FAKE 上训练`fake_fits`次，再在(原图, 掩码) → REAL 上训练`real_fits`次，
 *    随后把判别器参数同步到组合网络尾部；
 * 2. 生成器阶段：组合网络在(输入图, 掩码) → [REAL, 原图] 上训练一次，
 *    此时判别器各层冻结（按推理模式计算，不做dropout），梯度只更新生成器。
 * 尾部冻结、生成器阶段不会改变它，因此每步结束时尾部总与判别器一致。
 */

use std::fmt;
use std::path::Path;

use image::RgbImage;
use tracing::{debug, info};

use super::labels::LabelPair;
use super::sync::ParameterSyncTable;
use super::topology::{combined_topology, discriminator_topology, generator_topology};
use super::{GanConfig, GanError};
use crate::data::{ImageDataSetIterator, TrainingExample};
use crate::nn::{ComputationGraph, Evaluation, TrainingListener};
use crate::tensor::Tensor;

/// 判别器的计算图名
pub const DISCRIMINATOR_NAME: &str = "discriminator";
/// 组合网络的计算图名
pub const COMBINED_NAME: &str = "gan";
/// 独立生成器的计算图名
pub const GENERATOR_NAME: &str = "generator";

/// 按配置构建独立的生成器计算图（与组合网络的生成器部分结构相同、参数独立）
pub fn build_generator(config: &GanConfig) -> Result<ComputationGraph, GanError> {
    config.validate()?;
    Ok(ComputationGraph::new(
        GENERATOR_NAME,
        generator_topology(config),
        config.network.clone(),
    )?)
}

/// 一次推理的结果
#[derive(Debug, Clone)]
pub struct NetResult {
    /// 判别器对修复图的判断，形状`[batch, 2]`
    pub verdict: Tensor,
    /// 修复图，形状`[batch, 3, H, W]`，取值`(0, 1)`
    pub reconstruction: Tensor,
}

impl NetResult {
    /// 第`index`个样本是否被判为真实
    pub fn is_real(&self, index: usize) -> Result<bool, GanError> {
        let classes = self.verdict.argmax_rows()?;
        let class = classes.get(index).copied().ok_or_else(|| {
            GanError::Config(format!("样本序号{index}越界（共{}个）", classes.len()))
        })?;
        Ok(class == LabelPair::Real.class_index())
    }

    /// 第`index`个样本的修复图
    pub fn to_rgb_image(&self, index: usize) -> Result<RgbImage, GanError> {
        Ok(self.reconstruction.select_batch(index)?.to_rgb_image()?)
    }
}

pub struct Gan {
    config: GanConfig,
    discriminator: ComputationGraph,
    network: ComputationGraph,
    sync_table: ParameterSyncTable,
}

impl Gan {
    /// 按配置新建判别器与组合网络
    pub fn new(config: GanConfig) -> Result<Self, GanError> {
        config.validate()?;
        let discriminator = ComputationGraph::new(
            DISCRIMINATOR_NAME,
            discriminator_topology(&config),
            config.discriminator.network.clone(),
        )?;
        Self::with_discriminator(config, discriminator)
    }

    /// 沿用已有的（如从文件加载的）判别器，新建组合网络
    pub fn with_discriminator(
        config: GanConfig,
        discriminator: ComputationGraph,
    ) -> Result<Self, GanError> {
        config.validate()?;
        let network = ComputationGraph::new(
            COMBINED_NAME,
            combined_topology(&config)?,
            config.network.clone(),
        )?;
        Self::from_graphs(config, discriminator, network)
    }

    /// 由一对现成的计算图组装。建立同步表并立即同步一次
    pub fn from_graphs(
        config: GanConfig,
        discriminator: ComputationGraph,
        mut network: ComputationGraph,
    ) -> Result<Self, GanError> {
        let generator_layers = generator_topology(&config).num_layers();
        let sync_table = ParameterSyncTable::build(&discriminator, &network, generator_layers)?;
        sync_table.apply(&discriminator, &mut network)?;
        info!(
            generator_layers,
            discriminator_layers = discriminator.num_layers(),
            combined_layers = network.num_layers(),
            params = network.num_params(),
            "GAN已组装"
        );
        Ok(Self {
            config,
            discriminator,
            network,
            sync_table,
        })
    }

    /// 训练一步，返回组合网络本次的损失
    pub fn fit_example(
        &mut self,
        example: &TrainingExample,
        train_discriminator: bool,
    ) -> Result<f32, GanError> {
        let mask = example.mask();
        if train_discriminator {
            let batch = example.input().batch_size();
            let fake = self.reconstruct(example.input(), mask)?;
            let fake_label = LabelPair::Fake.tensor(batch);
            for _ in 0..self.config.fake_fits {
                self.discriminator.fit_tensors(&[&fake, mask], &[&fake_label])?;
            }
            let real_label = LabelPair::Real.tensor(batch);
            for _ in 0..self.config.real_fits {
                self.discriminator
                    .fit_tensors(&[example.ground_truth(), mask], &[&real_label])?;
            }
            self.sync()?;
        }

        let real_label = LabelPair::Real.tensor(example.input().batch_size());
        let score = self.network.fit_tensors(
            &[example.input(), mask],
            &[&real_label, example.ground_truth()],
        )?;
        debug!(
            iteration = self.network.iteration_count(),
            score,
            discriminator_score = self.discriminator.score(),
            "GAN训练一步"
        );
        Ok(score)
    }

    /// 顺序取完迭代器`epochs`次，每轮结束后重置迭代器并增加两个网络的轮次
    pub fn fit_epochs<I: ImageDataSetIterator + ?Sized>(
        &mut self,
        iterator: &mut I,
        epochs: usize,
        train_discriminator: bool,
    ) -> Result<(), GanError> {
        for _ in 0..epochs {
            while iterator.has_next() {
                let Some(example) = iterator.next() else {
                    break;
                };
                self.fit_example(&example, train_discriminator)?;
            }
            iterator.reset();
            self.increment_epoch();
            info!(epoch = self.network.epoch_count(), score = self.network.score(), "一轮训练完成");
        }
        Ok(())
    }

    /// 两个网络的轮次同时加一（并回调各自监听器的`on_epoch_end`）
    pub fn increment_epoch(&mut self) {
        self.discriminator.increment_epoch();
        self.network.increment_epoch();
    }

    /// 把判别器参数复制到组合网络尾部
    pub fn sync(&mut self) -> Result<(), GanError> {
        self.sync_table.apply(&self.discriminator, &mut self.network)
    }

    /// 推理：返回判别器对修复图的判断与修复图
    pub fn output(&mut self, input: &Tensor, mask: &Tensor) -> Result<NetResult, GanError> {
        let mut outputs = self.network.output(&[input, mask])?.into_iter();
        match (outputs.next(), outputs.next()) {
            (Some(verdict), Some(reconstruction)) => Ok(NetResult {
                verdict,
                reconstruction,
            }),
            _ => Err(GanError::Config("组合网络应有两个输出".to_string())),
        }
    }

    /// 判别器在迭代器全部样本上的分类评估：修复图应判为FAKE、原图应判为REAL。
    /// 完成后重置迭代器。
    pub fn evaluate<I: ImageDataSetIterator + ?Sized>(
        &mut self,
        iterator: &mut I,
    ) -> Result<Evaluation, GanError> {
        let mut evaluation = Evaluation::new();
        for index in 0..iterator.len() {
            let example = iterator.next_at(index)?;
            let batch = example.input().batch_size();
            let mask = example.mask();
            let fake = self.reconstruct(example.input(), mask)?;
            let verdict = self.discriminator.output_single(&[&fake, mask])?;
            evaluation.eval(&LabelPair::Fake.tensor(batch), &verdict)?;
            let verdict = self
                .discriminator
                .output_single(&[example.ground_truth(), mask])?;
            evaluation.eval(&LabelPair::Real.tensor(batch), &verdict)?;
        }
        iterator.reset();
        info!(accuracy = evaluation.accuracy(), f1 = evaluation.f1(), "判别器评估完成");
        Ok(evaluation)
    }

    fn reconstruct(&mut self, input: &Tensor, mask: &Tensor) -> Result<Tensor, GanError> {
        Ok(self.output(input, mask)?.reconstruction)
    }

    pub fn set_listeners(
        &mut self,
        discriminator: Vec<Box<dyn TrainingListener>>,
        network: Vec<Box<dyn TrainingListener>>,
    ) {
        self.discriminator.set_listeners(discriminator);
        self.network.set_listeners(network);
    }

    /// 取走两个网络的监听器，返回(判别器的, 组合网络的)
    pub fn take_listeners(
        &mut self,
    ) -> (Vec<Box<dyn TrainingListener>>, Vec<Box<dyn TrainingListener>>) {
        (
            self.discriminator.take_listeners(),
            self.network.take_listeners(),
        )
    }

    /// 分别保存判别器与组合网络
    pub fn save<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        discriminator_path: P,
        network_path: Q,
        save_updater: bool,
    ) -> Result<(), GanError> {
        self.discriminator.save(discriminator_path, save_updater)?;
        self.network.save(network_path, save_updater)?;
        Ok(())
    }

    /// 从两个模型文件恢复
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        config: GanConfig,
        discriminator_path: P,
        network_path: Q,
    ) -> Result<Self, GanError> {
        let discriminator = ComputationGraph::load(discriminator_path)?;
        let network = ComputationGraph::load(network_path)?;
        Self::from_graphs(config, discriminator, network)
    }

    pub const fn config(&self) -> &GanConfig {
        &self.config
    }

    pub const fn discriminator(&self) -> &ComputationGraph {
        &self.discriminator
    }

    pub const fn network(&self) -> &ComputationGraph {
        &self.network
    }

    pub const fn sync_table(&self) -> &ParameterSyncTable {
        &self.sync_table
    }

    /// 组合网络已完成的迭代次数
    pub const fn iteration_count(&self) -> usize {
        self.network.iteration_count()
    }
}

impl fmt::Debug for Gan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gan")
            .field("discriminator", &self.discriminator)
            .field("network", &self.network)
            .field("synced_layers", &self.sync_table.len())
            .finish_non_exhaustive()
    }
}
