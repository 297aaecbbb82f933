/*
 * @Description  : 无界面的训练控制器：加载、保存、训练tick与测试
 *
 * 模型加载的回退顺序：
 * 1. 判别器与组合网络文件都存在：两者都加载，直接组装；
 * 2. 否则（或1失败）若判别器文件存在：只加载判别器，新建组合网络；
 * 3. 否则（或2失败）：全部新建。
 * 加载失败只记警告日志，不视为错误。
 */

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::{IterationObserver, TrainingSession, TrainingSwitch};
use crate::data::{ImageDataSetIterator, TrainingExample};
use crate::gan::{Gan, GanConfig, GanError, NetResult};
use crate::nn::ComputationGraph;

/// 两个模型文件的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub discriminator: PathBuf,
    pub network: PathBuf,
    /// 保存时是否连同更新器状态一起保存
    pub save_updater: bool,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

impl ModelPaths {
    /// `dir`下的`discriminator.bin`与`gan.bin`，保存更新器状态
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            discriminator: dir.join("discriminator.bin"),
            network: dir.join("gan.bin"),
            save_updater: true,
        }
    }
}

/// 一次测试的结果
#[derive(Debug, Clone)]
pub struct TestReport {
    /// 测试所用的样本
    pub example: TrainingExample,
    pub result: NetResult,
    /// 修复图与原图的均方误差
    pub reconstruction_error: f32,
}

type BoxedIterator = Box<dyn ImageDataSetIterator + Send>;

pub struct LearningController {
    config: GanConfig,
    paths: ModelPaths,
    gan: Gan,
    iterator: BoxedIterator,
    session: TrainingSession,
    switch: TrainingSwitch,
    train_discriminator: bool,
    observers: Vec<Box<dyn IterationObserver>>,
}

impl LearningController {
    /// 按回退顺序加载或新建模型
    pub fn new(
        config: GanConfig,
        paths: ModelPaths,
        iterator: BoxedIterator,
    ) -> Result<Self, GanError> {
        let gan = load_or_build(&config, &paths)?;
        let session = TrainingSession::resume(gan.iteration_count(), iterator.max_size());
        Ok(Self {
            config,
            paths,
            gan,
            iterator,
            session,
            switch: TrainingSwitch::new(),
            train_discriminator: true,
            observers: Vec::new(),
        })
    }

    /// 重新从文件加载（回退规则同`new`），迭代计数随之恢复；已安装的监听器转移到新模型上
    pub fn load(&mut self) -> Result<(), GanError> {
        let mut gan = load_or_build(&self.config, &self.paths)?;
        let (discriminator_listeners, network_listeners) = self.gan.take_listeners();
        gan.set_listeners(discriminator_listeners, network_listeners);
        self.gan = gan;
        self.session = TrainingSession::resume(self.gan.iteration_count(), self.iterator.max_size());
        info!(iteration = self.session.iteration(), "模型已加载");
        Ok(())
    }

    pub fn save(&self) -> Result<(), GanError> {
        self.gan.save(
            &self.paths.discriminator,
            &self.paths.network,
            self.paths.save_updater,
        )?;
        info!(
            discriminator = %self.paths.discriminator.display(),
            network = %self.paths.network.display(),
            "模型已保存"
        );
        Ok(())
    }

    /// 训练一步。开关关闭时什么也不做并返回`false`；
    /// 迭代器耗尽时先重置（重新洗牌）并结束一轮。
    pub fn train_tick(&mut self) -> Result<bool, GanError> {
        if !self.switch.is_enabled() {
            return Ok(false);
        }
        if !self.iterator.has_next() {
            self.iterator.reset();
            self.gan.increment_epoch();
        }
        let example = match self.iterator.next() {
            Some(example) => example,
            // 只有一个样本时一轮为空，改为随机取样
            None => self.iterator.next_random(),
        };
        let score = self.gan.fit_example(&example, self.train_discriminator)?;
        self.session.advance();
        for observer in &mut self.observers {
            observer.iteration_done(&self.session, score);
        }
        Ok(true)
    }

    /// 开关开启期间持续训练，返回本次执行的tick数。训练出错时停止并返回错误
    pub fn run(&mut self) -> Result<usize, GanError> {
        info!(iteration = self.session.iteration(), "开始训练");
        let mut ticks = 0;
        while self.train_tick()? {
            ticks += 1;
        }
        info!(
            ticks,
            iteration = self.session.iteration(),
            epoch = self.session.epoch(),
            "训练已停止"
        );
        Ok(ticks)
    }

    /// 随机取一个样本做推理。出错时记录日志并把错误返回给调用方
    pub fn test(&mut self) -> Result<TestReport, GanError> {
        let example = self.iterator.next_random();
        let result = self
            .gan
            .output(example.input(), example.mask())
            .inspect_err(|e| error!(error = %e, "测试执行出错"))?;
        let reconstruction_error = result.reconstruction.mse(example.ground_truth());
        info!(reconstruction_error, "测试完成");
        Ok(TestReport {
            example,
            result,
            reconstruction_error,
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn IterationObserver>) {
        self.observers.push(observer);
    }

    /// 是否在每步中训练判别器
    pub fn set_train_discriminator(&mut self, train: bool) {
        self.train_discriminator = train;
    }

    pub const fn train_discriminator(&self) -> bool {
        self.train_discriminator
    }

    /// 训练开关（可克隆到其他线程）
    pub fn switch(&self) -> TrainingSwitch {
        self.switch.clone()
    }

    pub const fn session(&self) -> &TrainingSession {
        &self.session
    }

    pub const fn iteration(&self) -> usize {
        self.session.iteration()
    }

    pub const fn epoch(&self) -> usize {
        self.session.epoch()
    }

    pub const fn gan(&self) -> &Gan {
        &self.gan
    }

    pub fn gan_mut(&mut self) -> &mut Gan {
        &mut self.gan
    }

    pub const fn paths(&self) -> &ModelPaths {
        &self.paths
    }
}

impl fmt::Debug for LearningController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearningController")
            .field("paths", &self.paths)
            .field("session", &self.session)
            .field("training", &self.switch.is_enabled())
            .field("train_discriminator", &self.train_discriminator)
            .finish_non_exhaustive()
    }
}

fn load_or_build(config: &GanConfig, paths: &ModelPaths) -> Result<Gan, GanError> {
    if paths.discriminator.exists() && paths.network.exists() {
        match Gan::load(config.clone(), &paths.discriminator, &paths.network) {
            Ok(gan) => {
                info!(iteration = gan.iteration_count(), "已加载判别器与组合网络");
                return Ok(gan);
            }
            Err(e) => warn!(error = %e, "加载判别器与组合网络失败，尝试只加载判别器"),
        }
    }
    if paths.discriminator.exists() {
        match ComputationGraph::load(&paths.discriminator)
            .map_err(GanError::from)
            .and_then(|d| Gan::with_discriminator(config.clone(), d))
        {
            Ok(gan) => {
                info!("已加载判别器，组合网络为新建");
                return Ok(gan);
            }
            Err(e) => warn!(error = %e, "加载判别器失败，新建全部网络"),
        }
    }
    Gan::new(config.clone())
}
