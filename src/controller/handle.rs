/*
 * @Description  : 控制器的线程安全句柄。单次操作以`try_lock`获取控制器：
 *                 上一个操作尚未结束时立即返回`Busy`，不会排队等待；
 *                 `run`循环则每个tick阻塞等锁，tick之间释放锁供其它线程读取状态。
 *                 训练开启期间拒绝加载、保存与测试。
 */

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use super::{ControllerError, LearningController, TestReport, TrainingSwitch};

#[derive(Debug, Clone)]
pub struct ControllerHandle {
    inner: Arc<Mutex<LearningController>>,
    switch: TrainingSwitch,
}

impl ControllerHandle {
    pub fn new(controller: LearningController) -> Self {
        let switch = controller.switch();
        Self {
            inner: Arc::new(Mutex::new(controller)),
            switch,
        }
    }

    pub fn switch(&self) -> TrainingSwitch {
        self.switch.clone()
    }

    /// 打开训练开关
    pub fn start(&self) {
        self.switch.enable();
    }

    /// 关闭训练开关，正在执行的tick完成后停止
    pub fn stop(&self) {
        self.switch.disable();
    }

    pub fn is_training(&self) -> bool {
        self.switch.is_enabled()
    }

    pub fn train_tick(&self) -> Result<bool, ControllerError> {
        Ok(self.lock()?.train_tick()?)
    }

    /// 开关开启期间反复执行tick，返回执行的tick数。出错时关闭开关并返回错误
    pub fn run(&self) -> Result<usize, ControllerError> {
        let mut ticks = 0;
        loop {
            let ticked = self
                .inner
                .lock()
                .map_err(|_| ControllerError::Poisoned)
                .and_then(|mut controller| Ok(controller.train_tick()?));
            match ticked {
                Ok(true) => ticks += 1,
                Ok(false) => return Ok(ticks),
                Err(e) => {
                    self.switch.disable();
                    return Err(e);
                }
            }
        }
    }

    pub fn load(&self) -> Result<(), ControllerError> {
        self.idle("load")?;
        Ok(self.lock()?.load()?)
    }

    pub fn save(&self) -> Result<(), ControllerError> {
        self.idle("save")?;
        Ok(self.lock()?.save()?)
    }

    pub fn test(&self) -> Result<TestReport, ControllerError> {
        self.idle("test")?;
        Ok(self.lock()?.test()?)
    }

    /// 在持锁状态下访问控制器
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut LearningController) -> R,
    ) -> Result<R, ControllerError> {
        Ok(f(&mut *self.lock()?))
    }

    fn idle(&self, action: &'static str) -> Result<(), ControllerError> {
        if self.switch.is_enabled() {
            return Err(ControllerError::TrainingInProgress(action));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, LearningController>, ControllerError> {
        self.inner.try_lock().map_err(|e| match e {
            TryLockError::WouldBlock => ControllerError::Busy,
            TryLockError::Poisoned(_) => ControllerError::Poisoned,
        })
    }
}
