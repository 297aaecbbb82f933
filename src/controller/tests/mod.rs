
use std::path::Path;
use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{IterationObserver, LearningController, ModelPaths, TrainingSession, TrainingSwitch};
use crate::data::{MemoryDataSetIterator, TrainingExample};
use crate::gan::GanConfig;
use crate::tensor::Tensor;

fn small_config() -> GanConfig {
    let mut config = GanConfig {
        height: 128,
        width: 128,
        iterations_per_picture: 2,
        ..GanConfig::default()
    };
    config.generator.stages = 2;
    config.discriminator.conv_widths = [4, 4, 4, 4, 4];
    config.discriminator.dense_widths = [8, 8];
    config
}

fn example(config: &GanConfig, seed: u64) -> TrainingExample {
    let mut rng = StdRng::seed_from_u64(seed);
    let (h, w) = (config.height, config.width);
    let ground_truth = Tensor::uniform(0.0, 1.0, &[1, 3, h, w], &mut rng);
    let mask = Tensor::zeros(&[1, 1, h, w]);
    TrainingExample::new(ground_truth.clone(), mask, ground_truth).unwrap()
}

/// 2个样本、每张图2次：一轮2步
fn controller_in(dir: &Path) -> LearningController {
    let config = small_config();
    let examples = (0..2).map(|seed| example(&config, seed)).collect();
    let iterator = MemoryDataSetIterator::new(examples, config.iterations_per_picture, 7).unwrap();
    LearningController::new(config, ModelPaths::in_dir(dir), Box::new(iterator)).unwrap()
}

/// 记录每次回调的迭代次数，达到`stop_at`时关闭开关
struct StopAfter {
    stop_at: usize,
    switch: TrainingSwitch,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl IterationObserver for StopAfter {
    fn iteration_done(&mut self, session: &TrainingSession, score: f32) {
        assert!(score.is_finite());
        self.seen.lock().unwrap().push(session.iteration());
        if session.iteration() >= self.stop_at {
            self.switch.disable();
        }
    }
}
