//! 合成数据上的图像修复训练示例
//!
//! 随机生成若干张色块图，在每张图上挖一个矩形洞作为待修复区域，
//! 用无界面的学习控制器训练判别器与生成器，最后随机取一张做修复并保存结果。
//!
//! ## 运行方式
//! ```bash
//! RUST_LOG=info cargo run --release --example synthetic_inpainting [config.json] [输出目录]
//! ```
//! 不给配置文件时使用缩小的默认配置（128x128，生成器2级），输出目录默认为`target/synthetic_inpainting`。

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use only_inpaint::controller::{
    ControllerHandle, IterationObserver, LearningController, ModelPaths, TrainingSession,
    TrainingSwitch,
};
use only_inpaint::data::{MemoryDataSetIterator, TrainingExample};
use only_inpaint::gan::GanConfig;
use only_inpaint::nn::{PerformanceListener, ScoreIterationListener};
use only_inpaint::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 训练的总步数
const MAX_ITERATIONS: usize = 40;
const PICTURES: usize = 4;

/// 每张图：随机底色 + 一个随机色块；洞的位置随机
fn synthetic_example(
    config: &GanConfig,
    rng: &mut StdRng,
) -> Result<TrainingExample, Box<dyn std::error::Error>> {
    let (h, w) = (config.height, config.width);
    let background: [f32; 3] = rng.r#gen();
    let block: [f32; 3] = rng.r#gen();
    let (by, bx) = (rng.gen_range(0..h / 2), rng.gen_range(0..w / 2));
    let (hy, hx) = (rng.gen_range(0..h * 3 / 4), rng.gen_range(0..w * 3 / 4));

    let mut ground_truth = vec![0.0f32; 3 * h * w];
    let mut mask = vec![0.0f32; h * w];
    let mut input = vec![0.0f32; 3 * h * w];
    for y in 0..h {
        for x in 0..w {
            let in_block = (by..by + h / 2).contains(&y) && (bx..bx + w / 2).contains(&x);
            let in_hole = (hy..hy + h / 4).contains(&y) && (hx..hx + w / 4).contains(&x);
            mask[y * w + x] = if in_hole { 1.0 } else { 0.0 };
            for c in 0..3 {
                let idx = (c * h + y) * w + x;
                ground_truth[idx] = if in_block { block[c] } else { background[c] };
                input[idx] = if in_hole { 1.0 } else { ground_truth[idx] };
            }
        }
    }
    Ok(TrainingExample::new(
        Tensor::from_vec(input, &[1, 3, h, w])?,
        Tensor::from_vec(mask, &[1, 1, h, w])?,
        Tensor::from_vec(ground_truth, &[1, 3, h, w])?,
    )?)
}

/// 默认配置缩小到能在CPU上几分钟内跑完
fn demo_config() -> GanConfig {
    let mut config = GanConfig {
        height: 128,
        width: 128,
        iterations_per_picture: 5,
        ..GanConfig::default()
    };
    config.generator.stages = 2;
    config.discriminator.conv_widths = [16, 32, 32, 32, 16];
    config.discriminator.dense_widths = [64, 64];
    config
}

/// 输出进度，达到步数上限后关闭训练开关
struct Progress {
    switch: TrainingSwitch,
    started: Instant,
    scores: Arc<Mutex<Vec<f32>>>,
}

impl IterationObserver for Progress {
    fn iteration_done(&mut self, session: &TrainingSession, score: f32) {
        if let Ok(mut scores) = self.scores.lock() {
            scores.push(score);
        }
        info!(
            iteration = session.iteration(),
            epoch = session.epoch(),
            score,
            elapsed_secs = self.started.elapsed().as_secs_f32(),
            "训练进度"
        );
        if session.iteration() >= MAX_ITERATIONS {
            self.switch.disable();
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => GanConfig::from_json_file(path)?,
        None => demo_config(),
    };
    let out_dir = args
        .next()
        .map_or_else(|| PathBuf::from("target/synthetic_inpainting"), PathBuf::from);
    std::fs::create_dir_all(&out_dir)?;
    config.to_json_file(out_dir.join("config.json"))?;

    // ========== 数据准备 ==========
    let mut rng = StdRng::seed_from_u64(42);
    let examples = (0..PICTURES)
        .map(|_| synthetic_example(&config, &mut rng))
        .collect::<Result<Vec<_>, _>>()?;
    let iterator = MemoryDataSetIterator::new(examples, config.iterations_per_picture, 42)?;

    // ========== 控制器 ==========
    let mut controller =
        LearningController::new(config, ModelPaths::in_dir(&out_dir), Box::new(iterator))?;
    controller.gan_mut().set_listeners(
        vec![Box::new(ScoreIterationListener::new(10))],
        vec![Box::new(PerformanceListener::new(5))],
    );
    let scores = Arc::new(Mutex::new(Vec::new()));
    controller.add_observer(Box::new(Progress {
        switch: controller.switch(),
        started: Instant::now(),
        scores: Arc::clone(&scores),
    }));
    info!("组合网络结构:\n{}", controller.gan().network().summary());

    // ========== 训练（在工作线程中） ==========
    let handle = ControllerHandle::new(controller);
    handle.start();
    let worker = {
        let handle = handle.clone();
        std::thread::spawn(move || handle.run())
    };
    let ticks = worker.join().map_err(|_| "训练线程异常退出")??;
    info!(ticks, "训练结束");

    // ========== 保存与测试 ==========
    handle.save()?;
    let report = handle.test()?;
    let judged_real = report.result.is_real(0)?;
    info!(
        reconstruction_error = report.reconstruction_error,
        judged_real,
        "修复结果"
    );
    report.result.to_rgb_image(0)?.save(out_dir.join("reconstruction.png"))?;
    report
        .example
        .input()
        .select_batch(0)?
        .to_rgb_image()?
        .save(out_dir.join("input.png"))?;

    let scores = scores.lock().map_err(|_| "损失记录被污染")?;
    if let (Some(first), Some(last)) = (scores.first(), scores.last()) {
        println!("组合网络损失: {first:.4} -> {last:.4}（共{}步）", scores.len());
    }
    println!("结果已保存到 {}", out_dir.display());
    Ok(())
}
