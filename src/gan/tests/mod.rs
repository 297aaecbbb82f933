mod sync;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::TrainingExample;
use crate::gan::GanConfig;
use crate::tensor::Tensor;

/// 判别器能接受的最小规格附近：128x128、生成器2级、各层很窄
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

/// 像素值在[0, 1]内的随机样本，掩码为0/1
fn random_example(config: &GanConfig, seed: u64) -> TrainingExample {
    let mut rng = StdRng::seed_from_u64(seed);
    let (h, w) = (config.height, config.width);
    let ground_truth = Tensor::uniform(0.0, 1.0, &[1, 3, h, w], &mut rng);
    let mask = Tensor::uniform(0.0, 1.0, &[1, 1, h, w], &mut rng)
        .map(|v| if v < 0.2 { 1.0 } else { 0.0 });
    let input = ground_truth.zip_map(
        &Tensor::concat_channels(&[&mask, &mask, &mask]).unwrap(),
        |v, m| if m > 0.5 { 1.0 } else { v },
    );
    TrainingExample::new(input, mask, ground_truth).unwrap()
}
