/*
 * @Description  : 基于GAN的图像修复：生成器/判别器/组合网络的拓扑、标签约定、参数同步与训练编排
 */

mod config;
mod error;
mod labels;
mod sync;
mod topology;
mod trainer;

pub use config::{
    CHANNEL_MULTIPLIER, DiscriminatorConfig, GanConfig, GeneratorConfig, IMAGE_CHANNELS,
    LEARNING_BETA1, LEARNING_RATE, MASK_CHANNELS,
};
pub use error::GanError;
pub use labels::LabelPair;
pub use sync::ParameterSyncTable;
pub use topology::{
    DISCRIMINATOR_LOSS, DISCRIMINATOR_MERGE, GENERATOR_LOSS, INPUT, INPUT_MERGE, MASK,
    combined_topology, discriminator_topology, generator_output, generator_topology,
};
pub use trainer::{
    COMBINED_NAME, DISCRIMINATOR_NAME, GENERATOR_NAME, Gan, NetResult, build_generator,
};

#[cfg(test)]
mod tests;
