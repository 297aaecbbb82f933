/*
 * @Description  : 生成器、判别器与组合网络的拓扑
 *
 * 生成器（以默认5级、256x256为例）：
 *   InputGENmerge0 = merge(Input, Mask)                       4 x 256 x 256
 *   编码 GENCNN1..GENCNN5：2x2/2 Same，通道×4、尺寸减半        → 4096 x 8 x 8
 *   解码 j = 1..4：GENRVj把上一级重塑为第(5-j)级编码的形状，GENmergej = merge(编码, 重塑)，
 *        GENCNN(5+j)：Same/1卷积回该级通道数
 *   输出 GENRV5重塑为4 x 256 x 256，GENmerge5 = merge(InputGENmerge0, GENRV5)，
 *        GENCNN10卷积到3通道，GENCNNLoss = 逐像素sigmoid + 交叉熵
 *
 * 判别器：DISmerge0 = merge(图像, 掩码) → DISCNN1 ... DISLoss（2类softmax + 负对数似然）
 *
 * 组合网络 = 生成器条目 + 判别器条目，其中DISmerge0改接(GENCNN10, Mask)且判别器层全部冻结；
 * 输出为[DISLoss, GENCNNLoss]。
 */

use super::config::{CHANNEL_MULTIPLIER, GanConfig, IMAGE_CHANNELS, MASK_CHANNELS};
use super::GanError;
use crate::nn::{
    Activation, CnnLossConf, ConvolutionConf, ConvolutionMode, DenseConf, InputType, LossFunction,
    LrnConf, OutputConf, PoolingType, SubsamplingConf, Topology, VertexConf,
};

/// 图像输入名
pub const INPUT: &str = "Input";
/// 掩码输入名
pub const MASK: &str = "Mask";
/// 生成器的输入拼接顶点
pub const INPUT_MERGE: &str = "InputGENmerge0";
/// 生成器的损失层
pub const GENERATOR_LOSS: &str = "GENCNNLoss";
/// 判别器的输入拼接顶点
pub const DISCRIMINATOR_MERGE: &str = "DISmerge0";
/// 判别器的输出层
pub const DISCRIMINATOR_LOSS: &str = "DISLoss";

fn conv_name(index: usize) -> String {
    format!("GENCNN{index}")
}

/// 生成器在损失层之前的最后一个卷积层（组合网络中判别器的图像输入），默认为`GENCNN10`
pub fn generator_output(config: &GanConfig) -> String {
    conv_name(2 * config.generator.stages)
}

fn add_inputs(topology: &mut Topology, config: &GanConfig) {
    topology
        .add_input(
            INPUT,
            InputType::convolutional(config.height, config.width, IMAGE_CHANNELS),
        )
        .add_input(
            MASK,
            InputType::convolutional(config.height, config.width, MASK_CHANNELS),
        );
}

/// 生成器的各条目追加到`topology`（不含图输入与图输出）
fn add_generator(topology: &mut Topology, config: &GanConfig) {
    let stages = config.generator.stages;
    let kernel = config.generator.kernel;
    let base = GanConfig::base_channels();
    let channels = |level: usize| base * CHANNEL_MULTIPLIER.pow(level as u32);
    let level_shape = |level: usize| {
        vec![
            channels(level),
            config.height >> level,
            config.width >> level,
        ]
    };

    topology.add_vertex(INPUT_MERGE, VertexConf::Merge, &[INPUT, MASK]);

    // 编码器
    for level in 1..=stages {
        let input = if level == 1 {
            INPUT_MERGE.to_string()
        } else {
            conv_name(level - 1)
        };
        topology.add_layer(
            &conv_name(level),
            ConvolutionConf::new(channels(level), kernel)
                .stride((2, 2))
                .mode(ConvolutionMode::Same)
                .activation(Activation::LeakyRelu),
            &[&input],
        );
    }

    // 解码器：从最深的前一级回到第1级
    let mut previous = conv_name(stages);
    for j in 1..stages {
        let level = stages - j;
        let reshape = format!("GENRV{j}");
        let merge = format!("GENmerge{j}");
        let conv = conv_name(stages + j);
        topology
            .add_vertex(
                &reshape,
                VertexConf::Reshape {
                    shape: level_shape(level),
                },
                &[&previous],
            )
            .add_vertex(&merge, VertexConf::Merge, &[&conv_name(level), &reshape])
            .add_layer(
                &conv,
                ConvolutionConf::new(channels(level), kernel)
                    .mode(ConvolutionMode::Same)
                    .activation(Activation::LeakyRelu),
                &[&merge],
            );
        previous = conv;
    }

    // 输出
    let reshape = format!("GENRV{stages}");
    let merge = format!("GENmerge{stages}");
    let output = generator_output(config);
    topology
        .add_vertex(
            &reshape,
            VertexConf::Reshape {
                shape: level_shape(0),
            },
            &[&previous],
        )
        .add_vertex(&merge, VertexConf::Merge, &[INPUT_MERGE, &reshape])
        .add_layer(
            &output,
            ConvolutionConf::new(IMAGE_CHANNELS, config.generator.output_kernel)
                .mode(ConvolutionMode::Same)
                .activation(Activation::LeakyRelu),
            &[&merge],
        )
        .add_layer(
            GENERATOR_LOSS,
            CnnLossConf::new(LossFunction::Xent).activation(Activation::Sigmoid),
            &[&output],
        );
}

/// 判别器的各条目追加到`topology`，`DISmerge0`接(`Input`, `Mask`)
fn add_discriminator(topology: &mut Topology, config: &GanConfig) {
    let d = &config.discriminator;
    let [w1, w2, w3, w4, w5] = d.conv_widths;
    let bias = d.non_zero_bias;
    let max_pool = |kernel, stride| SubsamplingConf::new(PoolingType::Max, kernel, stride);

    topology
        .add_vertex(DISCRIMINATOR_MERGE, VertexConf::Merge, &[INPUT, MASK])
        .add_layer(
            "DISCNN1",
            ConvolutionConf::new(w1, (11, 11))
                .stride((4, 4))
                .mode(ConvolutionMode::Truncate),
            &[DISCRIMINATOR_MERGE],
        )
        .add_layer("DISLRN1", LrnConf::default(), &["DISCNN1"])
        .add_layer("DISSL1", max_pool((3, 3), (2, 2)).padding((1, 1)), &["DISLRN1"])
        .add_layer(
            "DISCNN2",
            ConvolutionConf::new(w2, (5, 5))
                .padding((2, 2))
                .mode(ConvolutionMode::Truncate)
                .bias_init(bias),
            &["DISSL1"],
        )
        .add_layer("DISSL2", max_pool((3, 3), (2, 2)), &["DISCNN2"])
        .add_layer("DISLRN2", LrnConf::default(), &["DISSL2"])
        .add_layer(
            "DISCNN3",
            ConvolutionConf::new(w3, (3, 3)).mode(ConvolutionMode::Same),
            &["DISLRN2"],
        )
        .add_layer(
            "DISCNN4",
            ConvolutionConf::new(w4, (3, 3)).bias_init(bias),
            &["DISCNN3"],
        )
        .add_layer(
            "DISCNN5",
            ConvolutionConf::new(w5, (3, 3)).bias_init(bias),
            &["DISCNN4"],
        )
        .add_layer("DISSL3", max_pool((3, 3), (2, 2)), &["DISCNN5"])
        .add_layer(
            "DISFFN1",
            DenseConf::new(d.dense_widths[0])
                .weight_init(d.dense_weight_init)
                .bias_init(bias),
            &["DISSL3"],
        )
        .add_layer(
            "DISFFN2",
            DenseConf::new(d.dense_widths[1])
                .weight_init(d.dense_weight_init)
                .bias_init(bias)
                .dropout(d.dropout),
            &["DISFFN1"],
        )
        .add_layer(
            DISCRIMINATOR_LOSS,
            OutputConf::new(2, LossFunction::NegativeLogLikelihood)
                .activation(Activation::Softmax)
                .weight_init(d.dense_weight_init)
                .bias_init(d.output_bias),
            &["DISFFN2"],
        );
}

/// 独立的生成器：输入(Input, Mask)，输出GENCNNLoss
pub fn generator_topology(config: &GanConfig) -> Topology {
    let mut topology = Topology::new();
    add_inputs(&mut topology, config);
    add_generator(&mut topology, config);
    topology.set_outputs(&[GENERATOR_LOSS]);
    topology
}

/// 独立的判别器：输入(Input, Mask)，输出DISLoss
pub fn discriminator_topology(config: &GanConfig) -> Topology {
    let mut topology = Topology::new();
    add_inputs(&mut topology, config);
    add_discriminator(&mut topology, config);
    topology.set_outputs(&[DISCRIMINATOR_LOSS]);
    topology
}

/// 组合网络：生成器 + 冻结的判别器，输出[DISLoss, GENCNNLoss]
pub fn combined_topology(config: &GanConfig) -> Result<Topology, GanError> {
    let mut discriminator = Topology::new();
    add_discriminator(&mut discriminator, config);
    discriminator.set_entry_inputs(DISCRIMINATOR_MERGE, &[&generator_output(config), MASK])?;
    discriminator.freeze_all();

    let mut topology = Topology::new();
    add_inputs(&mut topology, config);
    add_generator(&mut topology, config);
    topology
        .extend_entries(discriminator.entries().iter().cloned())
        .set_outputs(&[DISCRIMINATOR_LOSS, GENERATOR_LOSS]);
    Ok(topology)
}
