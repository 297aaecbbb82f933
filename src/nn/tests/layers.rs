use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{build, image_input, sgd_config};
use crate::nn::nodes::{DenseLayer, ForwardContext, TraitNode, output_extent};
use crate::nn::{
    Activation, ConvolutionConf, ConvolutionMode, DenseConf, InputType, LossFunction, LrnConf,
    NetworkConfig, OutputConf, PoolingType, SubsamplingConf, Topology, VertexConf, WeightInit,
};
use crate::tensor::Tensor;

fn arange(n: usize, shape: &[usize]) -> Tensor {
    Tensor::new(&(0..n).map(|v| v as f32).collect::<Vec<_>>(), shape)
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓输出尺寸↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_output_extent_truncate() {
    assert_eq!(output_extent(128, 11, 4, 0, ConvolutionMode::Truncate), Some((30, 0, 0)));
    assert_eq!(output_extent(30, 5, 1, 2, ConvolutionMode::Truncate), Some((30, 2, 2)));
    assert_eq!(output_extent(5, 2, 2, 0, ConvolutionMode::Truncate), Some((2, 0, 0)));
    assert_eq!(output_extent(2, 3, 1, 0, ConvolutionMode::Truncate), None);
}

#[test]
fn test_output_extent_same() {
    // out = ceil(H / s)，补零前少后多
    assert_eq!(output_extent(128, 2, 2, 0, ConvolutionMode::Same), Some((64, 0, 0)));
    assert_eq!(output_extent(5, 2, 2, 0, ConvolutionMode::Same), Some((3, 0, 1)));
    assert_eq!(output_extent(7, 3, 2, 0, ConvolutionMode::Same), Some((4, 1, 1)));
    assert_eq!(output_extent(8, 3, 1, 0, ConvolutionMode::Same), Some((8, 1, 1)));
    assert_eq!(output_extent(0, 3, 1, 0, ConvolutionMode::Same), None);
    assert_eq!(output_extent(8, 3, 0, 0, ConvolutionMode::Same), None);
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑输出尺寸↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓卷积层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_convolution_known_values() {
    let mut topology = image_input(3, 3, 1);
    topology
        .add_layer(
            "conv",
            ConvolutionConf::new(1, (2, 2)).activation(Activation::Identity),
            &["in"],
        )
        .set_outputs(&["conv"]);
    let mut graph = build(topology, NetworkConfig::default());
    graph
        .set_layer_params(0, &[Tensor::ones(&[1, 1, 2, 2]), Tensor::new(&[0.5], &[1])])
        .unwrap();

    let input = Tensor::new(&[1., 2., 3., 4., 5., 6., 7., 8., 9.], &[1, 1, 3, 3]);
    let output = graph.output_single(&[&input]).unwrap();
    assert_eq!(output, Tensor::new(&[12.5, 16.5, 24.5, 28.5], &[1, 1, 2, 2]));
}

#[test]
fn test_convolution_same_mode_pads_after() {
    // 5x5，核2x2，步长2：输出3x3，右/下各补1行（列）零
    let mut topology = image_input(5, 5, 1);
    topology
        .add_layer(
            "conv",
            ConvolutionConf::new(1, (2, 2))
                .stride((2, 2))
                .mode(ConvolutionMode::Same)
                .activation(Activation::Identity),
            &["in"],
        )
        .set_outputs(&["conv"]);
    let mut graph = build(topology, NetworkConfig::default());
    graph
        .set_layer_params(0, &[Tensor::ones(&[1, 1, 2, 2]), Tensor::zeros(&[1])])
        .unwrap();

    let output = graph.output_single(&[&Tensor::ones(&[2, 1, 5, 5])]).unwrap();
    assert_eq!(output.shape(), &[2, 1, 3, 3]);
    let expected = [4., 4., 2., 4., 4., 2., 2., 2., 1.];
    assert_eq!(&output.data_as_slice()[..9], &expected);
    assert_eq!(&output.data_as_slice()[9..], &expected);
}

#[test]
fn test_convolution_leaky_relu() {
    let mut topology = image_input(1, 2, 1);
    topology
        .add_layer("conv", ConvolutionConf::new(1, (1, 1)), &["in"])
        .set_outputs(&["conv"]);
    let mut graph = build(topology, NetworkConfig::default());
    graph
        .set_layer_params(0, &[Tensor::ones(&[1, 1, 1, 1]), Tensor::zeros(&[1])])
        .unwrap();
    let output = graph
        .output_single(&[&Tensor::new(&[-2., 3.], &[1, 1, 1, 2])])
        .unwrap();
    assert_abs_diff_eq!(output.data_as_slice()[0], -0.02, epsilon = 1e-6);
    assert_abs_diff_eq!(output.data_as_slice()[1], 3.0, epsilon = 1e-6);
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑卷积层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓池化层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
fn pooled(pooling: PoolingType, conf: SubsamplingConf, h: usize, w: usize, input: &Tensor) -> Tensor {
    let mut topology = image_input(h, w, 1);
    topology
        .add_layer("pool", SubsamplingConf { pooling, ..conf }, &["in"])
        .set_outputs(&["pool"]);
    build(topology, NetworkConfig::default())
        .output_single(&[input])
        .unwrap()
}

#[test]
fn test_pooling_without_padding() {
    let conf = SubsamplingConf::new(PoolingType::Max, (2, 2), (2, 2));
    let input = arange(16, &[1, 1, 4, 4]);
    assert_eq!(
        pooled(PoolingType::Max, conf.clone(), 4, 4, &input),
        Tensor::new(&[5., 7., 13., 15.], &[1, 1, 2, 2])
    );
    assert_eq!(
        pooled(PoolingType::Avg, conf, 4, 4, &input),
        Tensor::new(&[2.5, 4.5, 10.5, 12.5], &[1, 1, 2, 2])
    );
}

#[test]
fn test_pooling_padding_cells_are_ignored() {
    let conf = SubsamplingConf::new(PoolingType::Max, (3, 3), (2, 2)).padding((1, 1));
    let input = Tensor::new(&[1., 2., 3., 4., 5., 6., 7., 8., 9.], &[1, 1, 3, 3]);
    assert_eq!(
        pooled(PoolingType::Max, conf.clone(), 3, 3, &input),
        Tensor::new(&[5., 6., 8., 9.], &[1, 1, 2, 2])
    );
    // 平均池化只除以窗口内的有效格数
    assert_eq!(
        pooled(PoolingType::Avg, conf, 3, 3, &input),
        Tensor::new(&[3., 4., 6., 7.], &[1, 1, 2, 2])
    );
}

#[test]
fn test_pooling_padding_must_be_smaller_than_kernel() {
    let mut topology = image_input(4, 4, 1);
    topology
        .add_layer(
            "pool",
            SubsamplingConf::new(PoolingType::Max, (2, 2), (2, 2)).padding((2, 2)),
            &["in"],
        )
        .set_outputs(&["pool"]);
    assert!(crate::nn::ComputationGraph::new("pool", topology, NetworkConfig::default()).is_err());
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑池化层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

#[test]
fn test_local_response_normalization() {
    let conf = LrnConf::default();
    let mut topology = image_input(1, 1, 3);
    topology
        .add_layer("lrn", conf.clone(), &["in"])
        .set_outputs(&["lrn"]);
    let mut graph = build(topology, NetworkConfig::default());
    let input = Tensor::new(&[1., 2., 3.], &[1, 3, 1, 1]);
    let output = graph.output_single(&[&input]).unwrap();

    // n=5时每个通道的窗口都覆盖全部3个通道
    let sum = 1. + 4. + 9.;
    let scale = (conf.k + conf.alpha * sum).powf(-conf.beta);
    for (got, x) in output.data_as_slice().iter().zip([1., 2., 3.]) {
        assert_abs_diff_eq!(*got, x * scale, epsilon = 1e-5);
    }
}

#[test]
fn test_lrn_window_is_centered() {
    let conf = LrnConf {
        n: 3,
        ..LrnConf::default()
    };
    let mut topology = image_input(1, 1, 4);
    topology
        .add_layer("lrn", conf.clone(), &["in"])
        .set_outputs(&["lrn"]);
    let mut graph = build(topology, NetworkConfig::default());
    let values = [10., 20., 30., 40.];
    let output = graph
        .output_single(&[&Tensor::new(&values, &[1, 4, 1, 1])])
        .unwrap();

    // 通道0的窗口为{0, 1}，通道3的窗口为{2, 3}
    let expect = |x: f32, sum: f32| x * (conf.k + conf.alpha * sum).powf(-conf.beta);
    let got = output.data_as_slice();
    assert_abs_diff_eq!(got[0], expect(10., 100. + 400.), epsilon = 1e-4);
    assert_abs_diff_eq!(got[1], expect(20., 100. + 400. + 900.), epsilon = 1e-4);
    assert_abs_diff_eq!(got[3], expect(40., 900. + 1600.), epsilon = 1e-4);
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓全连接层↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_dense_flattens_convolutional_input() {
    let mut topology = image_input(2, 2, 2);
    topology
        .add_layer(
            "dense",
            DenseConf::new(3)
                .activation(Activation::Identity)
                .weight_init(WeightInit::Zero)
                .bias_init(0.25),
            &["in"],
        )
        .set_outputs(&["dense"]);
    let mut graph = build(topology, NetworkConfig::default());
    assert_eq!(graph.layer_params(0).unwrap()[0].shape(), &[8, 3]);
    let output = graph.output_single(&[&Tensor::ones(&[2, 2, 2, 2])]).unwrap();
    assert_eq!(output, Tensor::full(0.25, &[2, 3]));
}

#[test]
fn test_dropout_is_inactive_at_inference() {
    let mut topology = Topology::new();
    topology
        .add_input("in", InputType::FeedForward { size: 100 })
        .add_layer(
            "dense",
            DenseConf::new(4).activation(Activation::Identity).dropout(0.5),
            &["in"],
        )
        .set_outputs(&["dense"]);
    let mut graph = build(topology, sgd_config(0.1));
    graph
        .set_layer_params(0, &[Tensor::ones(&[100, 4]), Tensor::zeros(&[4])])
        .unwrap();
    let input = Tensor::ones(&[1, 100]);
    let first = graph.output_single(&[&input]).unwrap();
    assert_eq!(first, Tensor::full(100., &[1, 4]));
    assert_eq!(graph.output_single(&[&input]).unwrap(), first);
}

#[test]
fn test_dropout_scales_retained_inputs_when_training() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut layer = DenseLayer::with_parts(
        &[1000],
        2,
        Activation::Identity,
        Some(0.5),
        WeightInit::Zero,
        0.0,
        &mut rng,
    )
    .unwrap();
    layer.params_mut()[0] = Tensor::ones(&[1000, 2]);
    let input = Tensor::ones(&[1, 1000]);
    let mut ctx = ForwardContext {
        training: true,
        rng: &mut rng,
    };
    let output = layer.forward(&[&input], &mut ctx).unwrap();
    let values = output.data_as_slice();
    // 每个保留的输入被放大为2，两列看到的是同一个掩码
    assert_eq!(values[0], values[1]);
    let kept = values[0] / 2.0;
    assert_eq!(kept.fract(), 0.0);
    assert!((300.0..700.0).contains(&kept), "保留了{kept}个输入");
}
#[test]
fn test_frozen_dropout_layer_fits_in_inference_mode() {
    let mut topology = Topology::new();
    topology
        .add_input("in", InputType::FeedForward { size: 100 })
        .add_layer(
            "drop",
            DenseConf::new(4).activation(Activation::Identity).dropout(0.5),
            &["in"],
        )
        .add_layer(
            "out",
            OutputConf::new(1, LossFunction::Mse).activation(Activation::Identity),
            &["drop"],
        )
        .set_outputs(&["out"]);
    let input = Tensor::ones(&[1, 100]);
    let label = Tensor::zeros(&[1, 1]);

    // 学习率为0：参数不变，损失只随dropout掩码变化
    let mut trainable = build(topology.clone(), sgd_config(0.0));
    let first = trainable.fit_tensors(&[&input], &[&label]).unwrap();
    let second = trainable.fit_tensors(&[&input], &[&label]).unwrap();
    assert_ne!(first, second);

    let mut frozen = build(topology, sgd_config(0.0));
    frozen.set_layer_trainable(0, false).unwrap();
    let first = frozen.fit_tensors(&[&input], &[&label]).unwrap();
    assert_eq!(frozen.fit_tensors(&[&input], &[&label]).unwrap(), first);
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑全连接层↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

#[test]
fn test_merge_and_reshape_vertices() {
    let mut topology = Topology::new();
    topology
        .add_input("a", InputType::convolutional(2, 2, 1))
        .add_input("b", InputType::convolutional(2, 2, 2))
        .add_vertex("merge", VertexConf::Merge, &["a", "b"])
        .add_vertex("flat", VertexConf::Reshape { shape: vec![12] }, &["merge"])
        .set_outputs(&["merge", "flat"]);
    let mut graph = build(topology, NetworkConfig::default());
    assert_eq!(graph.num_layers(), 0);

    let a = Tensor::full(1., &[1, 1, 2, 2]);
    let b = Tensor::full(2., &[1, 2, 2, 2]);
    let outputs = graph.output(&[&a, &b]).unwrap();
    assert_eq!(outputs[0].shape(), &[1, 3, 2, 2]);
    assert_eq!(
        outputs[1],
        Tensor::new(&[1., 1., 1., 1., 2., 2., 2., 2., 2., 2., 2., 2.], &[1, 12])
    );
}

#[test]
fn test_output_checks_feature_count_and_shape() {
    let mut topology = image_input(2, 2, 1);
    topology
        .add_layer("conv", ConvolutionConf::new(1, (1, 1)), &["in"])
        .set_outputs(&["conv"]);
    let mut graph = build(topology, NetworkConfig::default());
    let x = Tensor::ones(&[1, 1, 2, 2]);
    assert!(matches!(
        graph.output(&[&x, &x]),
        Err(crate::nn::GraphError::InvalidOperation(_))
    ));
    assert!(matches!(
        graph.output(&[&Tensor::ones(&[1, 1, 3, 3])]),
        Err(crate::nn::GraphError::ShapeMismatch { .. })
    ));
}
