use approx::assert_abs_diff_eq;

use super::{build, image_input, sgd_config, small_classifier};
use crate::assert_err;
use crate::data::MultiDataSet;
use crate::nn::{
    Activation, CnnLossConf, ConvolutionConf, GradientNormalization, GraphError, InputType,
    LossFunction, NetworkConfig, OutputConf, Topology, Updater, WeightInit, WorkspaceMode,
};
use crate::tensor::Tensor;

/// in(2) -> out(2, softmax + NLL)，参数全零
fn zero_output_layer(config: NetworkConfig) -> crate::nn::ComputationGraph {
    let mut topology = Topology::new();
    topology
        .add_input("in", InputType::FeedForward { size: 2 })
        .add_layer(
            "out",
            OutputConf::new(2, LossFunction::NegativeLogLikelihood).weight_init(WeightInit::Zero),
            &["in"],
        )
        .set_outputs(&["out"]);
    build(topology, config)
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓损失值↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_softmax_nll_score() {
    let label = Tensor::new(&[0., 1.], &[1, 2]);
    let mut graph = zero_output_layer(sgd_config(0.0));
    let score = graph
        .fit_tensors(&[&Tensor::ones(&[1, 2])], &[&label])
        .unwrap();
    assert_abs_diff_eq!(score, 2f32.ln(), epsilon = 1e-6);
    assert_eq!(graph.score(), score);
    assert_eq!(graph.iteration_count(), 1);
}

#[test]
fn test_mini_batch_averages_the_score() {
    let labels = Tensor::new(&[0., 1., 1., 0.], &[2, 2]);
    let features = Tensor::zeros(&[2, 2]);

    let mut averaged = zero_output_layer(sgd_config(0.0));
    let score = averaged.fit_tensors(&[&features], &[&labels]).unwrap();
    assert_abs_diff_eq!(score, 2f32.ln(), epsilon = 1e-6);

    let mut summed = zero_output_layer(NetworkConfig {
        mini_batch: false,
        ..sgd_config(0.0)
    });
    let score = summed.fit_tensors(&[&features], &[&labels]).unwrap();
    assert_abs_diff_eq!(score, 2.0 * 2f32.ln(), epsilon = 1e-6);
}

#[test]
fn test_cnn_loss_scores() {
    let input = Tensor::new(&[1., 2., 3., 4.], &[1, 1, 2, 2]);

    let mut mse = image_input(2, 2, 1);
    mse.add_layer(
        "loss",
        CnnLossConf::new(LossFunction::Mse).activation(Activation::Identity),
        &["in"],
    )
    .set_outputs(&["loss"]);
    let mut graph = build(mse, NetworkConfig::default());
    let score = graph
        .fit_tensors(&[&input], &[&Tensor::zeros(&[1, 1, 2, 2])])
        .unwrap();
    // 按特征数取平均
    assert_abs_diff_eq!(score, 7.5, epsilon = 1e-5);

    let mut xent = image_input(2, 2, 1);
    xent.add_layer("loss", CnnLossConf::new(LossFunction::Xent), &["in"])
        .set_outputs(&["loss"]);
    let mut graph = build(xent, NetworkConfig::default());
    let score = graph
        .fit_tensors(&[&Tensor::zeros(&[1, 1, 2, 2])], &[&Tensor::ones(&[1, 1, 2, 2])])
        .unwrap();
    assert_abs_diff_eq!(score, 4.0 * 2f32.ln(), epsilon = 1e-5);

    // 推理时损失层输出激活后的值
    let output = graph.output_single(&[&Tensor::zeros(&[1, 1, 2, 2])]).unwrap();
    assert_eq!(output, Tensor::full(0.5, &[1, 1, 2, 2]));
}

#[test]
fn test_l2_adds_weight_penalty_to_score() {
    let mut graph = zero_output_layer(NetworkConfig {
        l2: 0.1,
        ..sgd_config(0.0)
    });
    graph
        .set_layer_params(0, &[Tensor::ones(&[2, 2]), Tensor::zeros(&[2])])
        .unwrap();
    let score = graph
        .fit_tensors(&[&Tensor::zeros(&[1, 2])], &[&Tensor::new(&[0., 1.], &[1, 2])])
        .unwrap();
    // ln2 + 0.5 * 0.1 * ‖W‖²
    assert_abs_diff_eq!(score, 2f32.ln() + 0.2, epsilon = 1e-5);
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑损失值↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓参数更新↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_training_reduces_loss() {
    let mut graph = build(small_classifier(), sgd_config(0.5));
    let features = Tensor::new(&[1., 0., -1., 0.5, 0.5, 0.5], &[2, 3]);
    let labels = Tensor::new(&[1., 0., 0., 1.], &[2, 2]);
    let data = MultiDataSet::new(vec![features], vec![labels]);

    let first = graph.fit(&data).unwrap();
    let mut last = first;
    for _ in 0..100 {
        last = graph.fit(&data).unwrap();
    }
    assert!(last < first * 0.5, "损失未下降：{first} -> {last}");
    assert_eq!(graph.iteration_count(), 101);
}

#[test]
fn test_adam_training_reduces_loss() {
    let config = NetworkConfig {
        updater: Updater::adam(0.05),
        ..sgd_config(0.0)
    };
    let mut graph = build(small_classifier(), config);
    let features = Tensor::new(&[1., 0., -1.], &[1, 3]);
    let labels = Tensor::new(&[0., 1.], &[1, 2]);
    let first = graph.fit_tensors(&[&features], &[&labels]).unwrap();
    let mut last = first;
    for _ in 0..30 {
        last = graph.fit_tensors(&[&features], &[&labels]).unwrap();
    }
    assert!(last < first, "损失未下降：{first} -> {last}");
}

#[test]
fn test_bias_updater_is_used_for_biases() {
    let mut graph = zero_output_layer(NetworkConfig {
        bias_updater: Some(Updater::sgd(1.0)),
        ..sgd_config(0.0)
    });
    graph
        .fit_tensors(&[&Tensor::ones(&[1, 2])], &[&Tensor::new(&[0., 1.], &[1, 2])])
        .unwrap();
    let params = graph.layer_params(0).unwrap();
    // 权重学习率为0保持不变；偏置梯度为a - y = [0.5, -0.5]
    assert_eq!(params[0], Tensor::zeros(&[2, 2]));
    assert_abs_diff_eq!(params[1].data_as_slice()[0], -0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(params[1].data_as_slice()[1], 0.5, epsilon = 1e-6);
}

#[test]
fn test_gradient_clipping_limits_the_step() {
    let mut graph = zero_output_layer(NetworkConfig {
        gradient_normalization: GradientNormalization::ClipElementWiseAbsoluteValue,
        gradient_normalization_threshold: 0.1,
        ..sgd_config(1.0)
    });
    graph
        .fit_tensors(&[&Tensor::ones(&[1, 2])], &[&Tensor::new(&[0., 1.], &[1, 2])])
        .unwrap();
    for param in graph.layer_params(0).unwrap() {
        for &v in param.data_as_slice() {
            assert_abs_diff_eq!(v.abs(), 0.1, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_frozen_layer_keeps_its_params() {
    let mut graph = build(small_classifier(), sgd_config(0.5));
    graph.set_layer_trainable(0, false).unwrap();
    let hidden = graph.layer_params(0).unwrap().to_vec();
    let out = graph.layer_params(1).unwrap().to_vec();

    let features = Tensor::new(&[1., 0., -1.], &[1, 3]);
    let labels = Tensor::new(&[0., 1.], &[1, 2]);
    for _ in 0..3 {
        graph.fit_tensors(&[&features], &[&labels]).unwrap();
    }
    assert_eq!(graph.layer_params(0).unwrap(), hidden.as_slice());
    assert_ne!(graph.layer_params(1).unwrap(), out.as_slice());
}

#[test]
fn test_frozen_tail_still_passes_gradients_upstream() {
    // conv(可训练) -> output(冻结)：梯度须穿过冻结的输出层到达卷积层
    let mut topology = image_input(2, 2, 1);
    topology
        .add_layer("conv", ConvolutionConf::new(2, (1, 1)), &["in"])
        .add_layer(
            "out",
            OutputConf::new(2, LossFunction::NegativeLogLikelihood),
            &["conv"],
        )
        .set_outputs(&["out"]);
    topology.set_trainable("out", false).unwrap();
    let mut graph = build(topology, sgd_config(0.5));
    assert!(!graph.is_layer_trainable(1).unwrap());

    let conv = graph.layer_params(0).unwrap().to_vec();
    let out = graph.layer_params(1).unwrap().to_vec();
    let features = Tensor::new(&[1., 2., 3., 4.], &[1, 1, 2, 2]);
    graph
        .fit_tensors(&[&features], &[&Tensor::new(&[1., 0.], &[1, 2])])
        .unwrap();
    assert_ne!(graph.layer_params(0).unwrap(), conv.as_slice());
    assert_eq!(graph.layer_params(1).unwrap(), out.as_slice());
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑参数更新↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

#[test]
fn test_fit_argument_errors() {
    let mut graph = build(small_classifier(), sgd_config(0.1));
    let features = Tensor::ones(&[1, 3]);
    let labels = Tensor::new(&[0., 1.], &[1, 2]);
    assert_err!(
        graph.fit_tensors(&[&features], &[&labels, &labels]),
        GraphError::InvalidOperation(_)
    );
    assert_err!(
        graph.fit_tensors(&[&features], &[&Tensor::ones(&[1, 3])]),
        GraphError::ShapeMismatch { .. }
    );
    assert_eq!(graph.iteration_count(), 0);

    let mut topology = image_input(2, 2, 1);
    topology
        .add_layer("conv", ConvolutionConf::new(1, (1, 1)), &["in"])
        .set_outputs(&["conv"]);
    let mut not_loss = build(topology, NetworkConfig::default());
    assert_err!(
        not_loss.fit_tensors(&[&Tensor::ones(&[1, 1, 2, 2])], &[&Tensor::ones(&[1, 1, 2, 2])]),
        GraphError::InvalidOperation(msg) if msg.contains("不是损失层")
    );
}

#[test]
fn test_workspace_mode_does_not_change_results() {
    let features = Tensor::new(&[1., 0., -1.], &[1, 3]);
    let labels = Tensor::new(&[0., 1.], &[1, 2]);
    let mut released = build(small_classifier(), sgd_config(0.5));
    let mut kept = build(
        small_classifier(),
        NetworkConfig {
            training_workspace_mode: WorkspaceMode::None,
            inference_workspace_mode: WorkspaceMode::None,
            ..sgd_config(0.5)
        },
    );
    for _ in 0..3 {
        let a = released.fit_tensors(&[&features], &[&labels]).unwrap();
        let b = kept.fit_tensors(&[&features], &[&labels]).unwrap();
        assert_eq!(a, b);
    }
    assert_eq!(
        released.output_single(&[&features]).unwrap(),
        kept.output_single(&[&features]).unwrap()
    );
}
