use approx::assert_relative_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{build, image_input, sgd_config};
use crate::nn::{
    Activation, CnnLossConf, ComputationGraph, ConvolutionConf, ConvolutionMode, DenseConf,
    LossFunction, LrnConf, OutputConf, PoolingType, SubsamplingConf, Topology, VertexConf,
};
use crate::tensor::Tensor;

const EPSILON: f32 = 3e-3;

/// conv(补零) → LRN → 带补零的最大池化，与Same模式的步长卷积按通道合并后分两路：
/// reshape → dense → softmax + NLL；卷积 → sigmoid + Xent
fn two_headed_topology() -> Topology {
    let mut topology = image_input(6, 6, 1);
    topology
        .add_layer(
            "conv",
            ConvolutionConf::new(3, (3, 3))
                .padding((1, 1))
                .mode(ConvolutionMode::Truncate)
                .activation(Activation::Tanh),
            &["in"],
        )
        .add_layer(
            "lrn",
            LrnConf {
                n: 3,
                alpha: 0.5,
                ..LrnConf::default()
            },
            &["conv"],
        )
        .add_layer(
            "pool",
            SubsamplingConf::new(PoolingType::Max, (3, 3), (2, 2)).padding((1, 1)),
            &["lrn"],
        )
        .add_layer(
            "down",
            ConvolutionConf::new(2, (2, 2))
                .stride((2, 2))
                .mode(ConvolutionMode::Same)
                .activation(Activation::Tanh),
            &["in"],
        )
        .add_vertex("merge", VertexConf::Merge, &["pool", "down"])
        .add_vertex("flat", VertexConf::Reshape { shape: vec![45] }, &["merge"])
        .add_layer("hidden", DenseConf::new(4).activation(Activation::Tanh), &["flat"])
        .add_layer(
            "out",
            OutputConf::new(2, LossFunction::NegativeLogLikelihood),
            &["hidden"],
        )
        .add_layer(
            "recon",
            ConvolutionConf::new(1, (2, 2))
                .mode(ConvolutionMode::Same)
                .activation(Activation::Identity),
            &["merge"],
        )
        .add_layer(
            "recon_loss",
            CnnLossConf::new(LossFunction::Xent).activation(Activation::Sigmoid),
            &["recon"],
        )
        .set_outputs(&["out", "recon_loss"]);
    topology
}

struct Batch {
    features: Tensor,
    classes: Tensor,
    pixels: Tensor,
}

fn batch() -> Batch {
    let mut rng = StdRng::seed_from_u64(5);
    Batch {
        features: Tensor::uniform(-1.0, 1.0, &[2, 1, 6, 6], &mut rng),
        classes: Tensor::new(&[1., 0., 0., 1.], &[2, 2]),
        pixels: Tensor::uniform(0.0, 1.0, &[2, 1, 3, 3], &mut rng),
    }
}

fn fit(graph: &mut ComputationGraph, data: &Batch) -> f32 {
    graph
        .fit_tensors(&[&data.features], &[&data.classes, &data.pixels])
        .unwrap()
}

fn dot(a: &[Tensor], b: &[Tensor]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.zip_map(y, |u, v| u * v).sum())
        .sum()
}

/// 学习率为0的图上，沿`direction`做中心差分：[L(θ+εd) - L(θ-εd)] / 2ε
fn directional_derivative(
    evaluator: &mut ComputationGraph,
    layer: usize,
    direction: &[Tensor],
    data: &Batch,
) -> f32 {
    let original = evaluator.layer_params(layer).unwrap().to_vec();
    let mut score_at = |sign: f32| {
        let shifted = original
            .iter()
            .zip(direction)
            .map(|(p, d)| p + &(d * (sign * EPSILON)))
            .collect::<Vec<_>>();
        evaluator.set_layer_params(layer, &shifted).unwrap();
        fit(evaluator, data)
    };
    let plus = score_at(1.0);
    let minus = score_at(-1.0);
    evaluator.set_layer_params(layer, &original).unwrap();
    (plus - minus) / (2.0 * EPSILON)
}

#[test]
fn test_backward_matches_finite_differences() {
    let data = batch();
    // 学习率为1的SGD走一步：参数的变化量即为梯度
    let mut stepped = build(two_headed_topology(), sgd_config(1.0));
    let mut evaluator = build(two_headed_topology(), sgd_config(0.0));
    let mut rng = StdRng::seed_from_u64(17);

    let layers = ["conv", "down", "hidden", "out", "recon"];
    let before = layers
        .iter()
        .map(|name| {
            let index = stepped.layer_index(name).unwrap();
            stepped.layer_params(index).unwrap().to_vec()
        })
        .collect::<Vec<_>>();
    for (name, params) in layers.iter().zip(&before) {
        let index = evaluator.layer_index(name).unwrap();
        evaluator.set_layer_params(index, params).unwrap();
    }
    fit(&mut stepped, &data);

    for (name, params) in layers.iter().zip(&before) {
        let index = stepped.layer_index(name).unwrap();
        let grads = params
            .iter()
            .zip(stepped.layer_params(index).unwrap())
            .map(|(old, new)| old - new)
            .collect::<Vec<_>>();
        let norm = dot(&grads, &grads).sqrt();
        assert!(norm > 1e-4, "`{name}`的梯度几乎为零：{norm}");

        // 沿梯度方向的方向导数等于梯度的模
        let along = grads.iter().map(|g| g / norm).collect::<Vec<_>>();
        let numeric = directional_derivative(&mut evaluator, index, &along, &data);
        assert_relative_eq!(numeric, norm, max_relative = 0.05);

        // 任意单位方向上的方向导数等于梯度与该方向的内积
        let random = grads
            .iter()
            .map(|g| Tensor::uniform(-1.0, 1.0, g.shape(), &mut rng))
            .collect::<Vec<_>>();
        let random_norm = dot(&random, &random).sqrt();
        let random = random.iter().map(|r| r / random_norm).collect::<Vec<_>>();
        let numeric = directional_derivative(&mut evaluator, index, &random, &data);
        let analytic = dot(&grads, &random);
        assert!(
            (numeric - analytic).abs() <= 0.05 * norm,
            "`{name}`：数值方向导数{numeric}，解析值{analytic}，梯度模{norm}"
        );
    }
}
