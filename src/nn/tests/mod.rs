mod config;
mod fit;
mod gradient_check;
mod layers;
mod listener;

use crate::nn::{
    Activation, ComputationGraph, DenseConf, InputType, LossFunction, NetworkConfig, OutputConf,
    Topology, Updater,
};

/// 单通道`h`x`w`的卷积输入
fn image_input(h: usize, w: usize, c: usize) -> Topology {
    let mut topology = Topology::new();
    topology.add_input("in", InputType::convolutional(h, w, c));
    topology
}

/// in(3) -> hidden(4) -> out(2, softmax + NLL) 的小分类网络
fn small_classifier() -> Topology {
    let mut topology = Topology::new();
    topology
        .add_input("in", InputType::FeedForward { size: 3 })
        .add_layer("hidden", DenseConf::new(4).activation(Activation::Tanh), &["in"])
        .add_layer(
            "out",
            OutputConf::new(2, LossFunction::NegativeLogLikelihood),
            &["hidden"],
        )
        .set_outputs(&["out"]);
    topology
}

fn sgd_config(learning_rate: f32) -> NetworkConfig {
    NetworkConfig {
        seed: 42,
        updater: Updater::sgd(learning_rate),
        ..NetworkConfig::default()
    }
}

fn build(topology: Topology, config: NetworkConfig) -> ComputationGraph {
    ComputationGraph::new("test", topology, config).unwrap()
}
