use super::small_config;
use crate::assert_err;
use crate::gan::{
    GanError, ParameterSyncTable, combined_topology, discriminator_topology, generator_topology,
};
use crate::nn::{ComputationGraph, DenseConf, LossFunction, OutputConf, Topology};

fn build_pair() -> Result<(ComputationGraph, ComputationGraph, usize), GanError> {
    let config = small_config();
    let discriminator = ComputationGraph::new(
        "discriminator",
        discriminator_topology(&config),
        config.discriminator.network.clone(),
    )?;
    let combined = ComputationGraph::new(
        "gan",
        combined_topology(&config)?,
        config.network.clone(),
    )?;
    Ok((discriminator, combined, generator_topology(&config).num_layers()))
}

#[test]
fn test_table_maps_by_offset() -> Result<(), GanError> {
    let (discriminator, combined, generator_layers) = build_pair()?;
    let table = ParameterSyncTable::build(&discriminator, &combined, generator_layers)?;
    // LRN与池化层没有参数：13层中有8层带参数
    assert_eq!(table.len(), 8);
    for &(i, j) in table.pairs() {
        assert_eq!(j, generator_layers + i);
        assert_eq!(discriminator.layer_name(i)?, combined.layer_name(j)?);
    }
    Ok(())
}

#[test]
fn test_apply_copies_parameters_exactly() -> Result<(), GanError> {
    let (discriminator, mut combined, generator_layers) = build_pair()?;
    let table = ParameterSyncTable::build(&discriminator, &combined, generator_layers)?;
    // 两个网络的种子与初始化不同，同步前参数不一致
    let (i, j) = table.pairs()[0];
    assert_ne!(discriminator.layer_params(i)?, combined.layer_params(j)?);

    table.apply(&discriminator, &mut combined)?;
    for &(i, j) in table.pairs() {
        assert_eq!(discriminator.layer_params(i)?, combined.layer_params(j)?);
    }
    Ok(())
}

#[test]
fn test_wrong_generator_layer_count_fails_fast() -> Result<(), GanError> {
    let (discriminator, combined, generator_layers) = build_pair()?;
    let result = ParameterSyncTable::build(&discriminator, &combined, generator_layers + 1);
    assert_err!(result, GanError::LayerCountMismatch { total, discriminator: 13, .. } if *total == generator_layers + 13);
    Ok(())
}

#[test]
fn test_mismatched_discriminator_fails_fast() -> Result<(), GanError> {
    let (_, combined, generator_layers) = build_pair()?;
    // 只有2层的"判别器"：层数与组合网络尾部不符
    let config = small_config();
    let full = discriminator_topology(&config);
    let mut topology = Topology::new();
    for input in full.inputs() {
        topology.add_input(&input.name, input.input_type);
    }
    topology
        .extend_entries(full.entries().iter().take(1).cloned())
        .add_layer("DISFFN1", DenseConf::new(4), &["DISmerge0"])
        .add_layer(
            "DISLoss",
            OutputConf::new(2, LossFunction::NegativeLogLikelihood),
            &["DISFFN1"],
        )
        .set_outputs(&["DISLoss"]);
    let discriminator =
        ComputationGraph::new("discriminator", topology, config.discriminator.network.clone())?;

    let result = ParameterSyncTable::build(&discriminator, &combined, generator_layers);
    assert_err!(result, GanError::LayerCountMismatch { discriminator: 2, .. });
    Ok(())
}
