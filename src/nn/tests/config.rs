use crate::assert_err;
use crate::nn::{
    GradientNormalization, GraphError, NetworkConfig, Updater, WeightInit, WorkspaceMode,
};

#[test]
fn test_default_config_is_valid() {
    let config = NetworkConfig::default();
    config.validate().unwrap();
    assert!(config.mini_batch);
    assert_eq!(config.weight_init, WeightInit::Xavier);
    assert_eq!(config.gradient_normalization, GradientNormalization::None);
    assert_eq!(config.training_workspace_mode, WorkspaceMode::Enabled);
    assert_eq!(config.bias_updater, None);
}

#[test]
fn test_invalid_values_are_rejected() {
    let invalid = [
        NetworkConfig {
            l2: -0.1,
            ..NetworkConfig::default()
        },
        NetworkConfig {
            gradient_normalization_threshold: 0.0,
            ..NetworkConfig::default()
        },
        NetworkConfig {
            weight_init: WeightInit::Normal {
                mean: 0.0,
                std: -1.0,
            },
            ..NetworkConfig::default()
        },
        NetworkConfig {
            weight_init: WeightInit::Uniform {
                low: 1.0,
                high: -1.0,
            },
            ..NetworkConfig::default()
        },
        NetworkConfig {
            bias_updater: Some(Updater::nesterovs(0.1, 1.5)),
            ..NetworkConfig::default()
        },
    ];
    for config in invalid {
        assert_err!(config.validate(), GraphError::Configuration(_));
    }
}

#[test]
fn test_partial_json_uses_defaults() {
    let config: NetworkConfig =
        serde_json::from_str(r#"{"seed": 7, "updater": {"Adam": {"learning_rate": 0.0002, "beta1": 0.5, "beta2": 0.999, "epsilon": 1e-8}}}"#)
            .unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.updater, Updater::adam_with_beta1(0.0002, 0.5));
    assert_eq!(config.l2, 0.0);
    assert!(config.mini_batch);

    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(serde_json::from_str::<NetworkConfig>(&json).unwrap(), config);
}
