/*
 * @Description  : 模型文件的保存/加载
 *
 * 文件布局：魔数(4字节) + 版本(u32小端) + bincode编码的`ModelFile`。
 * `ModelFile`含拓扑、网络配置、各层参数与可训练标记、迭代/轮次计数，
 * 以及可选的更新器状态（动量、一二阶矩），加载后可继续训练。
 * 反序列化的字节数上限为文件长度，损坏的长度前缀只会返回错误。
 */

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ComputationGraph, GraphError};
use crate::nn::nodes::TraitNode;
use crate::nn::optimizer::UpdaterState;
use crate::nn::{NetworkConfig, Topology};
use crate::tensor::Tensor;

#[derive(Serialize, Deserialize)]
struct ModelFile {
    name: String,
    topology: Topology,
    config: NetworkConfig,
    /// 按层序号排列，每层为`[权重, 偏置]`或空
    params: Vec<Vec<Tensor>>,
    trainable: Vec<bool>,
    /// (主更新器, 偏置更新器)
    updater: Option<(UpdaterState, Option<UpdaterState>)>,
    iteration_count: usize,
    epoch_count: usize,
}

impl ComputationGraph {
    /// 模型文件魔数
    const MODEL_MAGIC: &'static [u8; 4] = b"OIGM";
    /// 模型文件版本
    const MODEL_VERSION: u32 = 1;

    /// 保存模型；`save_updater`为true时一并保存更新器状态
    pub fn save<P: AsRef<Path>>(&self, path: P, save_updater: bool) -> Result<(), GraphError> {
        let model = ModelFile {
            name: self.name.clone(),
            topology: self.topology.clone(),
            config: self.config.clone(),
            params: self
                .layers
                .iter()
                .map(|id| self.nodes[id.0].node.params().to_vec())
                .collect(),
            trainable: self.layers.iter().map(|id| self.nodes[id.0].trainable).collect(),
            updater: save_updater.then(|| (self.updater.clone(), self.bias_updater.clone())),
            iteration_count: self.iteration_count,
            epoch_count: self.epoch_count,
        };

        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        writer.write_all(Self::MODEL_MAGIC)?;
        writer.write_all(&Self::MODEL_VERSION.to_le_bytes())?;
        bincode::serialize_into(&mut writer, &model)
            .map_err(|e| GraphError::Format(format!("模型序列化失败: {e}")))?;
        writer.flush()?;
        info!(
            graph = %self.name,
            path = %path.as_ref().display(),
            save_updater,
            "模型已保存"
        );
        Ok(())
    }

    /// 加载由`save`保存的模型，恢复拓扑、参数、可训练标记、计数器及（若有）更新器状态
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let file = File::open(path.as_ref())?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| GraphError::Format(format!("读取魔数失败: {e}")))?;
        if &magic != Self::MODEL_MAGIC {
            return Err(GraphError::Format(
                "无效的模型文件：这不是only_inpaint格式的模型文件".to_string(),
            ));
        }
        let mut version_bytes = [0u8; 4];
        reader
            .read_exact(&mut version_bytes)
            .map_err(|e| GraphError::Format(format!("读取版本失败: {e}")))?;
        let version = u32::from_le_bytes(version_bytes);
        if version != Self::MODEL_VERSION {
            return Err(GraphError::Format(format!("不支持的模型文件版本: {version}")));
        }

        // 与`bincode::serialize_into`的默认编码一致：定长整数、允许尾随字节
        let model: ModelFile = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(file_len)
            .deserialize_from(&mut reader)
            .map_err(|e| GraphError::Format(format!("模型反序列化失败: {e}")))?;
        let mut graph = Self::new(&model.name, model.topology, model.config)?;
        if model.params.len() != graph.layers.len() || model.trainable.len() != graph.layers.len() {
            return Err(GraphError::Format(format!(
                "模型文件中的层数({})与拓扑({})不一致",
                model.params.len(),
                graph.layers.len()
            )));
        }
        for (index, params) in model.params.iter().enumerate() {
            graph.set_layer_params(index, params)?;
        }
        for (id, trainable) in graph.layers.clone().into_iter().zip(model.trainable) {
            graph.nodes[id.0].trainable = trainable;
        }
        graph.refresh_requires_grad();
        if let Some((updater, bias_updater)) = model.updater {
            graph.updater = updater;
            graph.bias_updater = bias_updater;
        }
        graph.iteration_count = model.iteration_count;
        graph.epoch_count = model.epoch_count;
        graph.rng = StdRng::seed_from_u64(
            graph.config.seed.wrapping_add(model.iteration_count as u64),
        );
        info!(
            graph = %graph.name,
            path = %path.as_ref().display(),
            iteration = graph.iteration_count,
            "模型已加载"
        );
        Ok(graph)
    }
}
