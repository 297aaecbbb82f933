/*
 * @Description  : 判别器 → 组合网络尾部的参数同步表。
 *                 组合网络的层列表 = 生成器的G层 + 判别器的D层，故判别器第i层对应组合网络第G+i层。
 *                 该对应关系在组装时按层名建立一次、并以偏移规则核对，之后每次同步直接复用。
 */

use tracing::debug;

use super::GanError;
use crate::nn::ComputationGraph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSyncTable {
    /// (判别器层序号, 组合网络层序号)，只含有参数的层
    pairs: Vec<(usize, usize)>,
}

impl ParameterSyncTable {
    /// `generator_layers`为独立生成器的层数G，须满足`total - D == G`
    pub fn build(
        discriminator: &ComputationGraph,
        combined: &ComputationGraph,
        generator_layers: usize,
    ) -> Result<Self, GanError> {
        let total = combined.num_layers();
        let d_layers = discriminator.num_layers();
        let mismatch = |message: String| GanError::LayerCountMismatch {
            total,
            discriminator: d_layers,
            generator: generator_layers,
            message,
        };
        if total.checked_sub(d_layers) != Some(generator_layers) {
            return Err(mismatch("total - D != G".to_string()));
        }

        let mut pairs = Vec::new();
        for (i, name) in discriminator.layer_names().into_iter().enumerate() {
            let j = combined
                .layer_index(name)
                .ok_or_else(|| mismatch(format!("组合网络中没有判别器层`{name}`")))?;
            if j != generator_layers + i {
                return Err(mismatch(format!(
                    "判别器层`{name}`在组合网络中的序号为{j}，应为{}",
                    generator_layers + i
                )));
            }
            if !discriminator.layer_params(i)?.is_empty() {
                pairs.push((i, j));
            }
        }
        debug!(pairs = pairs.len(), generator_layers, "参数同步表已建立");
        Ok(Self { pairs })
    }

    /// 把判别器的参数逐层复制到组合网络尾部
    pub fn apply(
        &self,
        discriminator: &ComputationGraph,
        combined: &mut ComputationGraph,
    ) -> Result<(), GanError> {
        for &(i, j) in &self.pairs {
            combined.set_layer_params(j, discriminator.layer_params(i)?)?;
        }
        Ok(())
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
