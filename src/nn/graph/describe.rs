/*
 * @Description  : 计算图的描述符（describe）与摘要（summary）
 *
 * 描述符只含节点名、种类、接线、输出形状、可训练标记与配置摘要，不含参数值，
 * 因此同一拓扑构建两次得到的描述符相等。
 */

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ComputationGraph, GraphError};
use crate::nn::nodes::TraitNode;

/// 计算图的可序列化描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDescriptor {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    /// 按声明（拓扑）顺序
    pub nodes: Vec<NodeDescriptor>,
}

/// 节点描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    /// 节点种类，如"Convolution"、"Merge"
    pub kind: String,
    /// 输入节点名（有序）
    pub inputs: Vec<String>,
    /// 单个样本的输出形状
    pub output_shape: Vec<usize>,
    pub trainable: bool,
    pub param_count: usize,
    /// 配置摘要，如"kernel=[2, 2] stride=[2, 2] Same"
    pub config: String,
}

impl GraphDescriptor {
    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GraphError::Format(format!("描述符序列化失败: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json)
            .map_err(|e| GraphError::Format(format!("描述符反序列化失败: {e}")))
    }

    pub fn total_params(&self) -> usize {
        self.nodes.iter().map(|n| n.param_count).sum()
    }
}

impl ComputationGraph {
    /// 导出图的描述符（用于比较、调试输出与JSON序列化）
    pub fn describe(&self) -> GraphDescriptor {
        let nodes = self
            .nodes
            .iter()
            .map(|handle| NodeDescriptor {
                name: handle.name.clone(),
                kind: handle.node.kind().to_string(),
                inputs: handle
                    .inputs
                    .iter()
                    .map(|id| self.nodes[id.0].name.clone())
                    .collect(),
                output_shape: handle.node.output_shape().to_vec(),
                trainable: handle.trainable,
                param_count: handle.node.params().iter().map(|p| p.size()).sum(),
                config: handle.node.describe(),
            })
            .collect();
        GraphDescriptor {
            name: self.name.clone(),
            inputs: self.input_names().into_iter().map(String::from).collect(),
            outputs: self.output_names().into_iter().map(String::from).collect(),
            nodes,
        }
    }

    // ========== 模型摘要（summary）==========

    /// 返回模型摘要的文本表格（类似Keras的`model.summary()`）
    ///
    /// ```ignore
    /// // ┌──────────┬─────────────┬──────────────┬────────────┬───────────┐
    /// // │ 节点名称 │ 类型        │ 输出形状     │ 参数量     │ 输入      │
    /// // ├──────────┼─────────────┼──────────────┼────────────┼───────────┤
    /// // │ Input    │ Input       │ [3, 128, 128]│          - │ -         │
    /// ```
    pub fn summary(&self) -> String {
        let desc = self.describe();
        let rows = desc
            .nodes
            .iter()
            .map(|n| {
                let kind = if n.trainable || n.param_count == 0 {
                    n.kind.clone()
                } else {
                    format!("{}(冻结)", n.kind)
                };
                let params = if n.param_count == 0 {
                    "-".to_string()
                } else {
                    format_number(n.param_count)
                };
                let inputs = if n.inputs.is_empty() {
                    "-".to_string()
                } else {
                    n.inputs.join(", ")
                };
                [n.name.clone(), kind, format!("{:?}", n.output_shape), params, inputs]
            })
            .collect::<Vec<_>>();

        let headers = ["节点名称", "类型", "输出形状", "参数量", "输入"];
        let mut widths = headers.map(display_width);
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(display_width(cell));
            }
        }

        let border = |left: &str, mid: &str, right: &str| {
            let segments = widths.iter().map(|w| "─".repeat(w + 2)).collect::<Vec<_>>();
            format!("{left}{}{right}\n", segments.join(mid))
        };
        let line = |cells: &[String]| {
            let body = cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, w))| {
                    let pad = " ".repeat(w - display_width(cell));
                    // 参数量列右对齐
                    if i == 3 {
                        format!(" {pad}{cell} ")
                    } else {
                        format!(" {cell}{pad} ")
                    }
                })
                .collect::<Vec<_>>();
            format!("│{}│\n", body.join("│"))
        };

        let mut output = String::new();
        output.push_str(&format!("计算图: {}\n", desc.name));
        output.push_str(&border("┌", "┬", "┐"));
        output.push_str(&line(headers.map(String::from).as_slice()));
        output.push_str(&border("├", "┼", "┤"));
        for row in &rows {
            output.push_str(&line(row.as_slice()));
        }
        output.push_str(&border("└", "┴", "┘"));

        let trainable_params: usize = desc
            .nodes
            .iter()
            .filter(|n| n.trainable)
            .map(|n| n.param_count)
            .sum();
        output.push_str(&format!(
            "总参数量: {}，可训练参数: {}\n",
            format_number(desc.total_params()),
            format_number(trainable_params)
        ));
        output
    }

    /// 将摘要保存到文件
    pub fn save_summary<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        std::fs::write(path, self.summary())?;
        Ok(())
    }
}

/// 格式化数字为千分位分隔形式
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// 显示宽度：中文等全角字符按2列计
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}
