//! 两级分类体系：名称 -> 节点 的有序扁平映射。
//!
//! 大类与小类共享同一个命名空间（小类按名称而非路径查找），
//! 因此所有名称必须全局唯一。

use indexmap::IndexMap;

use super::CategoryNode;
use crate::utils::{ReviewError, ReviewResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    nodes: IndexMap<String, CategoryNode>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个大类及其小类，保持父子双向一致
    pub fn add_main(&mut self, name: &str, children: &[String]) -> ReviewResult<()> {
        if self.nodes.contains_key(name) {
            return Err(ReviewError::SchemaFormatError(format!("类别名称重复: {}", name)));
        }
        for (index, child) in children.iter().enumerate() {
            if child == name || self.nodes.contains_key(child) || children[..index].contains(child) {
                return Err(ReviewError::SchemaFormatError(format!(
                    "类别名称重复: {} (位于大类 {})",
                    child, name
                )));
            }
        }

        self.nodes
            .insert(name.to_string(), CategoryNode::main(name, children.to_vec()));
        for child in children {
            self.nodes
                .insert(child.clone(), CategoryNode::sub(child, name));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CategoryNode> {
        self.nodes.get(name)
    }

    /// 所有大类，按插入顺序
    pub fn main_nodes(&self) -> impl Iterator<Item = &CategoryNode> {
        self.nodes.values().filter(|node| node.is_main())
    }

    pub fn main_names(&self) -> Vec<&str> {
        self.main_nodes().map(|node| node.name.as_str()).collect()
    }

    /// 大类下声明的小类；不是大类时返回空
    pub fn children_of(&self, main: &str) -> &[String] {
        match self.nodes.get(main) {
            Some(node) if node.is_main() => &node.children,
            _ => &[],
        }
    }

    /// (大类, 小类) 是否为体系中真实存在的一条边
    pub fn has_edge(&self, main: &str, sub: &str) -> bool {
        self.children_of(main).iter().any(|child| child == sub)
            && self
                .nodes
                .get(sub)
                .and_then(|node| node.parent.as_deref())
                == Some(main)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 校验子类名称闭包：children 中的每个名称都存在且 parent 指回大类
    pub fn validate(&self) -> ReviewResult<()> {
        for node in self.nodes.values() {
            if let Some(parent) = &node.parent {
                if !node.children.is_empty() {
                    return Err(ReviewError::SchemaFormatError(format!(
                        "小类 {} 不能再包含子类",
                        node.name
                    )));
                }
                if !self.children_of(parent).contains(&node.name) {
                    return Err(ReviewError::SchemaFormatError(format!(
                        "小类 {} 的上级 {} 未声明它",
                        node.name, parent
                    )));
                }
            }
            for child in &node.children {
                let parent = self.nodes.get(child).and_then(|c| c.parent.as_deref());
                if parent != Some(node.name.as_str()) {
                    return Err(ReviewError::SchemaFormatError(format!(
                        "大类 {} 的子类 {} 不存在或归属不一致",
                        node.name, child
                    )));
                }
            }
        }
        Ok(())
    }
}
