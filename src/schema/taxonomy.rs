//! 用户提供的 YAML 分类体系。
//!
//! ```yaml
//! - name: 信号增强与去噪
//!   children:
//!     - name: 深度学习降噪方法
//!     - 传统滤波与小波方法
//! - name: 特征提取与表示学习
//! ```

use std::path::Path;

use serde::Serialize;
use serde_yaml::Value;

use crate::models::Schema;
use crate::utils::{ReviewError, ReviewResult};

const UNNAMED_SUB: &str = "未命名子类";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

/// 声明式分类体系（顶层为大类列表）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Taxonomy {
    pub categories: Vec<TaxonomyCategory>,
}

impl Taxonomy {
    pub fn load(path: &Path) -> ReviewResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReviewError::SchemaFormatError(format!("无法读取 {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ReviewResult<Self> {
        let data: Value = serde_yaml::from_str(content)
            .map_err(|e| ReviewError::SchemaFormatError(format!("YAML 解析失败: {}", e)))?;

        let Value::Sequence(items) = data else {
            return Err(ReviewError::SchemaFormatError(
                "分类体系顶层应为 list".to_string(),
            ));
        };

        let mut categories = Vec::with_capacity(items.len());
        for item in &items {
            let name = match item {
                Value::Mapping(map) => map.get("name").and_then(scalar_to_string),
                _ => None,
            }
            .ok_or_else(|| {
                ReviewError::SchemaFormatError(
                    "每个大类应为 {name: ..., children: [...]} 结构".to_string(),
                )
            })?;

            let children = match item.get("children") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Sequence(children)) => children
                    .iter()
                    .map(|child| child_name(&name, child))
                    .collect::<ReviewResult<Vec<_>>>()?,
                Some(_) => {
                    return Err(ReviewError::SchemaFormatError(format!(
                        "大类 {} 的 children 应为 list",
                        name
                    )))
                }
            };

            categories.push(TaxonomyCategory { name, children });
        }

        Ok(Self { categories })
    }

    /// 转换为分类体系；名称必须全局唯一
    pub fn to_schema(&self) -> ReviewResult<Schema> {
        let mut schema = Schema::new();
        for category in &self.categories {
            schema.add_main(&category.name, &category.children)?;
        }
        Ok(schema)
    }

    /// `init` 命令生成的示例
    pub fn example() -> Self {
        let category = |name: &str, children: &[&str]| TaxonomyCategory {
            name: name.to_string(),
            children: children.iter().map(|c| c.to_string()).collect(),
        };
        Self {
            categories: vec![
                category("信号增强与去噪", &["深度学习降噪方法", "传统滤波与小波方法"]),
                category("特征提取与表示学习", &["时域/频域特征", "深度表示学习"]),
            ],
        }
    }

    pub fn to_yaml(&self) -> ReviewResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ReviewError::SchemaFormatError(format!("YAML 序列化失败: {}", e)))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn child_name(parent: &str, child: &Value) -> ReviewResult<String> {
    match child {
        Value::Mapping(map) => Ok(map
            .get("name")
            .and_then(scalar_to_string)
            .unwrap_or_else(|| UNNAMED_SUB.to_string())),
        other => scalar_to_string(other).ok_or_else(|| {
            ReviewError::SchemaFormatError(format!("大类 {} 下存在无法识别的子类条目", parent))
        }),
    }
}
