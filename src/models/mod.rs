pub mod schema;

pub use schema::Schema;

use serde::{Deserialize, Serialize};

pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const UNTITLED: &str = "Untitled";

/// 一条文献记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperEntry {
    pub id: usize,
    pub key: String,
    pub title: String,
    pub abstract_text: String,
    pub first_author: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: String,
    pub main_category: Option<String>,
    pub sub_category: Option<String>,
    pub summary_zh: String,
}

impl PaperEntry {
    /// 由解析结果构造记录，统一处理标题/作者占位
    pub fn new(
        id: usize,
        title: &str,
        abstract_text: &str,
        authors: Vec<String>,
        year: Option<i32>,
        venue: &str,
    ) -> Self {
        let title = title.trim();
        let title = if title.is_empty() { UNTITLED } else { title };

        let first_author = authors
            .first()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        let authors = if authors.is_empty() {
            vec![first_author.clone()]
        } else {
            authors
        };

        Self {
            id,
            key: format!("paper_{}", id + 1),
            title: title.to_string(),
            abstract_text: abstract_text.trim().to_string(),
            first_author,
            authors,
            year,
            venue: venue.trim().to_string(),
            main_category: None,
            sub_category: None,
            summary_zh: String::new(),
        }
    }

    /// 写入分类结果；没有大类时小类必然为空
    pub fn set_category(&mut self, main: Option<String>, sub: Option<String>) {
        self.sub_category = if main.is_some() { sub } else { None };
        self.main_category = main;
    }
}

/// 分类体系中的一个节点（大类或小类）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

impl CategoryNode {
    pub fn main(name: &str, children: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children,
        }
    }

    pub fn sub(name: &str, parent: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: Some(parent.to_string()),
            children: Vec::new(),
        }
    }

    pub fn is_main(&self) -> bool {
        self.parent.is_none()
    }
}
