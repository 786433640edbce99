//! 从 RIS / RefWorks 导出文件生成按大类/小类分组的中文文献综述草稿。

pub mod classifier;
pub mod config;
pub mod exporter;
pub mod llm;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod summarizer;
pub mod utils;
