pub mod suggest;
pub mod taxonomy;

pub use suggest::LlmSchemaBuilder;
pub use taxonomy::{Taxonomy, TaxonomyCategory};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{PaperEntry, Schema};
use crate::utils::ReviewResult;

pub const FALLBACK_CATEGORY: &str = "自动归类/未分类";

/// 构建分类体系所需的输入
#[derive(Debug, Clone, Default)]
pub struct SchemaRequest {
    pub taxonomy: Option<Taxonomy>,
    pub n_main: Option<usize>,
    pub m_sub: Option<usize>,
}

#[async_trait]
pub trait SchemaBuilder: Send + Sync {
    async fn build(&self, papers: &[PaperEntry], request: &SchemaRequest) -> ReviewResult<Schema>;
}

/// 声明式体系 > 数字参数自动生成 > 兜底单一大类
pub struct DefaultSchemaBuilder;

#[async_trait]
impl SchemaBuilder for DefaultSchemaBuilder {
    async fn build(&self, papers: &[PaperEntry], request: &SchemaRequest) -> ReviewResult<Schema> {
        match from_taxonomy(request)? {
            Some(schema) => Ok(schema),
            None => Ok(auto_schema(papers, request.n_main, request.m_sub)),
        }
    }
}

/// 有声明式体系时直接使用，数字参数被忽略
pub(crate) fn from_taxonomy(request: &SchemaRequest) -> ReviewResult<Option<Schema>> {
    let Some(taxonomy) = &request.taxonomy else {
        return Ok(None);
    };
    if request.n_main.is_some() || request.m_sub.is_some() {
        warn!(
            "已提供分类体系文件，忽略 n_main={:?} / m_sub={:?}",
            request.n_main, request.m_sub
        );
    }
    let schema = taxonomy.to_schema()?;
    info!("使用声明式分类体系: {} 个大类", schema.main_names().len());
    Ok(Some(schema))
}

/// 兜底体系：只有一个“自动归类/未分类”大类
pub fn fallback_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_main(FALLBACK_CATEGORY, &[])
        .expect("empty schema accepts the fallback category");
    schema
}

/// 按数字参数生成 `自动主类{i}` / `自动主类{i}-子类{j}`；n_main 缺省或为 0 时退回兜底体系
pub fn auto_schema(_papers: &[PaperEntry], n_main: Option<usize>, m_sub: Option<usize>) -> Schema {
    let n_main = match n_main {
        Some(n) if n > 0 => n,
        _ => {
            info!("未提供分类参数，使用兜底分类: {}", FALLBACK_CATEGORY);
            return fallback_schema();
        }
    };
    let m_sub = m_sub.unwrap_or(0);
    info!("按数字参数自动构造分类体系: n_main={}, m_sub={}", n_main, m_sub);

    let mut schema = Schema::new();
    for main_index in 1..=n_main {
        let main_name = format!("自动主类{}", main_index);
        let children: Vec<String> = (1..=m_sub)
            .map(|sub_index| format!("{}-子类{}", main_name, sub_index))
            .collect();
        schema
            .add_main(&main_name, &children)
            .expect("generated category names are unique");
    }
    schema
}
