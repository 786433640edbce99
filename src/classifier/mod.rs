pub mod llm;

pub use llm::LlmCategoryAssigner;

use async_trait::async_trait;
use tracing::info;

use crate::models::{PaperEntry, Schema};
use crate::utils::ReviewResult;

/// 为每篇文献写入 (大类, 小类)
#[async_trait]
pub trait CategoryAssigner: Send + Sync {
    async fn assign(&self, papers: &mut [PaperEntry], schema: &Schema) -> ReviewResult<()>;
}

/// 占位分类：全部归入名称最小的大类及其第一个小类，不看内容
pub struct DefaultCategoryAssigner;

impl DefaultCategoryAssigner {
    pub fn default_bucket(schema: &Schema) -> Option<(String, Option<String>)> {
        let main = schema.main_nodes().min_by(|a, b| a.name.cmp(&b.name))?;
        Some((main.name.clone(), main.children.first().cloned()))
    }
}

#[async_trait]
impl CategoryAssigner for DefaultCategoryAssigner {
    async fn assign(&self, papers: &mut [PaperEntry], schema: &Schema) -> ReviewResult<()> {
        let (main, sub) = match Self::default_bucket(schema) {
            Some((main, sub)) => (Some(main), sub),
            None => (None, None),
        };
        info!("默认分类: {:?} / {:?}", main, sub);

        for paper in papers.iter_mut() {
            paper.set_category(main.clone(), sub.clone());
        }
        Ok(())
    }
}

/// 先精确匹配，再大小写不敏感匹配
pub fn resolve_name<'a>(
    candidates: impl IntoIterator<Item = &'a str> + Clone,
    wanted: &str,
) -> Option<&'a str> {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return None;
    }
    candidates
        .clone()
        .into_iter()
        .find(|candidate| *candidate == wanted)
        .or_else(|| {
            let lowered = wanted.to_lowercase();
            candidates
                .into_iter()
                .find(|candidate| candidate.to_lowercase() == lowered)
        })
}
