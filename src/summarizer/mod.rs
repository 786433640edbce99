pub mod llm;

pub use llm::{FailurePolicy, LlmSummarizer};

use async_trait::async_trait;

use crate::models::PaperEntry;
use crate::utils::{collapse_whitespace, truncate_chars, ReviewResult};

const EXCERPT_CHARS: usize = 80;

/// 生成单篇文献的中文总结
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, paper: &PaperEntry) -> ReviewResult<String>;
}

/// 仅依赖元数据的模板总结，结果确定且不会失败
pub struct TemplateSummarizer;

impl TemplateSummarizer {
    pub fn render(paper: &PaperEntry) -> String {
        let mut text = format!("{}等人提出了一种", paper.first_author);
        if !paper.title.is_empty() {
            text.push_str(&format!("名为“{}”的方法，", paper.title));
        }

        let abstract_text = collapse_whitespace(&paper.abstract_text);
        if abstract_text.is_empty() {
            text.push_str("该方法的具体摘要信息在原文中给出。");
        } else {
            text.push_str("该方法主要针对");
            text.push_str(&truncate_chars(&abstract_text, EXCERPT_CHARS, "……"));
        }
        text
    }
}

#[async_trait]
impl Summarizer for TemplateSummarizer {
    async fn summarize(&self, paper: &PaperEntry) -> ReviewResult<String> {
        Ok(Self::render(paper))
    }
}
