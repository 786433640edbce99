use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::{resolve_name, CategoryAssigner};
use crate::llm::{extract_json_object, ChatBackend};
use crate::models::{PaperEntry, Schema};
use crate::utils::{truncate_chars, ReviewError, ReviewResult};

const ABSTRACT_BUDGET: usize = 400;

/// 逐篇调用模型分类；大类必须能解析到体系中，小类尽力而为
pub struct LlmCategoryAssigner {
    backend: Arc<dyn ChatBackend>,
}

impl LlmCategoryAssigner {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    async fn classify(
        &self,
        paper: &PaperEntry,
        schema: &Schema,
    ) -> ReviewResult<(String, Option<String>)> {
        let prompt = build_prompt(paper, schema);
        let response = self.backend.complete(&prompt).await.map_err(|e| {
            ReviewError::ClassificationFailed(format!("[{}] 模型调用失败: {:#}", paper.key, e))
        })?;

        let payload = extract_json_object(&response).ok_or_else(|| {
            ReviewError::ClassificationFailed(format!("[{}] 模型返回中没有 JSON 对象", paper.key))
        })?;

        let raw_main = payload
            .get("main_category")
            .and_then(Value::as_str)
            .unwrap_or("");
        let main = resolve_name(schema.main_names(), raw_main).ok_or_else(|| {
            ReviewError::ClassificationFailed(format!(
                "[{}] 模型给出的大类 '{}' 不在分类体系中",
                paper.key, raw_main
            ))
        })?;

        let sub = payload
            .get("sub_category")
            .and_then(Value::as_str)
            .and_then(|raw_sub| {
                let children = schema.children_of(main).iter().map(String::as_str);
                let resolved = resolve_name(children, raw_sub);
                if resolved.is_none() && !raw_sub.trim().is_empty() {
                    debug!("[{}] 小类 '{}' 无法匹配，置空", paper.key, raw_sub);
                }
                resolved
            })
            .map(str::to_string);

        Ok((main.to_string(), sub))
    }
}

#[async_trait]
impl CategoryAssigner for LlmCategoryAssigner {
    async fn assign(&self, papers: &mut [PaperEntry], schema: &Schema) -> ReviewResult<()> {
        if schema.main_nodes().next().is_none() {
            return Err(ReviewError::ClassificationFailed(
                "分类体系中没有任何大类".to_string(),
            ));
        }

        // 全部成功后才写回，避免留下部分分类结果
        let mut labels = Vec::with_capacity(papers.len());
        for (index, paper) in papers.iter().enumerate() {
            let (main, sub) = self.classify(paper, schema).await?;
            info!(
                "[{}/{}] {} -> {} / {}",
                index + 1,
                papers.len(),
                paper.key,
                main,
                sub.as_deref().unwrap_or("未指定小类")
            );
            labels.push((main, sub));
        }

        for (paper, (main, sub)) in papers.iter_mut().zip(labels) {
            paper.set_category(Some(main), sub);
        }
        Ok(())
    }
}

fn build_prompt(paper: &PaperEntry, schema: &Schema) -> String {
    let mut prompt = String::from("请根据以下分类体系，为给定文献选择最合适的大类和小类。\n分类体系：\n");
    for node in schema.main_nodes() {
        if node.children.is_empty() {
            prompt.push_str(&format!("- {}（无小类）\n", node.name));
        } else {
            prompt.push_str(&format!("- {}：{}\n", node.name, node.children.join("、")));
        }
    }

    let year = paper
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "未知".to_string());
    prompt.push_str(&format!(
        "\n文献信息：\n标题：{}\n作者：{}\n年份：{}\n摘要：{}\n",
        paper.title,
        paper.authors.join(", "),
        year,
        truncate_chars(&paper.abstract_text, ABSTRACT_BUDGET, "..."),
    ));
    prompt.push_str(
        "\n输出 JSON，格式为 {\"main_category\": \"大类名称\", \"sub_category\": \"小类名称\"}。\n\
         名称必须与分类体系中的完全一致；没有合适的小类时 sub_category 填 null。",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按顺序返回预设回复
    struct Queue {
        replies: Mutex<VecDeque<Result<String, String>>>,
    }

    impl Queue {
        fn new(replies: &[Result<&str, &str>]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Queue {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(e)) => Err(anyhow::anyhow!(e)),
                None => Err(anyhow::anyhow!("no reply scripted")),
            }
        }
    }

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .add_main("Signal Processing", &["Denoising".to_string(), "Filtering".to_string()])
            .unwrap();
        schema.add_main("Diagnosis", &[]).unwrap();
        schema
    }

    fn papers(count: usize) -> Vec<PaperEntry> {
        (0..count)
            .map(|id| PaperEntry::new(id, "T", "abs", vec!["A".to_string()], Some(2020), ""))
            .collect()
    }

    #[tokio::test]
    async fn resolves_case_insensitively() {
        let backend = Queue::new(&[
            Ok(r#"{"main_category": "signal processing", "sub_category": "FILTERING"}"#),
            Ok(r#"{"main_category": "Diagnosis", "sub_category": null}"#),
        ]);
        let mut items = papers(2);
        LlmCategoryAssigner::new(backend)
            .assign(&mut items, &schema())
            .await
            .unwrap();

        assert_eq!(items[0].main_category.as_deref(), Some("Signal Processing"));
        assert_eq!(items[0].sub_category.as_deref(), Some("Filtering"));
        assert_eq!(items[1].main_category.as_deref(), Some("Diagnosis"));
        assert!(items[1].sub_category.is_none());
    }

    #[tokio::test]
    async fn unknown_sub_becomes_none() {
        let backend = Queue::new(&[Ok(
            r#"{"main_category": "Signal Processing", "sub_category": "Denoising of Diagnosis"}"#,
        )]);
        let mut items = papers(1);
        LlmCategoryAssigner::new(backend)
            .assign(&mut items, &schema())
            .await
            .unwrap();
        assert_eq!(items[0].main_category.as_deref(), Some("Signal Processing"));
        assert!(items[0].sub_category.is_none());
    }

    #[tokio::test]
    async fn sub_from_another_main_is_dropped() {
        let backend = Queue::new(&[Ok(r#"{"main_category": "Diagnosis", "sub_category": "Denoising"}"#)]);
        let mut items = papers(1);
        LlmCategoryAssigner::new(backend)
            .assign(&mut items, &schema())
            .await
            .unwrap();
        assert_eq!(items[0].main_category.as_deref(), Some("Diagnosis"));
        assert!(items[0].sub_category.is_none());
    }

    #[tokio::test]
    async fn unresolvable_main_leaves_no_partial_labels() {
        let backend = Queue::new(&[
            Ok(r#"{"main_category": "Diagnosis"}"#),
            Ok(r#"{"main_category": "Astronomy"}"#),
        ]);
        let mut items = papers(2);
        let result = LlmCategoryAssigner::new(backend)
            .assign(&mut items, &schema())
            .await;

        assert!(matches!(result, Err(ReviewError::ClassificationFailed(_))));
        assert!(items.iter().all(|p| p.main_category.is_none()));
    }

    #[tokio::test]
    async fn backend_failure_is_classification_failure() {
        let backend = Queue::new(&[Err("timeout")]);
        let mut items = papers(1);
        let result = LlmCategoryAssigner::new(backend)
            .assign(&mut items, &schema())
            .await;
        assert!(matches!(result, Err(ReviewError::ClassificationFailed(_))));
    }

    #[tokio::test]
    async fn schema_without_mains_fails() {
        let backend = Queue::new(&[]);
        let mut items = papers(1);
        let result = LlmCategoryAssigner::new(backend)
            .assign(&mut items, &Schema::new())
            .await;
        assert!(matches!(result, Err(ReviewError::ClassificationFailed(_))));
    }

    #[test]
    fn prompt_lists_categories() {
        let prompt = build_prompt(&papers(1)[0], &schema());
        assert!(prompt.contains("- Signal Processing：Denoising、Filtering"));
        assert!(prompt.contains("- Diagnosis（无小类）"));
        assert!(prompt.contains("main_category"));
    }
}
