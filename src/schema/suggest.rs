//! 由模型根据文献列表推断分类体系，失败时退回数字参数 / 兜底体系。

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{auto_schema, from_taxonomy, SchemaBuilder, SchemaRequest};
use crate::llm::{extract_json_object, ChatBackend};
use crate::models::{PaperEntry, Schema};
use crate::utils::{truncate_chars, ReviewError, ReviewResult};

const ABSTRACT_BUDGET: usize = 400;

pub struct LlmSchemaBuilder {
    backend: Arc<dyn ChatBackend>,
}

impl LlmSchemaBuilder {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// 请求模型给出体系并规范化
    pub async fn suggest(
        &self,
        papers: &[PaperEntry],
        n_main: Option<usize>,
        m_sub: Option<usize>,
    ) -> ReviewResult<Schema> {
        let prompt = build_prompt(papers, n_main, m_sub);
        let response = self
            .backend
            .complete(&prompt)
            .await
            .map_err(|e| ReviewError::SchemaSuggestionFailed(format!("模型调用失败: {:#}", e)))?;

        let payload = extract_json_object(&response).ok_or_else(|| {
            ReviewError::SchemaSuggestionFailed("模型返回中没有 JSON 对象".to_string())
        })?;

        normalize_suggestion(payload.get("main_categories"), n_main, m_sub)
    }
}

#[async_trait]
impl SchemaBuilder for LlmSchemaBuilder {
    async fn build(&self, papers: &[PaperEntry], request: &SchemaRequest) -> ReviewResult<Schema> {
        if let Some(schema) = from_taxonomy(request)? {
            return Ok(schema);
        }

        match self.suggest(papers, request.n_main, request.m_sub).await {
            Ok(schema) => {
                info!("模型推断出 {} 个大类", schema.main_names().len());
                Ok(schema)
            }
            Err(e) => {
                warn!("{}，改用自动生成的分类体系", e);
                Ok(auto_schema(papers, request.n_main, request.m_sub))
            }
        }
    }
}

fn build_prompt(papers: &[PaperEntry], n_main: Option<usize>, m_sub: Option<usize>) -> String {
    let mut prompt = String::from(
        "请阅读以下文献列表，为撰写文献综述设计一个两级分类体系（大类 -> 小类）。\n",
    );
    match n_main {
        Some(n) if n > 0 => prompt.push_str(&format!("大类数量为 {} 个。\n", n)),
        _ => prompt.push_str("大类数量请根据文献内容自行确定。\n"),
    }
    match m_sub {
        Some(0) => prompt.push_str("大类下不需要小类。\n"),
        Some(m) => prompt.push_str(&format!("每个大类下最多 {} 个小类。\n", m)),
        None => {}
    }
    prompt.push_str(
        "所有类别名称使用简洁的中文且互不重复。\n\
         输出 JSON，格式为 {\"main_categories\": [{\"name\": \"大类名称\", \"sub_categories\": [\"小类名称\"]}]}。\n\
         文献信息如下：\n",
    );

    for (index, paper) in papers.iter().enumerate() {
        let year = paper
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "未知".to_string());
        prompt.push_str(&format!(
            "\n[{}] 标题：{}\n作者：{}\n年份：{}\n摘要：{}\n",
            index + 1,
            paper.title,
            paper.authors.join(", "),
            year,
            truncate_chars(&paper.abstract_text, ABSTRACT_BUDGET, "..."),
        ));
    }
    prompt
}

fn entry_name(value: &Value) -> Option<String> {
    let name = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("name")?.as_str()?,
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// 名称去空白、丢弃空名与重复名，再按 n_main / m_sub 校验与截断
fn normalize_suggestion(
    raw: Option<&Value>,
    n_main: Option<usize>,
    m_sub: Option<usize>,
) -> ReviewResult<Schema> {
    let items = raw.and_then(Value::as_array).ok_or_else(|| {
        ReviewError::SchemaSuggestionFailed("缺少 main_categories 列表".to_string())
    })?;

    let mut mains: Vec<(String, Vec<String>)> = Vec::new();
    for item in items {
        let Some(name) = entry_name(item) else {
            continue;
        };
        if mains.iter().any(|(existing, _)| *existing == name) {
            continue;
        }
        let mut children: Vec<String> = Vec::new();
        if let Some(subs) = item.get("sub_categories").and_then(Value::as_array) {
            for sub in subs.iter().filter_map(entry_name) {
                if sub != name && !children.contains(&sub) {
                    children.push(sub);
                }
            }
        }
        mains.push((name, children));
    }

    let n_main = n_main.filter(|n| *n > 0);
    if let Some(n) = n_main {
        if mains.len() < n {
            return Err(ReviewError::SchemaSuggestionFailed(format!(
                "需要 {} 个大类，模型只给出 {} 个",
                n,
                mains.len()
            )));
        }
        mains.truncate(n);
    }
    if mains.is_empty() {
        return Err(ReviewError::SchemaSuggestionFailed(
            "模型没有给出可用的大类".to_string(),
        ));
    }

    // 小类与其他类别重名时丢弃，保证名称全局唯一
    let main_names: HashSet<String> = mains.iter().map(|(name, _)| name.clone()).collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut schema = Schema::new();
    // 只有最终保留的小类才占用名称
    let limit = m_sub.unwrap_or(usize::MAX);
    for (name, children) in mains {
        let mut kept: Vec<String> = Vec::new();
        for sub in children {
            if kept.len() >= limit {
                break;
            }
            if main_names.contains(&sub) || taken.contains(&sub) {
                continue;
            }
            taken.insert(sub.clone());
            kept.push(sub);
        }
        schema.add_main(&name, &kept)?;
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn paper(id: usize, abstract_text: &str) -> PaperEntry {
        PaperEntry::new(id, "Title", abstract_text, vec!["Author".to_string()], Some(2022), "")
    }

    #[test]
    fn normalization_trims_and_dedupes() {
        let raw = json!([
            {"name": "  信号处理 ", "sub_categories": ["去噪", " 去噪 ", "", {"name": "滤波"}]},
            {"name": ""},
            {"name": "信号处理", "sub_categories": ["重复大类"]},
            {"name": "故障诊断", "sub_categories": ["去噪", "深度学习"]}
        ]);
        let schema = normalize_suggestion(Some(&raw), None, None).unwrap();

        assert_eq!(schema.main_names(), vec!["信号处理", "故障诊断"]);
        assert_eq!(schema.children_of("信号处理"), ["去噪".to_string(), "滤波".to_string()]);
        assert_eq!(schema.children_of("故障诊断"), ["深度学习".to_string()]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn too_few_mains_fails() {
        let raw = json!([{"name": "A"}]);
        let result = normalize_suggestion(Some(&raw), Some(2), None);
        assert!(matches!(result, Err(ReviewError::SchemaSuggestionFailed(_))));
    }

    #[test]
    fn m_sub_truncates_children() {
        let raw = json!([
            {"name": "A", "sub_categories": ["A1", "A2", "A3"]},
            {"name": "B", "sub_categories": ["B1"]},
            {"name": "C"}
        ]);
        let schema = normalize_suggestion(Some(&raw), Some(2), Some(2)).unwrap();
        assert_eq!(schema.main_names(), vec!["A", "B"]);
        assert_eq!(schema.children_of("A").len(), 2);

        let flat = normalize_suggestion(Some(&raw), None, Some(0)).unwrap();
        assert!(flat.main_nodes().all(|node| node.children.is_empty()));
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn m_sub_limit_applies_before_collision_check() {
        let raw = json!([
            {"name": "A", "sub_categories": ["A1", "Shared"]},
            {"name": "B", "sub_categories": ["Shared"]}
        ]);
        let schema = normalize_suggestion(Some(&raw), None, Some(1)).unwrap();

        assert_eq!(schema.children_of("A"), ["A1".to_string()]);
        assert_eq!(schema.children_of("B"), ["Shared".to_string()]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn prompt_truncates_long_abstracts() {
        let long = "x".repeat(500);
        let prompt = build_prompt(&[paper(0, &long)], Some(3), None);
        assert!(prompt.contains(&format!("{}...", "x".repeat(400))));
        assert!(!prompt.contains(&"x".repeat(401)));
        assert!(prompt.contains("大类数量为 3 个"));
        assert!(prompt.contains("年份：2022"));
    }

    #[tokio::test]
    async fn uses_model_suggestion() {
        let backend = Scripted::new(Ok(
            r#"{"main_categories": [{"name": "降噪", "sub_categories": ["小波"]}]}"#,
        ));
        let builder = LlmSchemaBuilder::new(backend.clone());
        let schema = builder
            .build(&[paper(0, "abs")], &SchemaRequest::default())
            .await
            .unwrap();
        assert_eq!(schema.main_names(), vec!["降噪"]);
        assert_eq!(backend.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_numeric_schema() {
        let backend = Scripted::new(Ok(r#"{"main_categories": [{"name": "唯一"}]}"#));
        let builder = LlmSchemaBuilder::new(backend);
        let request = SchemaRequest {
            taxonomy: None,
            n_main: Some(2),
            m_sub: Some(1),
        };
        let schema = builder.build(&[paper(0, "")], &request).await.unwrap();
        assert_eq!(schema.main_names(), vec!["自动主类1", "自动主类2"]);
        assert_eq!(schema.len(), 4);
    }

    #[tokio::test]
    async fn backend_error_falls_back_to_placeholder() {
        let builder = LlmSchemaBuilder::new(Scripted::new(Err("connection refused")));
        let schema = builder
            .build(&[paper(0, "")], &SchemaRequest::default())
            .await
            .unwrap();
        assert_eq!(schema.main_names(), vec![super::super::FALLBACK_CATEGORY]);
    }

    #[tokio::test]
    async fn taxonomy_skips_the_model() {
        let backend = Scripted::new(Err("must not be called"));
        let builder = LlmSchemaBuilder::new(backend.clone());
        let request = SchemaRequest {
            taxonomy: Some(super::super::Taxonomy::from_yaml_str("- name: T\n").unwrap()),
            ..SchemaRequest::default()
        };
        let schema = builder.build(&[], &request).await.unwrap();
        assert_eq!(schema.main_names(), vec!["T"]);
        assert!(backend.prompts.lock().unwrap().is_empty());
    }
}
