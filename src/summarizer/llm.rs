use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::Summarizer;
use crate::config::SummaryStyle;
use crate::llm::{extract_json_object, ChatBackend};
use crate::models::PaperEntry;
use crate::utils::{ReviewError, ReviewResult};

/// 模型摘要失败时的处理方式，在构造时明确选定
pub enum FailurePolicy {
    /// 直接返回 `SummaryFailed`
    Abort,
    /// 改用备用摘要器的结果
    Fallback(Box<dyn Summarizer>),
}

pub struct LlmSummarizer {
    backend: Arc<dyn ChatBackend>,
    style: SummaryStyle,
    policy: FailurePolicy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SingleSummary {
    summary: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StructuredSummary {
    problem: String,
    approach: String,
    impact: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BulletSummary {
    overview: String,
    bullet_points: Vec<String>,
}

impl LlmSummarizer {
    pub fn new(backend: Arc<dyn ChatBackend>, style: SummaryStyle, policy: FailurePolicy) -> Self {
        Self {
            backend,
            style,
            policy,
        }
    }

    async fn try_summarize(&self, paper: &PaperEntry) -> ReviewResult<String> {
        let prompt = format!(
            "{}\n标题：{}\n作者：{}\n摘要：{}",
            prompt_header(self.style),
            paper.title,
            paper.authors.join(", "),
            paper.abstract_text
        );

        let response = self
            .backend
            .complete(&prompt)
            .await
            .map_err(|e| ReviewError::SummaryFailed(format!("模型调用失败: {:#}", e)))?;

        let payload = extract_json_object(&response)
            .ok_or_else(|| ReviewError::SummaryFailed("模型返回中没有 JSON 对象".to_string()))?;
        let payload = serde_json::Value::Object(payload);

        let body = match self.style {
            SummaryStyle::Single => {
                let parsed: SingleSummary = parse_payload(payload)?;
                non_empty(&[parsed.summary.trim()])
            }
            SummaryStyle::Structured => {
                let parsed: StructuredSummary = parse_payload(payload)?;
                let approach = parsed.approach.trim();
                let problem = parsed.problem.trim();
                let approach = (!approach.is_empty()).then(|| format!("提出{}", approach));
                let problem = (!problem.is_empty()).then(|| format!("以解决{}", problem));
                let segments: Vec<&str> = [approach.as_deref(), problem.as_deref(), Some(parsed.impact.trim())]
                    .into_iter()
                    .flatten()
                    .collect();
                non_empty(&segments)
            }
            SummaryStyle::Bullets => {
                let parsed: BulletSummary = parse_payload(payload)?;
                let points: Vec<&str> = parsed
                    .bullet_points
                    .iter()
                    .map(|p| p.trim().trim_end_matches(['。', '；', ';']))
                    .filter(|p| !p.is_empty())
                    .collect();
                let points = (!points.is_empty()).then(|| format!("要点包括：{}。", points.join("；")));
                non_empty(&[parsed.overview.trim(), points.as_deref().unwrap_or("")])
            }
        }
        .ok_or_else(|| ReviewError::SummaryFailed("模型返回的字段全部为空".to_string()))?;

        Ok(format!("{}，{}", render_prefix(paper), body))
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, paper: &PaperEntry) -> ReviewResult<String> {
        match self.try_summarize(paper).await {
            Ok(text) => {
                debug!("[{}] 摘要结果：{}", paper.key, text);
                Ok(text)
            }
            Err(e) => match &self.policy {
                FailurePolicy::Abort => Err(e),
                FailurePolicy::Fallback(fallback) => {
                    warn!("[{}] {}，改用备用摘要", paper.key, e);
                    fallback.summarize(paper).await
                }
            },
        }
    }
}

fn prompt_header(style: SummaryStyle) -> &'static str {
    match style {
        SummaryStyle::Single => {
            "请阅读以下文献信息，用一到两句中文概括其研究内容与主要贡献。\n\
             输出 JSON，键为 summary，内容不超过 120 字。\n原始信息如下："
        }
        SummaryStyle::Structured => {
            "请阅读以下文献信息，总结研究所解决的问题(problem)、提出的方案(approach)以及最突出的贡献(impact)。\n\
             输出 JSON，对应键为 problem、approach、impact，每个字段均为不超过 60 字的中文句子。\n\
             如果缺少信息，可留空字符串。\n原始信息如下："
        }
        SummaryStyle::Bullets => {
            "请阅读以下文献信息，给出一句中文概述(overview)和若干条要点(bullet_points)。\n\
             输出 JSON，键为 overview（字符串）与 bullet_points（字符串列表，最多 3 条）。\n原始信息如下："
        }
    }
}

fn render_prefix(paper: &PaperEntry) -> String {
    let title = paper.title.trim();
    if title.is_empty() {
        format!("{}等人", paper.first_author)
    } else {
        format!("{}等人针对《{}》研究", paper.first_author, title)
    }
}

fn parse_payload<T: for<'de> Deserialize<'de>>(payload: serde_json::Value) -> ReviewResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| ReviewError::SummaryFailed(format!("模型返回字段格式错误: {}", e)))
}

fn non_empty(segments: &[&str]) -> Option<String> {
    let kept: Vec<&str> = segments
        .iter()
        .copied()
        .filter(|segment| !segment.is_empty())
        .collect();
    (!kept.is_empty()).then(|| kept.join("，"))
}
