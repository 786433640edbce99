use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;

const SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// 外部对话模型：输入 prompt，返回文本
///
/// 单次调用，不做自动重试；失败由调用方按各自策略处理。
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// 对话接口请求体（OpenAI 兼容）
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// 对话接口响应体
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs.max(1)));

        if !config.proxy.is_empty() {
            match reqwest::Proxy::all(&config.proxy) {
                Ok(proxy) => {
                    info!("使用代理: {}", config.proxy);
                    builder = builder.proxy(proxy);
                }
                Err(e) => {
                    warn!("代理配置无效 '{}': {}", config.proxy, e);
                }
            }
        }

        let client = builder.build().context("创建 HTTP 客户端失败")?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn do_request(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            stream: false,
            response_format: self
                .config
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("发送请求失败")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API 返回错误 {}: {}", status, body);
        }

        let chat_response: ChatResponse = response.json().await.context("解析 API 响应失败")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            anyhow::bail!("API 返回内容为空");
        }
        Ok(content)
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("模型请求 Prompt:\n{}", prompt);
        let content = self.do_request(prompt).await?;
        debug!("模型返回:\n{}", content);
        Ok(content)
    }
}

/// 从模型输出中取出 JSON 对象；整体不是 JSON 时截取首个 `{` 到最后一个 `}`
pub fn extract_json_object(content: &str) -> Option<serde_json::Map<String, Value>> {
    let as_object = |text: &str| match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    };

    as_object(content.trim()).or_else(|| {
        let start = content.find('{')?;
        let end = content.rfind('}')?;
        if start < end {
            as_object(&content[start..=end])
        } else {
            None
        }
    })
}
