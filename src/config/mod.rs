use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";
const ENV_PREFIX: &str = "PAPER_REVIEW";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub review: ReviewConfig,
}

/// OpenAI 兼容的对话接口配置（默认 DeepSeek）
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub proxy: String,
    /// 请求 `response_format = json_object`
    pub json_mode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub engine: Engine,
    pub sort_by_year: SortOrder,
    pub summary_style: SummaryStyle,
    /// 模型摘要失败时是否回退到模板摘要
    pub summary_fallback: bool,
    /// 每条文献前是否输出加粗的作者/年份/期刊行
    pub citation_line: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Template,
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    None,
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    Single,
    #[default]
    Structured,
    Bullets,
}

impl AppConfig {
    /// 读取配置文件（可缺省），再叠加 `PAPER_REVIEW__*` 环境变量
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("读取配置失败: {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("配置格式错误: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("写入配置失败: {}", path.display()))?;
        Ok(())
    }
}

impl LlmConfig {
    /// 检查 API key 是否已配置
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && self.api_key != "your-api-key"
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.deepseek.com/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.3,
            timeout_secs: 60,
            proxy: String::new(),
            json_mode: true,
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Template,
            sort_by_year: SortOrder::None,
            summary_style: SummaryStyle::Structured,
            summary_fallback: true,
            citation_line: true,
        }
    }
}

macro_rules! keyword_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        "无效取值 '{}'，可选: {}",
                        other,
                        [$($text),+].join(" / ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let text = match self {
                    $(Self::$variant => $text,)+
                };
                f.write_str(text)
            }
        }
    };
}

keyword_enum!(Engine { Template => "template", Llm => "llm" });
keyword_enum!(SortOrder { None => "none", Asc => "asc", Desc => "desc" });
keyword_enum!(SummaryStyle { Single => "single", Structured => "structured", Bullets => "bullets" });
