pub mod logger;
pub mod progress;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("不支持的文献格式 '{requested}'，可用格式: {}", available.join(", "))]
    UnknownFormatError {
        requested: String,
        available: Vec<String>,
    },

    #[error("分类体系格式错误: {0}")]
    SchemaFormatError(String),

    #[error("分类体系推断失败: {0}")]
    SchemaSuggestionFailed(String),

    #[error("文献分类失败: {0}")]
    ClassificationFailed(String),

    #[error("摘要生成失败: {0}")]
    SummaryFailed(String),

    #[error("输入参数错误: {0}")]
    InvalidInput(String),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ReviewResult<T> = Result<T, ReviewError>;

/// 按字符（而非字节）截断文本，超出时追加 `marker`
pub fn truncate_chars(text: &str, limit: usize, marker: &str) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", text[..cut].trim_end(), marker),
        None => text.to_string(),
    }
}

/// 把所有连续空白折叠为单个空格
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("深度学习方法", 4, "……"), "深度学习……");
        assert_eq!(truncate_chars("短文本", 10, "……"), "短文本");
        assert_eq!(truncate_chars("abc def", 4, "..."), "abc...");
    }

    #[test]
    fn collapse_whitespace_joins_lines() {
        assert_eq!(collapse_whitespace("  a\n\tb   c "), "a b c");
    }

    #[test]
    fn unknown_format_message_lists_formats() {
        let err = ReviewError::UnknownFormatError {
            requested: ".bib".to_string(),
            available: vec!["refworks".to_string(), "ris".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains(".bib"));
        assert!(message.contains("refworks, ris"));
    }
}
