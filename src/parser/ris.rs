use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::record::{FieldTags, TaggedRecord};
use super::BibliographyParser;
use crate::models::PaperEntry;
use crate::utils::{ReviewError, ReviewResult};

// "XX  - value"；部分导出工具会去掉 "ER  -" 之后的空格
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z0-9]{2})  -(?: (.*))?$").expect("ris tag regex"));

const FIELDS: FieldTags = FieldTags {
    authors: &["AU", "A1"],
    title: &["TI", "T1"],
    abstract_text: &["AB", "N2"],
    year: &["PY", "Y1"],
    venue: &["JO", "JF", "T2"],
};

/// RIS 解析器，记录以 `ER` 标签结束
pub struct RisParser;

impl BibliographyParser for RisParser {
    fn name(&self) -> &'static str {
        "ris"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".ris"]
    }

    fn parse_str(&self, content: &str) -> ReviewResult<Vec<PaperEntry>> {
        let content = content.trim_start_matches('\u{feff}');
        let mut records: Vec<TaggedRecord> = Vec::new();
        let mut current = TaggedRecord::default();

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let Some(caps) = TAG_RE.captures(line) else {
                if !current.continue_last(line) {
                    debug!("忽略记录外的行: {}", line);
                }
                continue;
            };

            let tag = &caps[1];
            let value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            if tag == "ER" {
                if !current.is_empty() {
                    records.push(std::mem::take(&mut current));
                }
            } else {
                current.push(tag, value);
            }
        }
        if !current.is_empty() {
            records.push(current);
        }

        if records.is_empty() {
            return Err(ReviewError::ParseError(
                "未能从 RIS 文件中解析出任何记录".to_string(),
            ));
        }

        Ok(records
            .iter()
            .enumerate()
            .map(|(index, record)| FIELDS.build_entry(index, record))
            .collect())
    }
}
