//! 基于两字母标签的记录累积与字段抽取，供 RIS / RefWorks 共用。

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::PaperEntry;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year regex"));
static AUTHOR_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;；、]+").expect("author regex"));

/// 一条原始记录：标签 -> 按出现顺序的取值
#[derive(Debug, Default, Clone)]
pub struct TaggedRecord {
    fields: IndexMap<String, Vec<String>>,
    last_tag: Option<String>,
}

impl TaggedRecord {
    pub fn push(&mut self, tag: &str, value: &str) {
        self.fields
            .entry(tag.to_string())
            .or_default()
            .push(value.trim().to_string());
        self.last_tag = Some(tag.to_string());
    }

    /// 续行追加到最近一次出现的标签
    pub fn continue_last(&mut self, line: &str) -> bool {
        match &self.last_tag {
            Some(tag) => {
                if let Some(values) = self.fields.get_mut(tag) {
                    values.push(line.trim().to_string());
                }
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_content(&self) -> bool {
        self.fields
            .values()
            .any(|values| values.iter().any(|v| !v.is_empty()))
    }

    /// 依次收集多个标签的全部取值
    pub fn values(&self, tags: &[&str]) -> Vec<&str> {
        tags.iter()
            .filter_map(|tag| self.fields.get(*tag))
            .flat_map(|values| values.iter().map(String::as_str))
            .collect()
    }

    pub fn joined(&self, tags: &[&str]) -> String {
        self.values(tags).join(" ").trim().to_string()
    }

    /// 按标签优先级扫描年份，返回第一处匹配
    pub fn year(&self, tags: &[&str]) -> Option<i32> {
        tags.iter()
            .filter_map(|tag| self.fields.get(*tag))
            .find_map(|values| extract_year(&values.join(" ")))
    }
}

/// 字段映射：各语义字段对应的标签（按优先级）
pub struct FieldTags {
    pub authors: &'static [&'static str],
    pub title: &'static [&'static str],
    pub abstract_text: &'static [&'static str],
    pub year: &'static [&'static str],
    pub venue: &'static [&'static str],
}

impl FieldTags {
    pub fn build_entry(&self, id: usize, record: &TaggedRecord) -> PaperEntry {
        let authors = normalize_authors(record.values(self.authors));
        let title = record.joined(self.title);
        let abstract_text = self
            .abstract_text
            .iter()
            .map(|tag| record.joined(&[*tag]))
            .find(|text| !text.is_empty())
            .unwrap_or_default();
        let year = record.year(self.year);
        let venue = record.joined(self.venue);

        PaperEntry::new(id, &title, &abstract_text, authors, year, &venue)
    }
}

/// 第一处 19xx / 20xx 四位年份
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// 拆分以分号、顿号拼接的作者字段并去除空白
pub fn normalize_authors<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    raw.into_iter()
        .flat_map(|value| AUTHOR_SPLIT_RE.split(value))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
