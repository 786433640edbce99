use once_cell::sync::Lazy;
use regex::Regex;

use super::record::{FieldTags, TaggedRecord};
use super::BibliographyParser;
use crate::models::PaperEntry;
use crate::utils::{ReviewError, ReviewResult};

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z0-9]{2})\s+(.*)$").expect("refworks tag regex"));

const FIELDS: FieldTags = FieldTags {
    authors: &["A1", "A2", "A3", "A4", "A5", "AU"],
    title: &["T1", "TI"],
    abstract_text: &["AB"],
    year: &["YR", "PY"],
    venue: &["JF", "JO", "T2", "PB"],
};

/// RefWorks 带标签文本导出；空行或新的 `RT` 标签开始下一条记录
pub struct RefWorksParser;

impl RefWorksParser {
    fn flush(records: &mut Vec<TaggedRecord>, current: &mut TaggedRecord) {
        let record = std::mem::take(current);
        if record.has_content() {
            records.push(record);
        }
    }
}

impl BibliographyParser for RefWorksParser {
    fn name(&self) -> &'static str {
        "refworks"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".refworks", ".txt"]
    }

    fn parse_str(&self, content: &str) -> ReviewResult<Vec<PaperEntry>> {
        let content = content.trim_start_matches('\u{feff}');
        let mut records: Vec<TaggedRecord> = Vec::new();
        let mut current = TaggedRecord::default();

        for line in content.lines() {
            if line.trim().is_empty() {
                Self::flush(&mut records, &mut current);
                continue;
            }

            let Some(caps) = TAG_RE.captures(line) else {
                current.continue_last(line);
                continue;
            };

            let tag = &caps[1];
            if tag == "RT" && !current.is_empty() {
                Self::flush(&mut records, &mut current);
            }
            current.push(tag, &caps[2]);
        }
        Self::flush(&mut records, &mut current);

        if records.is_empty() {
            return Err(ReviewError::ParseError(
                "未能从 RefWorks 文件中解析出任何记录，请确认格式是否为带标签的导出".to_string(),
            ));
        }

        Ok(records
            .iter()
            .enumerate()
            .map(|(index, record)| FIELDS.build_entry(index, record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blank_line_separated_records() {
        let text = "\
RT Journal Article
A1 Smith, John
A2 Doe, Jane
T1 Bearing fault detection
JF Journal of Sound and Vibration
YR 2018
AB Short abstract
   continued here

RT Conference Proceedings
AU Liu, Yang
TI Gearbox monitoring
PY 2020
PB IEEE
";
        let papers = RefWorksParser.parse_str(text).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].authors, vec!["Smith, John", "Doe, Jane"]);
        assert_eq!(papers[0].abstract_text, "Short abstract continued here");
        assert_eq!(papers[0].year, Some(2018));
        assert_eq!(papers[0].venue, "Journal of Sound and Vibration");
        assert_eq!(papers[1].key, "paper_2");
        assert_eq!(papers[1].venue, "IEEE");
        assert_eq!(papers[1].year, Some(2020));
    }

    #[test]
    fn rt_starts_new_record_without_blank_line() {
        let text = "RT Journal\nT1 First\nRT Journal\nT1 Second\n";
        let papers = RefWorksParser.parse_str(text).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[1].title, "Second");
    }

    #[test]
    fn yr_preferred_over_py() {
        let text = "T1 Paper\nPY 1999\nYR 2004\n";
        let papers = RefWorksParser.parse_str(text).unwrap();
        assert_eq!(papers[0].year, Some(2004));
    }

    #[test]
    fn no_records_is_parse_error() {
        assert!(matches!(
            RefWorksParser.parse_str("\n\nnot a tagged line\n"),
            Err(ReviewError::ParseError(_))
        ));
    }
}
