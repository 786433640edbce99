pub mod record;
pub mod refworks;
pub mod ris;

pub use refworks::RefWorksParser;
pub use ris::RisParser;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::models::PaperEntry;
use crate::utils::{ReviewError, ReviewResult};

/// 文献导出文件解析器
pub trait BibliographyParser: Send + Sync {
    /// 格式名称，例如 `ris`
    fn name(&self) -> &'static str;

    /// 该格式对应的扩展名（含点号）
    fn extensions(&self) -> &'static [&'static str];

    /// 解析内存中的文本
    fn parse_str(&self, content: &str) -> ReviewResult<Vec<PaperEntry>>;

    /// 读取并解析文件
    fn parse(&self, path: &Path) -> ReviewResult<Vec<PaperEntry>> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReviewError::ParseError(format!("无法读取文件 {}: {}", path.display(), e))
        })?;
        let papers = self.parse_str(&content).map_err(|e| match e {
            ReviewError::ParseError(msg) => {
                ReviewError::ParseError(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })?;
        info!("解析 {} 完成，共 {} 篇文献", path.display(), papers.len());
        Ok(papers)
    }
}

/// 格式名 / 扩展名 -> 解析器
pub struct ParserRegistry {
    parsers: BTreeMap<String, Arc<dyn BibliographyParser>>,
    formats: Vec<&'static str>,
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self {
            parsers: BTreeMap::new(),
            formats: Vec::new(),
        }
    }

    /// 注册内置的 RIS 与 RefWorks 解析器
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(RisParser));
        registry.register(Arc::new(RefWorksParser));
        registry
    }

    pub fn register(&mut self, parser: Arc<dyn BibliographyParser>) {
        let name = parser.name();
        debug!("注册解析器: {} {:?}", name, parser.extensions());
        self.parsers.insert(name.to_lowercase(), Arc::clone(&parser));
        for ext in parser.extensions() {
            self.parsers.insert(ext.to_lowercase(), Arc::clone(&parser));
        }
        if !self.formats.contains(&name) {
            self.formats.push(name);
        }
    }

    /// 按格式名或扩展名查找（大小写不敏感，扩展名可省略点号）
    pub fn get(&self, identifier: &str) -> ReviewResult<Arc<dyn BibliographyParser>> {
        let normalized = identifier.trim().to_lowercase();
        let dotted = if normalized.starts_with('.') {
            normalized.clone()
        } else {
            format!(".{}", normalized)
        };

        self.parsers
            .get(&normalized)
            .or_else(|| self.parsers.get(&dotted))
            .cloned()
            .ok_or_else(|| ReviewError::UnknownFormatError {
                requested: identifier.to_string(),
                available: self.available_formats(),
            })
    }

    /// 显式格式优先，否则使用文件扩展名
    pub fn resolve(
        &self,
        path: &Path,
        format: Option<&str>,
    ) -> ReviewResult<Arc<dyn BibliographyParser>> {
        match format {
            Some(format) => self.get(format),
            None => {
                let ext = path
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                self.get(&ext)
            }
        }
    }

    pub fn available_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.formats.iter().map(|f| f.to_string()).collect();
        formats.sort();
        formats
    }

    /// 某个格式注册的全部标识（格式名 + 扩展名）
    pub fn identifiers_for(&self, format: &str) -> Vec<String> {
        self.parsers
            .iter()
            .filter(|(_, parser)| parser.name() == format)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
