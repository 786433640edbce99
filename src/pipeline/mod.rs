//! 综述生成流水线：解析 → 分类体系 → 分类 → 总结 → 导出。

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::classifier::{CategoryAssigner, DefaultCategoryAssigner, LlmCategoryAssigner};
use crate::config::SummaryStyle;
use crate::exporter::{self, ExportOptions};
use crate::llm::ChatBackend;
use crate::models::{PaperEntry, Schema};
use crate::parser::ParserRegistry;
use crate::schema::{DefaultSchemaBuilder, LlmSchemaBuilder, SchemaBuilder, SchemaRequest, Taxonomy};
use crate::summarizer::{FailurePolicy, LlmSummarizer, Summarizer, TemplateSummarizer};
use crate::utils::progress::ProgressReporter;
use crate::utils::{ReviewError, ReviewResult};

pub const OUTPUT_FILE: &str = "review.md";
const STAGES: usize = 5;

/// 输入：单个导出文件，或一个按文件分组的目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File {
        path: PathBuf,
        format: Option<String>,
    },
    Directory {
        path: PathBuf,
        format: Option<String>,
    },
}

impl InputSource {
    /// `--input` 与 `--input-dir` 必须且只能给一个
    pub fn from_args(
        file: Option<PathBuf>,
        dir: Option<PathBuf>,
        format: Option<String>,
    ) -> ReviewResult<Self> {
        match (file, dir) {
            (Some(path), None) => Ok(Self::File { path, format }),
            (None, Some(path)) => Ok(Self::Directory { path, format }),
            (Some(_), Some(_)) => Err(ReviewError::InvalidInput(
                "--input 与 --input-dir 不能同时指定".to_string(),
            )),
            (None, None) => Err(ReviewError::InvalidInput(
                "需要指定 --input 或 --input-dir".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: InputSource,
    pub out_dir: PathBuf,
    /// 声明式分类体系（YAML）
    pub taxonomy: Option<PathBuf>,
    pub n_main: Option<usize>,
    pub m_sub: Option<usize>,
}

/// 一次运行的完整结果，`run` 只负责把 markdown 落盘
#[derive(Debug, Clone)]
pub struct ReviewDraft {
    pub papers: Vec<PaperEntry>,
    pub schema: Schema,
    pub markdown: String,
}

pub struct ReviewPipeline {
    registry: ParserRegistry,
    schema_builder: Box<dyn SchemaBuilder>,
    assigner: Box<dyn CategoryAssigner>,
    summarizer: Box<dyn Summarizer>,
    export: ExportOptions,
}

impl ReviewPipeline {
    pub fn new(
        registry: ParserRegistry,
        schema_builder: Box<dyn SchemaBuilder>,
        assigner: Box<dyn CategoryAssigner>,
        summarizer: Box<dyn Summarizer>,
        export: ExportOptions,
    ) -> Self {
        Self {
            registry,
            schema_builder,
            assigner,
            summarizer,
            export,
        }
    }

    /// 不依赖模型的确定性流水线
    pub fn template(export: ExportOptions) -> Self {
        Self::new(
            ParserRegistry::new(),
            Box::new(DefaultSchemaBuilder),
            Box::new(DefaultCategoryAssigner),
            Box::new(TemplateSummarizer),
            export,
        )
    }

    /// 分类体系、分类、总结都交给模型；`fallback` 决定摘要失败时是否退回模板
    pub fn with_backend(
        backend: Arc<dyn ChatBackend>,
        style: SummaryStyle,
        fallback: bool,
        export: ExportOptions,
    ) -> Self {
        let policy = if fallback {
            FailurePolicy::Fallback(Box::new(TemplateSummarizer))
        } else {
            FailurePolicy::Abort
        };
        Self::new(
            ParserRegistry::new(),
            Box::new(LlmSchemaBuilder::new(Arc::clone(&backend))),
            Box::new(LlmCategoryAssigner::new(Arc::clone(&backend))),
            Box::new(LlmSummarizer::new(backend, style, policy)),
            export,
        )
    }

    /// 执行全部阶段并返回结果（不写文件）
    pub async fn generate(&self, options: &RunOptions) -> ReviewResult<ReviewDraft> {
        let mut progress = ProgressReporter::new(STAGES);
        progress.start("开始生成文献综述草稿");

        let (mut papers, schema) = match &options.source {
            InputSource::File { path, format } => {
                let mut papers = self.parse_file(path, format.as_deref())?;
                progress.advance(&format!("解析完成，共 {} 篇文献", papers.len()));

                let request = SchemaRequest {
                    taxonomy: load_taxonomy(options.taxonomy.as_deref())?,
                    n_main: options.n_main,
                    m_sub: options.m_sub,
                };
                let schema = self.schema_builder.build(&papers, &request).await?;
                progress.advance(&format!("分类体系就绪，共 {} 个类别", schema.len()));

                self.assigner.assign(&mut papers, &schema).await?;
                progress.advance("文献分类完成");
                (papers, schema)
            }
            InputSource::Directory { path, format } => {
                if options.taxonomy.is_some() || options.n_main.is_some() || options.m_sub.is_some() {
                    warn!("目录模式按文件名分组，忽略分类体系相关参数");
                }
                let (papers, schema) = self.parse_directory(path, format.as_deref())?;
                progress.advance(&format!("解析完成，共 {} 篇文献", papers.len()));
                progress.advance(&format!("按文件名生成 {} 个大类", schema.len()));
                progress.advance("目录模式沿用文件分组，跳过分类");
                (papers, schema)
            }
        };

        for paper in papers.iter_mut() {
            paper.summary_zh = self.summarizer.summarize(paper).await?;
        }
        progress.advance("文献总结完成");

        let markdown = exporter::export(&papers, &schema, &self.export);
        progress.advance("Markdown 渲染完成");

        Ok(ReviewDraft {
            papers,
            schema,
            markdown,
        })
    }

    /// 生成并写入 `{out_dir}/review.md`，返回输出路径
    pub async fn run(&self, options: &RunOptions) -> ReviewResult<PathBuf> {
        let draft = self.generate(options).await?;

        tokio::fs::create_dir_all(&options.out_dir).await?;
        let out_path = options.out_dir.join(OUTPUT_FILE);
        tokio::fs::write(&out_path, draft.markdown.as_bytes()).await?;
        info!("综述草稿已写入: {}", out_path.display());
        Ok(out_path)
    }

    fn parse_file(&self, path: &Path, format: Option<&str>) -> ReviewResult<Vec<PaperEntry>> {
        if path.is_dir() {
            return Err(ReviewError::InvalidInput(format!(
                "{} 是目录，请使用 --input-dir",
                path.display()
            )));
        }
        self.registry.resolve(path, format)?.parse(path)
    }

    /// 目录中每个可识别的文件对应一个大类（文件名去扩展名）
    fn parse_directory(
        &self,
        dir: &Path,
        format: Option<&str>,
    ) -> ReviewResult<(Vec<PaperEntry>, Schema)> {
        if !dir.is_dir() {
            return Err(ReviewError::InvalidInput(format!(
                "{} 不是目录",
                dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut papers: Vec<PaperEntry> = Vec::new();
        let mut stems: BTreeSet<String> = BTreeSet::new();
        for file in files {
            let parser = match self.registry.resolve(&file, format) {
                Ok(parser) => parser,
                Err(e) => {
                    debug!("跳过 {}: {}", file.display(), e);
                    continue;
                }
            };
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            for mut paper in parser.parse(&file)? {
                paper.id = papers.len();
                paper.key = format!("paper_{}", paper.id + 1);
                paper.set_category(Some(stem.clone()), None);
                papers.push(paper);
            }
            stems.insert(stem);
        }

        if stems.is_empty() {
            return Err(ReviewError::ParseError(format!(
                "目录 {} 中没有可识别的文献文件（支持: {}）",
                dir.display(),
                self.registry.available_formats().join(", ")
            )));
        }

        let mut schema = Schema::new();
        for stem in &stems {
            schema.add_main(stem, &[])?;
        }
        Ok((papers, schema))
    }
}

fn load_taxonomy(path: Option<&Path>) -> ReviewResult<Option<Taxonomy>> {
    path.map(Taxonomy::load).transpose()
}
