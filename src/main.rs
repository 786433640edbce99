use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use paper_review::config::{AppConfig, Engine, SortOrder, SummaryStyle, DEFAULT_CONFIG_PATH};
use paper_review::exporter::ExportOptions;
use paper_review::llm::ChatClient;
use paper_review::parser::ParserRegistry;
use paper_review::pipeline::{InputSource, ReviewPipeline, RunOptions};
use paper_review::schema::Taxonomy;
use paper_review::utils::logger;

#[derive(Parser)]
#[command(name = "paper-review")]
#[command(about = "根据 RIS / RefWorks 导出文件生成分组的文献综述草稿", long_about = None)]
struct Cli {
    /// 输出调试日志（包括模型 prompt 与原始返回）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 生成综述草稿 review.md
    Review(ReviewArgs),
    /// 生成默认配置与示例分类体系
    Init {
        /// 配置目录
        #[arg(long, default_value = "config")]
        dir: PathBuf,
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
    /// 列出支持的文献格式
    Formats,
}

#[derive(Args)]
struct ReviewArgs {
    /// 单个文献导出文件
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// 文献目录，每个文件作为一个大类
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// 输出目录
    #[arg(short, long)]
    out_dir: PathBuf,
    /// 强制指定格式（ris / refworks 或扩展名）
    #[arg(short, long)]
    format: Option<String>,
    /// 声明式分类体系 YAML
    #[arg(long)]
    categories: Option<PathBuf>,
    /// 大类数量
    #[arg(long)]
    n_main: Option<usize>,
    /// 每个大类的小类数量
    #[arg(long)]
    m_sub: Option<usize>,
    /// none / asc / desc
    #[arg(long)]
    sort_by_year: Option<SortOrder>,
    /// template / llm
    #[arg(long)]
    engine: Option<Engine>,
    /// single / structured / bullets
    #[arg(long)]
    summary_style: Option<SummaryStyle>,
    /// 模型摘要失败时直接报错
    #[arg(long)]
    no_fallback: bool,
    /// 不输出作者/年份/期刊行
    #[arg(long)]
    no_citation: bool,
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// 配置文件路径
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init_logger(cli.verbose);

    match cli.command {
        Commands::Review(args) => {
            review_command(args).await?;
        }
        Commands::Init { dir, force } => {
            init_command(&dir, force).await?;
        }
        Commands::Formats => {
            formats_command();
        }
    }

    Ok(())
}

async fn review_command(args: ReviewArgs) -> Result<()> {
    let mut config = AppConfig::load(&args.config)?;
    apply_overrides(&mut config, &args);

    let source = InputSource::from_args(args.input, args.input_dir, args.format)?;
    let export = ExportOptions {
        sort_by_year: config.review.sort_by_year,
        citation_line: config.review.citation_line,
    };

    let pipeline = match config.review.engine {
        Engine::Template => ReviewPipeline::template(export),
        Engine::Llm => {
            if !config.llm.is_configured() {
                bail!("engine=llm 需要 API key，请设置 --api-key、DEEPSEEK_API_KEY 或 config/settings.toml 中的 llm.api_key");
            }
            let client = ChatClient::new(config.llm.clone())?;
            info!("使用模型: {}", client.model());
            ReviewPipeline::with_backend(
                Arc::new(client),
                config.review.summary_style,
                config.review.summary_fallback,
                export,
            )
        }
    };

    let options = RunOptions {
        source,
        out_dir: args.out_dir,
        taxonomy: args.categories,
        n_main: args.n_main,
        m_sub: args.m_sub,
    };
    let out_path = pipeline.run(&options).await?;

    info!("✅ 完成: {}", out_path.display());
    Ok(())
}

/// 命令行参数覆盖配置文件与环境变量
fn apply_overrides(config: &mut AppConfig, args: &ReviewArgs) {
    if let Some(engine) = args.engine {
        config.review.engine = engine;
    }
    if let Some(order) = args.sort_by_year {
        config.review.sort_by_year = order;
    }
    if let Some(style) = args.summary_style {
        config.review.summary_style = style;
    }
    if args.no_fallback {
        config.review.summary_fallback = false;
    }
    if args.no_citation {
        config.review.citation_line = false;
    }
    if let Some(key) = args.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
        config.llm.api_key = key.clone();
    }
    if let Some(url) = &args.api_url {
        config.llm.api_url = url.clone();
    }
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }
}

async fn init_command(dir: &Path, force: bool) -> Result<()> {
    info!("初始化配置...");
    tokio::fs::create_dir_all(dir).await?;

    let settings_path = dir.join("settings.toml");
    if settings_path.exists() && !force {
        warn!("{} 已存在，跳过（使用 --force 覆盖）", settings_path.display());
    } else {
        AppConfig::default().save(&settings_path)?;
        info!("已生成配置文件: {}", settings_path.display());
    }

    let categories_path = dir.join("categories.yaml");
    if categories_path.exists() && !force {
        warn!("{} 已存在，跳过（使用 --force 覆盖）", categories_path.display());
    } else {
        let yaml = Taxonomy::example().to_yaml()?;
        tokio::fs::write(&categories_path, yaml)
            .await
            .with_context(|| format!("写入失败: {}", categories_path.display()))?;
        info!("已生成示例分类体系: {}", categories_path.display());
    }

    info!("下一步:");
    info!("  1. 编辑 {} 配置 API key（engine = \"llm\" 时需要）", settings_path.display());
    info!("  2. 按需修改 {}", categories_path.display());
    info!("  3. 运行 'paper-review review --input refs.ris --out-dir output'");
    Ok(())
}

fn formats_command() {
    let registry = ParserRegistry::new();
    for format in registry.available_formats() {
        let identifiers = registry.identifiers_for(&format);
        println!("{:<10} {}", format, identifiers.join(", "));
    }
}
