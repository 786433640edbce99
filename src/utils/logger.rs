use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志；`verbose` 时默认级别提升到 debug（会打印模型的 prompt 与原始返回）
pub fn init_logger(verbose: bool) {
    let default_level = if verbose { "paper_review=debug" } else { "paper_review=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
