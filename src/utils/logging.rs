/// 日志工具模块
///
/// 初始化 tracing 订阅器，提供日志格式化的辅助函数
use std::path::Path;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// 默认日志过滤规则（`RUST_LOG` 优先）
const DEFAULT_FILTER: &str = "yuanbao_gateway=info,tower_http=info";

/// 初始化日志：同时输出到终端和日志文件
///
/// # 返回
/// 返回文件写入器的 guard，调用方需持有到进程结束，否则缓冲的日志会丢失
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let path = Path::new(&config.log_file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app.log".to_string());

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    Ok(guard)
}

/// 在 [`init`] 之前执行 `f`（例如读取配置），期间的日志临时输出到终端
pub fn before_init<T>(f: impl FnOnce() -> T) -> T {
    scoped(std::io::stdout, f)
}

fn scoped<W, T>(writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt().with_writer(writer).with_target(false).finish();
    tracing::subscriber::with_default(subscriber, f)
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 程序配置
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 服务启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📊 最大标签页数量: {}", config.max_workers);
    info!("🌐 目标页面: {}", config.target_url);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
