use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化与格式化辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 日志级别可通过 `RUST_LOG` 环境变量覆盖，默认 info。
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
    Ok(())
}

/// 记录一次作答的完成摘要
pub fn log_run_summary(applied: usize) {
    info!("{}", "─".repeat(60));
    info!(
        "✅ 作答完成: 应用 {} 个答案 ({})",
        applied,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
