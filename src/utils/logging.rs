/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::orchestrator::CommandOutcome;

/// 初始化日志
///
/// `RUST_LOG` 优先；未设置时默认 `info`，`verbose` 为 true 时为 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 测试中可能重复初始化
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `command`: 命令名称
/// - `root_url`: XNAT 地址
/// - `dry_run`: 是否为演练模式
pub fn log_startup(command: &str, root_url: &str, dry_run: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", command);
    if dry_run {
        info!("📁 演练模式：只保存到本地，不上传");
    } else {
        info!("🌐 XNAT: {}", root_url);
    }
    info!("{}", "=".repeat(60));
}

/// 打印导出结果
pub fn log_export_summary(command: &str, outcome: &CommandOutcome) {
    info!("\n{}", "─".repeat(60));
    info!("📊 {} 完成", command);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("结果: {}", outcome.summary());
    info!("{}", "─".repeat(60));
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
