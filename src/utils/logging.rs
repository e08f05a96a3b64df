/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::BatchStats;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则根据 `verbose` 使用 debug 或 info。重复调用无副作用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 日志中使用的文件名
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 发电报告处理");
    info!("📂 输入目录: {}", config.input_folder.display());
    info!("📂 输出目录: {}", config.output_folder.display());
    info!("📂 归档目录: {}", config.processed_folder.display());
    info!("📄 参考数据: {}", config.reference_data_path.display());
    info!("📊 调度模式: {}", config.dispatch_mode());
    info!("{}", "=".repeat(60));
}

/// 打印积压批次统计
pub fn print_final_stats(stats: &BatchStats) {
    info!("\n{}", "=".repeat(60));
    info!("📊 积压文件处理统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.completed, stats.total);
    info!("❌ 失败: {}", stats.failed);
    if stats.skipped > 0 {
        info!("⏭️ 跳过: {}", stats.skipped);
    }
    if stats.not_scheduled > 0 {
        info!("⏸️ 未调度: {}", stats.not_scheduled);
    }
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_file_name() {
        assert_eq!(file_label(Path::new("/in/01-Basic.xml")), "01-Basic.xml");
        assert_eq!(file_label(Path::new("/")), "/");
    }
}
