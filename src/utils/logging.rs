/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};
use crate::orchestrator::ProcessingStats;

/// 初始化 tracing 订阅器
///
/// 默认级别 `info`（`verbose` 时为 `debug`），`RUST_LOG` 优先。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n文章批处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `batch_size`: 每批文章数
/// - `max_retries`: 每次外部调用的最大尝试次数
pub fn log_startup(batch_size: usize, max_retries: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 文章批处理模式");
    info!("📊 每批文章数: {}", batch_size);
    info!("🔁 最大尝试次数: {}", max_retries);
    info!("{}", "=".repeat(60));
}

/// 记录文章加载信息
pub fn log_articles_loaded(total: usize, batch_size: usize) {
    info!("✓ 找到 {} 篇待处理的文章", total);
    info!("📋 将以每批 {} 篇的方式处理", batch_size);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始文章编号
/// - `end`: 结束文章编号
/// - `total`: 文章总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批文章: {}-{} / 共 {} 篇", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &ProcessingStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(elapsed) = stats.elapsed() {
        info!("耗时: {} 秒", elapsed.num_seconds());
    }
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.completed, stats.total);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("investigación", 5), "inves...");
        assert_eq!(truncate_text("corto", 10), "corto");
    }

    #[test]
    fn log_file_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        init_log_file(path.to_str().unwrap()).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("文章批处理日志"));
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
