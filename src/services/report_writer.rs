//! 报告写入服务 - 业务能力层
//!
//! 只负责"写报告文件"能力，不关心流程

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{ArticleJob, BatchResult, ValidationReport};

/// 失败列表文件名
pub const FAILED_ITEMS_FILE: &str = "failed_items.txt";

/// 报告写入服务
///
/// 职责：
/// - 写校验报告 `validation_report_<时间戳>.txt`
/// - 追加失败文章到 `failed_items.txt`，供下次重跑
pub struct ReportWriter {
    report_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.report_dir)
            .map_err(|e| AppError::file_write_failed(self.report_dir.display().to_string(), e))
    }

    /// 写入校验报告，返回文件路径
    pub fn write_validation_report(&self, report: &ValidationReport) -> AppResult<PathBuf> {
        self.ensure_dir()?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .report_dir
            .join(format!("validation_report_{}.txt", timestamp));

        let mut text = String::from("=== 校验报告 ===\n\n");
        text.push_str(&format!("总行数: {}\n", report.total));
        text.push_str(&format!("有效行: {}\n", report.valid));
        text.push_str(&format!("无效行: {}\n\n", report.invalid));

        if !report.missing_columns.is_empty() {
            text.push_str(&format!(
                "缺少必需的列: {}\n\n",
                report.missing_columns.join(", ")
            ));
        }

        if !report.invalid_rows.is_empty() {
            text.push_str("错误明细:\n");
            for row in &report.invalid_rows {
                text.push_str(&format!("\n第 {} 行:\n", row.row));
                for error in &row.errors {
                    text.push_str(&format!("- {}\n", error));
                }
            }
        }

        fs::write(&path, text)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        info!("📝 校验报告已生成: {}", path.display());
        Ok(path)
    }

    /// 追加失败文章，每行 `id | 标题 | 关键词 | 错误`
    pub fn write_failed_items(
        &self,
        failed: &[ArticleJob],
        results: &HashMap<String, BatchResult>,
    ) -> AppResult<Option<PathBuf>> {
        if failed.is_empty() {
            return Ok(None);
        }
        self.ensure_dir()?;

        let path = self.report_dir.join(FAILED_ITEMS_FILE);
        debug!("写入 {} 条失败记录: {}", failed.len(), path.display());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        for job in failed {
            let error = results
                .get(job.id())
                .and_then(|r| r.error.as_deref())
                .unwrap_or("未知错误");
            let line = format!(
                "{} | {} | {} | {}\n",
                job.id(),
                job.title,
                job.primary_keyword,
                error.replace('\n', " ")
            );
            file.write_all(line.as_bytes())
                .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        }

        info!("📝 失败列表已写入: {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvalidRow;

    #[test]
    fn validation_report_lists_row_errors() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports"));
        let report = ValidationReport {
            total: 3,
            valid: 2,
            invalid: 1,
            missing_columns: Vec::new(),
            invalid_rows: vec![InvalidRow {
                row: 2,
                errors: vec!["标题为空".to_string()],
            }],
        };

        let path = writer.write_validation_report(&report).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("validation_report_") && name.ends_with(".txt"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("总行数: 3"));
        assert!(text.contains("第 2 行:\n- 标题为空"));
    }

    #[test]
    fn failed_items_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let job = ArticleJob::new("20240309_2", "B", "k2", vec![]);
        let results = HashMap::from([(
            "20240309_2".to_string(),
            BatchResult::failed("20240309_2", "no research data obtained"),
        )]);

        writer.write_failed_items(&[job.clone()], &results).unwrap();
        let path = writer.write_failed_items(&[job], &results).unwrap().unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(
            text.lines().next().unwrap(),
            "20240309_2 | B | k2 | no research data obtained"
        );
    }

    #[test]
    fn nothing_failed_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports"));
        assert!(writer
            .write_failed_items(&[], &HashMap::new())
            .unwrap()
            .is_none());
        assert!(!dir.path().join("reports").exists());
    }
}
