//! 输入数据校验
//!
//! 结构校验（必需列）失败时整批拒绝；行校验给出每一行的错误列表。

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{error, warn};

use crate::models::loaders::ArticleTable;

/// 必需的列
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "title", "keyword", "secondary_keywords"];

/// 可选的自定义研究问题列
pub const QUERY_COLUMN: &str = "PerplexityQuery";

/// 标题最大长度（字符）
pub const MAX_TITLE_LEN: usize = 150;

/// 无效行
#[derive(Debug, Clone, Serialize)]
pub struct InvalidRow {
    /// 从 1 开始的行号（不含表头）
    pub row: usize,
    pub errors: Vec<String>,
}

/// 校验报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub missing_columns: Vec<String>,
    pub invalid_rows: Vec<InvalidRow>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing_columns.is_empty() && self.invalid == 0
    }

    /// 所有错误信息（扁平化）
    pub fn errors(&self) -> Vec<String> {
        self.invalid_rows
            .iter()
            .flat_map(|r| r.errors.iter().cloned())
            .collect()
    }
}

/// 数据校验器
#[derive(Debug, Clone, Default)]
pub struct DataValidator;

impl DataValidator {
    pub fn new() -> Self {
        Self
    }

    /// 缺失的必需列
    pub fn missing_columns(&self, table: &ArticleTable) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|col| !table.has_column(col))
            .map(|col| col.to_string())
            .collect()
    }

    /// 校验表结构
    pub fn validate_csv_structure(&self, table: &ArticleTable) -> bool {
        let missing = self.missing_columns(table);
        if !missing.is_empty() {
            error!("缺少必需的列: {:?}", missing);
            return false;
        }
        true
    }

    /// 校验单行，`index` 为从 0 开始的行下标
    pub fn validate_row(&self, row: &HashMap<String, String>, index: usize) -> (bool, Vec<String>) {
        let mut errors = Vec::new();
        let line = index + 1;
        let cell = |name: &str| row.get(name).map(|v| v.trim()).unwrap_or("");

        if cell("id").is_empty() {
            errors.push(format!("第 {} 行: id 为空", line));
        }

        let title = cell("title");
        if title.is_empty() {
            errors.push(format!("第 {} 行: 标题为空", line));
        } else if title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!(
                "第 {} 行: 标题超过 {} 个字符",
                line, MAX_TITLE_LEN
            ));
        }

        if cell("keyword").is_empty() {
            errors.push(format!("第 {} 行: 主关键词为空", line));
        }

        (errors.is_empty(), errors)
    }

    /// 校验整张表，生成报告
    ///
    /// 纯函数，对同一张表重复调用结果相同。
    pub fn validate(&self, table: &ArticleTable) -> ValidationReport {
        let mut report = ValidationReport {
            total: table.len(),
            missing_columns: self.missing_columns(table),
            ..Default::default()
        };
        if !report.missing_columns.is_empty() {
            error!("缺少必需的列: {:?}", report.missing_columns);
            return report;
        }

        let mut seen_ids = HashSet::new();
        for (index, row) in table.rows.iter().enumerate() {
            let (mut ok, mut errors) = self.validate_row(row, index);

            let id = row.get("id").map(|v| v.trim()).unwrap_or("");
            if !id.is_empty() && !seen_ids.insert(id.to_string()) {
                ok = false;
                errors.push(format!("第 {} 行: id {} 重复", index + 1, id));
            }

            if ok {
                report.valid += 1;
            } else {
                warn!("行校验失败: {:?}", errors);
                report.invalid += 1;
                report.invalid_rows.push(InvalidRow {
                    row: index + 1,
                    errors,
                });
            }
        }

        report
    }
}
