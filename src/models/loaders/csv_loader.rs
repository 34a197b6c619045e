use std::collections::HashMap;
use std::path::Path;

use tokio::fs;

use crate::error::{AppError, AppResult, FileError};

/// 从 CSV 读出的原始表格
///
/// 每一行是 列名 → 单元格 的映射，单元格已去掉首尾空白。
#[derive(Debug, Clone, Default)]
pub struct ArticleTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl ArticleTable {
    /// 由列名和行数据直接构建（测试和程序内构造用）
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|cells| {
                headers
                    .iter()
                    .cloned()
                    .zip(cells.iter().map(|c| c.trim().to_string()))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

/// 解析 CSV 文本
pub fn parse_article_table(content: &str) -> Result<ArticleTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let row: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(row);
    }

    Ok(ArticleTable { headers, rows })
}

/// 读取 CSV 文件
pub async fn read_article_table(path: &Path) -> AppResult<ArticleTable> {
    let path_str = path.display().to_string();
    if !path.exists() {
        return Err(FileError::NotFound { path: path_str }.into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;

    let table = parse_article_table(&content).map_err(|source| {
        AppError::File(FileError::CsvParseFailed {
            path: path_str.clone(),
            source,
        })
    })?;

    tracing::info!("成功读取 {} 行: {}", table.len(), path_str);
    Ok(table)
}
