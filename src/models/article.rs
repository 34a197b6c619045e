use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, BusinessError, ValidationError};

/// 文章处理状态
///
/// 单调迁移：pending → processing → {completed, failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// 是否为终态
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// 是否允许迁移到 `next`
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 一篇待生成的文章
///
/// `id` 由入库日期和源行号组成，创建后不可变；
/// `status` 只能通过 [`ArticleJob::advance`] 修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleJob {
    id: String,
    pub title: String,
    pub primary_keyword: String,
    pub secondary_keywords: Vec<String>,
    /// CSV 中 `PerplexityQuery` 列提供的自定义研究问题
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_query: Option<String>,
    status: JobStatus,
    retry_count: u32,
}

impl ArticleJob {
    /// 创建新的文章任务（状态为 pending）
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        primary_keyword: impl Into<String>,
        secondary_keywords: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            primary_keyword: primary_keyword.into(),
            secondary_keywords,
            research_query: None,
            status: JobStatus::Pending,
            retry_count: 0,
        }
    }

    pub fn with_research_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.research_query = if query.trim().is_empty() {
            None
        } else {
            Some(query)
        };
        self
    }

    /// 从 CSV 行构建任务
    ///
    /// 调用前应已通过 `DataValidator` 校验，这里只再检查必填字段是否为空。
    pub fn from_row(row: &HashMap<String, String>, ingest_date: NaiveDate) -> AppResult<Self> {
        let field = |name: &str| -> AppResult<String> {
            match row.get(name).map(|v| v.trim()) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(ValidationError::MissingColumns(vec![name.to_string()]).into()),
            }
        };

        let row_id = field("id")?;
        let title = field("title")?;
        let keyword = field("keyword")?;
        let secondary = row
            .get("secondary_keywords")
            .map(|raw| parse_secondary_keywords(raw))
            .unwrap_or_default();

        let mut job = Self::new(derive_id(ingest_date, &row_id), title, keyword, secondary);
        if let Some(query) = row.get("PerplexityQuery") {
            job = job.with_research_query(query.trim());
        }
        Ok(job)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// 状态迁移，非法迁移返回 `BusinessError::InvalidTransition`
    pub fn advance(&mut self, next: JobStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(BusinessError::InvalidTransition {
                id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            }
            .into());
        }
        self.status = next;
        Ok(())
    }

    /// 流程异常时由批处理器调用：未到终态的任务按 pending → processing → failed 进入失败
    pub fn mark_failed(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Processing;
        }
        if self.status == JobStatus::Processing {
            self.status = JobStatus::Failed;
        }
    }

    /// 累加重试次数，不超过 `cap`
    pub fn add_retries(&mut self, retries: u32, cap: u32) {
        self.retry_count = self.retry_count.saturating_add(retries).min(cap);
    }
}

/// 生成文章 ID：`YYYYMMDD_<行号>`
pub fn derive_id(ingest_date: NaiveDate, row_id: &str) -> String {
    format!("{}_{}", ingest_date.format("%Y%m%d"), row_id.trim())
}

/// 解析逗号分隔的次要关键词，去掉空白项
pub fn parse_secondary_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn id_is_derived_from_date_and_row() {
        assert_eq!(derive_id(date(), "7"), "20240309_7");
    }

    #[test]
    fn secondary_keywords_are_split_and_trimmed() {
        assert_eq!(parse_secondary_keywords(" s1, s2 ,,s3"), vec!["s1", "s2", "s3"]);
        assert!(parse_secondary_keywords("").is_empty());
    }

    #[test]
    fn from_row_builds_pending_job() {
        let job = ArticleJob::from_row(
            &row(&[
                ("id", "1"),
                ("title", "A"),
                ("keyword", "k1"),
                ("secondary_keywords", "s1,s2"),
                ("PerplexityQuery", ""),
            ]),
            date(),
        )
        .unwrap();
        assert_eq!(job.id(), "20240309_1");
        assert_eq!(job.secondary_keywords, vec!["s1", "s2"]);
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.research_query.is_none());
    }

    #[test]
    fn from_row_rejects_empty_keyword() {
        let result = ArticleJob::from_row(
            &row(&[("id", "1"), ("title", "A"), ("keyword", "  ")]),
            date(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn mark_failed_only_touches_unfinished_jobs() {
        let mut pending = ArticleJob::new("a", "t", "k", vec![]);
        pending.mark_failed();
        assert_eq!(pending.status(), JobStatus::Failed);
        assert!(pending.advance(JobStatus::Processing).is_err());

        let mut done = ArticleJob::new("b", "t", "k", vec![]);
        done.advance(JobStatus::Processing).unwrap();
        done.advance(JobStatus::Completed).unwrap();
        done.mark_failed();
        assert_eq!(done.status(), JobStatus::Completed);
    }

    #[test]
    fn status_moves_forward_only() {
        let mut job = ArticleJob::new("x", "t", "k", vec![]);
        assert!(job.advance(JobStatus::Completed).is_err());
        job.advance(JobStatus::Processing).unwrap();
        job.advance(JobStatus::Failed).unwrap();
        assert!(job.advance(JobStatus::Processing).is_err());
        assert!(job.status().is_terminal());
    }

    #[test]
    fn retry_count_is_capped() {
        let mut job = ArticleJob::new("x", "t", "k", vec![]);
        job.add_retries(2, 3);
        job.add_retries(5, 3);
        assert_eq!(job.retry_count(), 3);
    }
}
