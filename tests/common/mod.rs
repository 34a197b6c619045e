//! 集成测试共用的内存实现
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use seo_article_batch::services::{ContentGenerator, ResearchProvider};
use seo_article_batch::{
    AppError, AppResult, ArticleCtx, ArticleJob, ArticleProcessor, ArticleTable, BatchResult,
    JobStatus, RateLimiter, RetryPolicy,
};

pub const HEADERS: [&str; 4] = ["id", "title", "keyword", "secondary_keywords"];

pub fn ingest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
}

pub fn table(rows: &[&[&str]]) -> ArticleTable {
    ArticleTable::from_rows(&HEADERS, rows)
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(
        3,
        Duration::from_millis(1),
        Duration::from_millis(1),
        Duration::from_millis(5),
    )
    .unwrap()
}

/// 研究 API 替身：指定关键词总是返回 503
#[derive(Default)]
pub struct FakeResearch {
    failing: HashSet<String>,
    limiter: Option<Arc<RateLimiter>>,
    pub calls: AtomicUsize,
}

impl FakeResearch {
    pub fn failing_on(keywords: &[&str]) -> Self {
        Self {
            failing: keywords.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResearchProvider for FakeResearch {
    async fn research(
        &self,
        primary_keyword: &str,
        secondary_keywords: &[String],
        _query: Option<&str>,
    ) -> AppResult<String> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(primary_keyword) {
            return Err(AppError::bad_status("fake-research", 503, "unavailable"));
        }
        Ok(format!(
            "investigación sobre {} ({})",
            primary_keyword,
            secondary_keywords.join(", ")
        ))
    }
}

/// 写作替身：返回提示词中的关键词行，便于断言内容来自哪篇文章
pub struct KeywordEchoWriter;

#[async_trait]
impl ContentGenerator for KeywordEchoWriter {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let keyword_line = prompt
            .lines()
            .find(|l| l.starts_with("2. Palabra clave principal:"))
            .unwrap_or("sin palabra clave");
        Ok(keyword_line.to_string())
    }
}

/// 关键词为 `boom` 时 panic 的处理器
pub struct PanickyProcessor;

#[async_trait]
impl ArticleProcessor for PanickyProcessor {
    async fn process_article(
        &self,
        job: &mut ArticleJob,
        _ctx: &ArticleCtx,
    ) -> AppResult<BatchResult> {
        job.advance(JobStatus::Processing)?;
        if job.primary_keyword == "boom" {
            panic!("处理器崩溃: {}", job.id());
        }
        job.advance(JobStatus::Completed)?;
        Ok(BatchResult::completed(
            job.id(),
            "datos".into(),
            format!("contenido {}", job.title),
            Vec::new(),
            Default::default(),
        ))
    }
}
