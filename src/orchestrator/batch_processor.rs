//! 批量文章处理器 - 编排层
//!
//! ## 职责
//!
//! 持有一次运行的全部状态：待处理队列、结果表、统计、失败列表。
//!
//! ## 核心功能
//!
//! 1. **加载**：校验 CSV 表并转换为 `ArticleJob`，缺列或有无效行时整批拒绝
//! 2. **分批处理**：每次从队列取出至多 `batch_size` 篇，本批全部结束后再开始下一批
//! 3. **并发执行**：本批每篇文章一个 `tokio::spawn` 任务
//! 4. **失败隔离**：单篇失败（包括任务 panic）只记录为 failed，不影响同批其他文章
//! 5. **节流**：每批结束后等待 `batch_delay`
//!
//! ## 状态机
//!
//! `Idle → Loading → Draining → Completed`，完成后不可复用。

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, BusinessError, ValidationError};
use crate::models::{ArticleJob, ArticleTable, BatchResult, DataValidator, ResultStatus};
use crate::orchestrator::run_stats::{FailureTracker, ProcessingStats};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{ArticleCtx, ArticleProcessor};

/// 处理器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    Loading,
    Draining,
    Completed,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessorState::Idle => "idle",
            ProcessorState::Loading => "loading",
            ProcessorState::Draining => "draining",
            ProcessorState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// 批量文章处理器
pub struct ArticleBatchProcessor {
    processor: Arc<dyn ArticleProcessor>,
    validator: DataValidator,
    batch_size: usize,
    batch_delay: Duration,
    ingest_date: NaiveDate,
    state: ProcessorState,
    queue: VecDeque<ArticleJob>,
    processed: Vec<ArticleJob>,
    results: HashMap<String, BatchResult>,
    stats: ProcessingStats,
    failed: FailureTracker,
}

impl ArticleBatchProcessor {
    /// 创建批处理器，`batch_size` 为 0 时返回配置错误
    pub fn new(
        processor: Arc<dyn ArticleProcessor>,
        batch_size: usize,
        batch_delay: Duration,
    ) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::invalid_config("batch_size", "必须大于 0"));
        }

        Ok(Self {
            processor,
            validator: DataValidator::new(),
            batch_size,
            batch_delay,
            ingest_date: Local::now().date_naive(),
            state: ProcessorState::Idle,
            queue: VecDeque::new(),
            processed: Vec::new(),
            results: HashMap::new(),
            stats: ProcessingStats::new(),
            failed: FailureTracker::new(),
        })
    }

    /// 指定入库日期（用于生成文章ID）
    pub fn with_ingest_date(mut self, date: NaiveDate) -> Self {
        self.ingest_date = date;
        self
    }

    /// 加载并入队，返回入队数量
    ///
    /// 缺少必需列返回 `ValidationError::MissingColumns`，
    /// 文章ID重复返回 `ValidationError::DuplicateId`，
    /// 存在其他无效行返回 `ValidationError::InvalidRows`；这些情况都不会入队任何文章。
    pub fn load(&mut self, table: &ArticleTable) -> AppResult<usize> {
        match self.state {
            ProcessorState::Idle => {}
            ProcessorState::Completed => return Err(BusinessError::ProcessorCompleted.into()),
            state => {
                return Err(BusinessError::ProcessorNotIdle {
                    state: state.to_string(),
                }
                .into())
            }
        }
        self.state = ProcessorState::Loading;

        let jobs = match self.build_jobs(table) {
            Ok(jobs) => jobs,
            Err(e) => {
                self.state = ProcessorState::Idle;
                return Err(e);
            }
        };

        for job in jobs {
            self.results
                .insert(job.id().to_string(), BatchResult::queued(job.id()));
            self.queue.push_back(job);
        }
        self.stats.set_total(self.queue.len());

        info!("✓ 已入队 {} 篇文章", self.queue.len());
        Ok(self.queue.len())
    }

    fn build_jobs(&self, table: &ArticleTable) -> AppResult<Vec<ArticleJob>> {
        let missing = self.validator.missing_columns(table);
        if !missing.is_empty() {
            error!("❌ 输入缺少必需的列: {}", missing.join(", "));
            return Err(ValidationError::MissingColumns(missing).into());
        }

        let mut seen_ids = HashSet::new();
        for row in &table.rows {
            let id = row.get("id").map(|v| v.trim()).unwrap_or("");
            if !id.is_empty() && !seen_ids.insert(id) {
                error!("❌ 输入中文章ID重复: {}", id);
                return Err(ValidationError::DuplicateId(id.to_string()).into());
            }
        }

        let report = self.validator.validate(table);
        if !report.is_valid() {
            return Err(ValidationError::InvalidRows {
                count: report.invalid,
                errors: report.errors(),
            }
            .into());
        }

        table
            .rows
            .iter()
            .map(|row| ArticleJob::from_row(row, self.ingest_date))
            .collect()
    }

    /// 分批处理队列中的全部文章
    ///
    /// 处理结束后状态为 `Completed`，统计冻结。
    pub async fn process_batch(&mut self) -> AppResult<()> {
        match self.state {
            ProcessorState::Idle | ProcessorState::Loading => {}
            ProcessorState::Completed => return Err(BusinessError::ProcessorCompleted.into()),
            ProcessorState::Draining => {
                return Err(BusinessError::ProcessorNotIdle {
                    state: self.state.to_string(),
                }
                .into())
            }
        }
        self.state = ProcessorState::Draining;
        self.stats.start();

        let total = self.queue.len();
        let total_batches = total.div_ceil(self.batch_size);
        let mut batch_num = 0;
        let mut dispatched = 0;

        loop {
            let take = self.batch_size.min(self.queue.len());
            if take == 0 {
                break;
            }
            batch_num += 1;

            let batch: Vec<ArticleJob> = self.queue.drain(..take).collect();
            log_batch_start(batch_num, total_batches, dispatched + 1, dispatched + take, total);
            dispatched += take;

            let completed_before = self.stats.completed;
            self.run_batch(batch_num, batch).await;
            log_batch_complete(batch_num, self.stats.completed - completed_before, take);

            if !self.batch_delay.is_zero() {
                info!("⏳ 等待 {:.1} 秒后继续...", self.batch_delay.as_secs_f64());
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        self.stats.finish();
        self.state = ProcessorState::Completed;
        Ok(())
    }

    /// 并发处理一批，等待全部结束；先结束的先记录
    async fn run_batch(&mut self, batch_num: usize, batch: Vec<ArticleJob>) {
        let mut pending = FuturesUnordered::new();

        for (idx, job) in batch.into_iter().enumerate() {
            let ctx = ArticleCtx::new(job.id(), batch_num, idx + 1);
            // 任务 panic 时用快照记录失败，快照的重试次数为 0
            let snapshot = job.clone();
            let processor = Arc::clone(&self.processor);

            let handle = tokio::spawn(async move {
                let mut job = job;
                let outcome = processor.process_article(&mut job, &ctx).await;
                (job, outcome)
            });
            pending.push(async move { (snapshot, handle.await) });
        }

        while let Some((snapshot, joined)) = pending.next().await {
            match joined {
                Ok((job, Ok(result))) => self.record(job, result),
                Ok((job, Err(e))) => {
                    error!("[文章 {}] ❌ 处理过程中发生错误: {}", job.id(), e);
                    let result = BatchResult::failed(job.id(), e.to_string());
                    self.record(job, result);
                }
                Err(e) => {
                    error!("[文章 {}] 任务执行失败: {}", snapshot.id(), e);
                    let result = BatchResult::failed(snapshot.id(), format!("任务执行失败: {}", e));
                    self.record(snapshot, result);
                }
            }
        }
    }

    /// 写入结果：只允许 queued → completed / failed
    fn record(&mut self, mut job: ArticleJob, mut result: BatchResult) {
        let id = job.id().to_string();

        if let Some(existing) = self.results.get(&id) {
            if existing.status.is_terminal() {
                warn!("[文章 {}] 已有终态结果，忽略重复结果", id);
                return;
            }
        }

        if result.status == ResultStatus::Queued {
            result = BatchResult::failed(&id, "处理结束但没有终态结果");
        }
        result.id = id.clone();

        match result.status {
            ResultStatus::Completed => self.stats.record_completed(),
            _ => {
                job.mark_failed();
                self.stats.record_failed();
                self.failed.record(job.clone());
            }
        }

        self.results.insert(id, result);
        self.processed.push(job);
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 队列中尚未处理的文章数
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn results(&self) -> &HashMap<String, BatchResult> {
        &self.results
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    pub fn failed_items(&self) -> &[ArticleJob] {
        self.failed.items()
    }

    /// 已离开队列的文章（终态）
    pub fn processed_jobs(&self) -> &[ArticleJob] {
        &self.processed
    }

    /// `id → 标题`
    pub fn titles(&self) -> HashMap<String, String> {
        self.processed
            .iter()
            .chain(self.queue.iter())
            .map(|job| (job.id().to_string(), job.title.clone()))
            .collect()
    }
}
