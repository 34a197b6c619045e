//! 运行统计与失败记录
//!
//! 只由批处理器修改；`end_time` 设置后统计冻结。

use chrono::{DateTime, Duration, Local};
use serde::Serialize;

use crate::models::ArticleJob;

/// 处理统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_frozen(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn set_total(&mut self, total: usize) {
        if !self.is_frozen() {
            self.total = total;
        }
    }

    /// 记录开始时间（只记录第一次）
    pub fn start(&mut self) {
        if self.start_time.is_none() && !self.is_frozen() {
            self.start_time = Some(Local::now());
        }
    }

    pub fn record_completed(&mut self) {
        if !self.is_frozen() {
            self.completed += 1;
        }
    }

    pub fn record_failed(&mut self) {
        if !self.is_frozen() {
            self.failed += 1;
        }
    }

    /// 设置结束时间并冻结
    pub fn finish(&mut self) {
        if !self.is_frozen() {
            self.end_time = Some(Local::now());
        }
    }

    /// 已到终态的文章数
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// 成功率（0-1），没有处理任何文章时为 `None`
    pub fn success_rate(&self) -> Option<f64> {
        let processed = self.processed();
        (processed > 0).then(|| self.completed as f64 / processed as f64)
    }
}

/// 失败文章记录，只追加
#[derive(Debug, Clone, Default)]
pub struct FailureTracker {
    items: Vec<ArticleJob>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, job: ArticleJob) {
        self.items.push(job);
    }

    pub fn items(&self) -> &[ArticleJob] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_freeze_after_finish() {
        let mut stats = ProcessingStats::new();
        stats.set_total(3);
        stats.start();
        stats.record_completed();
        stats.record_failed();
        stats.finish();

        stats.record_completed();
        stats.set_total(10);
        assert_eq!((stats.total, stats.completed, stats.failed), (3, 1, 1));
        assert!(stats.elapsed().is_some());
        assert_eq!(stats.success_rate(), Some(0.5));
    }

    #[test]
    fn empty_run_has_no_success_rate() {
        let stats = ProcessingStats::new();
        assert_eq!(stats.processed(), 0);
        assert_eq!(stats.success_rate(), None);
        assert!(stats.elapsed().is_none());
    }

    #[test]
    fn failures_keep_insertion_order() {
        let mut tracker = FailureTracker::new();
        tracker.record(ArticleJob::new("b", "B", "k2", vec![]));
        tracker.record(ArticleJob::new("a", "A", "k1", vec![]));

        let ids: Vec<&str> = tracker.items().iter().map(|j| j.id()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(tracker.len(), 2);
    }
}
