//! 滑动窗口限流器 - 基础设施层
//!
//! 保证任意 60 秒窗口内的调用次数不超过 `calls_per_minute`。
//! 等待时间只按最旧的一条记录计算，并发突发时可能多等一会儿。

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

const WINDOW: Duration = Duration::from_secs(60);

/// 限流器
///
/// 职责：
/// - 记录窗口内的调用时间戳
/// - `acquire()` 只会延迟，不会失败
/// - 计数检查和追加在同一个临界区内完成，并发调用方不会重复计数
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    calls_per_minute: usize,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// 创建限流器，`calls_per_minute` 为 0 时返回配置错误
    pub fn new(name: impl Into<String>, calls_per_minute: usize) -> AppResult<Self> {
        let name = name.into();
        if calls_per_minute == 0 {
            return Err(AppError::invalid_config(
                format!("{}.calls_per_minute", name),
                "必须大于 0",
            ));
        }
        Ok(Self {
            name,
            calls_per_minute,
            calls: Mutex::new(VecDeque::with_capacity(calls_per_minute)),
        })
    }

    pub fn calls_per_minute(&self) -> usize {
        self.calls_per_minute
    }

    /// 获取一次调用许可，必要时等待
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;
        let now = Instant::now();

        while let Some(&oldest) = calls.front() {
            if now.duration_since(oldest) >= WINDOW {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() >= self.calls_per_minute {
            if let Some(&oldest) = calls.front() {
                let wait = WINDOW.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    info!(
                        "⏳ [{}] 达到限流上限 {}/分钟，等待 {:.1} 秒",
                        self.name,
                        self.calls_per_minute,
                        wait.as_secs_f64()
                    );
                    sleep(wait).await;
                }
            }
            calls.pop_front();
        }

        calls.push_back(Instant::now());
        debug!("[{}] 窗口内调用数: {}", self.name, calls.len());
    }

    /// 当前窗口内记录的调用数
    pub async fn recent_calls(&self) -> usize {
        let calls = self.calls.lock().await;
        let now = Instant::now();
        calls
            .iter()
            .filter(|&&t| now.duration_since(t) < WINDOW)
            .count()
    }
}
