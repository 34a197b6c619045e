//! 重试适配器 - 基础设施层
//!
//! 指数退避：`delay = min(max_delay, max(min_delay, base_delay * 2^attempt))`，
//! `attempt` 为刚失败的那次尝试的下标（从 0 开始）。

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 重试策略
///
/// 不保留任何调用间状态，可以随意复制。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    min_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// 创建重试策略
    ///
    /// `max_attempts` 为 0 或下限大于上限时返回配置错误。
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        min_delay: Duration,
        max_delay: Duration,
    ) -> AppResult<Self> {
        if max_attempts == 0 {
            return Err(AppError::invalid_config("max_attempts", "必须大于 0"));
        }
        if min_delay > max_delay {
            return Err(AppError::invalid_config(
                "min_delay",
                format!("{:?} 大于 max_delay {:?}", min_delay, max_delay),
            ));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            min_delay,
            max_delay,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_millis(config.retry_min_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 `attempt` 次（从 0 开始）失败后的等待时间
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .max(self.min_delay)
            .min(self.max_delay)
    }

    /// 执行操作，失败时按策略重试
    pub async fn call<T, F, Fut>(&self, operation: &str, op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut retries = 0;
        self.call_counted(operation, &mut retries, op).await
    }

    /// 执行操作并把重试次数累加到 `retries`
    ///
    /// 不可重试的错误（配置、校验等）直接返回；
    /// 重试耗尽后返回 `AppError::TransientApiFailure`，其中包含最后一次的错误。
    pub async fn call_counted<T, F, Fut>(
        &self,
        operation: &str,
        retries: &mut u32,
        mut op: F,
    ) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt + 1 >= self.max_attempts => {
                    return Err(AppError::TransientApiFailure {
                        operation: operation.to_string(),
                        attempts: self.max_attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "{} 失败 (尝试 {}/{}): {}，{:.1} 秒后重试...",
                        operation,
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    *retries += 1;
                    attempt += 1;
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}
