//! # SEO Article Batch
//!
//! 批量生成 SEO 文章：读取 CSV → 研究 → 写作 → 可选 AI 检测 → 备份 / 导出
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 与业务无关的能力
//! - `RateLimiter` - 60 秒滑动窗口限流
//! - `RetryPolicy` - 指数退避重试
//!
//! ### ② 客户端（Clients）
//! - `clients/` - 外部 API 的薄封装（LLM、向量、AI 检测、文档存储）
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇文章
//! - `ResearchService` / `WritingService` - 研究与写作能力
//! - `InternalLinkService` - 内链能力
//! - `BackupService` / `ReportWriter` - 持久化与报告
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一篇文章"的完整处理流程
//! - `ArticleCtx` - 上下文封装（批次 + 文章ID）
//! - `ResearchOrchestrator` - 流程编排（研究 → 内链 → 写作 → 检测）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量文章处理器，管理队列和并发
//! - `orchestrator/app` - 应用入口，组装依赖并运行
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{RateLimiter, RetryPolicy};
pub use models::{ArticleJob, ArticleTable, BatchResult, DataValidator, JobStatus, ResultStatus};
pub use orchestrator::{App, ArticleBatchProcessor, ProcessingStats, ProcessorState};
pub use workflow::{ArticleCtx, ArticleProcessor, ResearchOrchestrator};
