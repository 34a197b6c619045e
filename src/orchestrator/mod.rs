//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量文章处理器
//! - 持有队列、结果表、统计、失败列表
//! - 分批取出文章，每批并发处理（tokio::spawn）
//! - 批与批之间节流
//!
//! ### `run_stats` - 运行统计
//! - 完成 / 失败计数，开始 / 结束时间
//! - 失败文章列表
//!
//! ### `app` - 应用入口
//! - 组装客户端、限流器、服务和编排器
//! - 读取 CSV → 处理 → 备份 → 导出 → 报告
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! batch_processor (处理 Vec<ArticleJob>)
//!     ↓
//! workflow::ResearchOrchestrator (处理单篇文章)
//!     ↓
//! services (能力层：研究 / 写作 / 内链 / 检测)
//!     ↓
//! clients + infrastructure (HTTP、限流、重试)
//! ```

pub mod app;
pub mod batch_processor;
pub mod run_stats;

// 重新导出主要类型
pub use app::App;
pub use batch_processor::{ArticleBatchProcessor, ProcessorState};
pub use run_stats::{FailureTracker, ProcessingStats};
