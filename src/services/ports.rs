//! 外部协作方接口
//!
//! 编排层只依赖这些 trait，具体实现（HTTP / LLM / 本地文件）在构造时注入，
//! 测试中用内存实现替换。

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::InternalLink;

/// 研究数据提供方
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// 根据关键词获取研究文本；`query` 为 CSV 中的自定义研究问题
    async fn research(
        &self,
        primary_keyword: &str,
        secondary_keywords: &[String],
        query: Option<&str>,
    ) -> AppResult<String>;
}

/// 正文生成方
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

/// 内链提供方
///
/// 从不向调用方返回错误，没有数据时返回空列表。
#[async_trait]
pub trait LinkProvider: Send + Sync {
    /// 是否已加载参考数据
    fn is_loaded(&self) -> bool;

    /// 按与关键词的相似度降序返回至多 `n` 条内链
    async fn find_relevant_links(&self, keyword: &str, n: usize) -> Vec<InternalLink>;
}

/// AI 检测结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub ai_score: f64,
    #[serde(default)]
    pub features: HashMap<String, f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// AI 检测与人性化改写
#[async_trait]
pub trait ContentValidator: Send + Sync {
    async fn analyze(&self, text: &str) -> AppResult<AiAnalysis>;

    async fn humanize(&self, text: &str, region: &str) -> AppResult<String>;
}

/// 文本向量化
#[async_trait]
pub trait Embedder: Send + Sync {
    /// 返回与 `texts` 一一对应的向量
    async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;
}

/// 本地备份
///
/// 失败时返回 `None`，不向调用方抛错。
#[async_trait]
pub trait BackupWriter: Send + Sync {
    async fn save(&self, content: &str, metadata: &serde_json::Value, id: &str)
        -> Option<PathBuf>;
}

/// 外部文档存储
///
/// 失败时返回 `None`，表示未持久化。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, content: &str, title: &str, id: &str) -> Option<String>;
}
