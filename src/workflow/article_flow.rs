//! 文章处理流程 - 流程层
//!
//! 核心职责：定义"一篇文章"的完整处理流程
//!
//! 流程顺序：
//! 1. 研究（重试）→ 失败则整篇失败
//! 2. 内链（可选，失败退化为空）
//! 3. 写作（重试）
//! 4. AI 检测 → 超过阈值时人性化改写（可选，重试）

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::infrastructure::RetryPolicy;
use crate::models::{ArticleJob, BatchResult, ContentMetadata, JobStatus};
use crate::services::prompt::build_content_prompt;
use crate::services::{
    format_link_for_content, ContentGenerator, ContentValidator, LinkProvider, ResearchProvider,
};
use crate::utils::logging::truncate_text;
use crate::workflow::article_ctx::ArticleCtx;

/// 研究失败时写入结果的错误信息
pub const NO_RESEARCH_DATA: &str = "no research data obtained";

/// 单篇文章处理能力
///
/// 批处理器只依赖这个 trait。单篇文章的失败以 `Ok(BatchResult::failed(..))`
/// 返回；`Err` 只表示流程本身出错（例如非法状态迁移）。
#[async_trait]
pub trait ArticleProcessor: Send + Sync {
    async fn process_article(
        &self,
        job: &mut ArticleJob,
        ctx: &ArticleCtx,
    ) -> AppResult<BatchResult>;
}

/// 内链配置
struct LinkStep {
    provider: Arc<dyn LinkProvider>,
    count: usize,
}

/// AI 检测配置
struct ValidationStep {
    validator: Arc<dyn ContentValidator>,
    threshold: f64,
    region: String,
}

/// 研究编排器
///
/// - 编排 研究 → 内链 → 写作 → 检测 的完整流程
/// - 每一步外部调用单独重试
/// - 不持有任何批处理状态
pub struct ResearchOrchestrator {
    research: Arc<dyn ResearchProvider>,
    writer: Arc<dyn ContentGenerator>,
    retry: RetryPolicy,
    tone: String,
    links: Option<LinkStep>,
    validation: Option<ValidationStep>,
}

impl ResearchOrchestrator {
    pub fn new(
        research: Arc<dyn ResearchProvider>,
        writer: Arc<dyn ContentGenerator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            research,
            writer,
            retry,
            tone: String::new(),
            links: None,
            validation: None,
        }
    }

    /// 设置语气模板
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    /// 启用内链，每篇最多 `count` 条
    pub fn with_links(mut self, provider: Arc<dyn LinkProvider>, count: usize) -> Self {
        self.links = Some(LinkStep { provider, count });
        self
    }

    /// 启用 AI 检测，分数高于 `threshold` 时改写
    pub fn with_validation(
        mut self,
        validator: Arc<dyn ContentValidator>,
        threshold: f64,
        region: impl Into<String>,
    ) -> Self {
        self.validation = Some(ValidationStep {
            validator,
            threshold,
            region: region.into(),
        });
        self
    }

    /// 执行 1-4 步，失败时返回写入结果的错误信息
    async fn run_steps(
        &self,
        job: &ArticleJob,
        ctx: &ArticleCtx,
        retries: &mut u32,
    ) -> Result<BatchResult, String> {
        // ========== 步骤 1: 研究 ==========
        info!("{} 🔍 开始研究: {}", ctx, job.primary_keyword);
        let research_data = self
            .retry
            .call_counted("研究", retries, || {
                self.research.research(
                    &job.primary_keyword,
                    &job.secondary_keywords,
                    job.research_query.as_deref(),
                )
            })
            .await
            .map_err(|e| {
                error!("{} ❌ 研究失败: {}", ctx, e);
                NO_RESEARCH_DATA.to_string()
            })?;
        debug!("{} 研究数据: {}", ctx, truncate_text(&research_data, 100));

        // ========== 步骤 2: 内链 ==========
        let internal_links = self.collect_links(job, ctx).await;

        // ========== 步骤 3: 写作 ==========
        info!("{} ✍️ 开始写作: {}", ctx, job.title);
        let prompt = build_content_prompt(job, &research_data, &self.tone, &internal_links);
        let mut content = self
            .retry
            .call_counted("写作", retries, || self.writer.generate(&prompt))
            .await
            .map_err(|e| format!("内容生成失败: {}", e))?;

        // ========== 步骤 4: AI 检测 / 人性化 ==========
        let mut metadata = ContentMetadata::default();
        if let Some(step) = &self.validation {
            let analysis = self
                .retry
                .call_counted("AI检测", retries, || step.validator.analyze(&content))
                .await
                .map_err(|e| format!("AI 检测失败: {}", e))?;
            metadata.ai_score = Some(analysis.ai_score);

            if analysis.ai_score > step.threshold {
                info!(
                    "{} 🤖 AI 分数 {:.2} 高于阈值 {:.2}，进行人性化改写",
                    ctx, analysis.ai_score, step.threshold
                );
                content = self
                    .retry
                    .call_counted("人性化", retries, || {
                        step.validator.humanize(&content, &step.region)
                    })
                    .await
                    .map_err(|e| format!("人性化改写失败: {}", e))?;
                metadata.was_improved = true;
            } else {
                debug!("{} AI 分数 {:.2}，无需改写", ctx, analysis.ai_score);
            }
        }

        Ok(BatchResult::completed(
            job.id(),
            research_data,
            content,
            internal_links,
            metadata,
        ))
    }

    async fn collect_links(&self, job: &ArticleJob, ctx: &ArticleCtx) -> Vec<String> {
        let Some(step) = &self.links else {
            return Vec::new();
        };
        if !step.provider.is_loaded() {
            debug!("{} 内链未加载，跳过", ctx);
            return Vec::new();
        }

        let links = step
            .provider
            .find_relevant_links(&job.primary_keyword, step.count)
            .await;
        if links.is_empty() {
            warn!("{} ⚠️ 未找到相关内链", ctx);
        } else {
            info!("{} 🔗 找到 {} 条内链", ctx, links.len());
        }
        links.iter().map(format_link_for_content).collect()
    }
}

#[async_trait]
impl ArticleProcessor for ResearchOrchestrator {
    async fn process_article(
        &self,
        job: &mut ArticleJob,
        ctx: &ArticleCtx,
    ) -> AppResult<BatchResult> {
        job.advance(JobStatus::Processing)?;

        let mut retries = 0;
        let outcome = self.run_steps(job, ctx, &mut retries).await;
        job.add_retries(retries, self.retry.max_attempts());

        match outcome {
            Ok(result) => {
                job.advance(JobStatus::Completed)?;
                info!("{} ✅ 处理完成 (重试 {} 次)", ctx, job.retry_count());
                Ok(result)
            }
            Err(message) => {
                job.advance(JobStatus::Failed)?;
                error!("{} ❌ 处理失败: {}", ctx, message);
                Ok(BatchResult::failed(job.id(), message))
            }
        }
    }
}
