//! LLM 服务 - 业务能力层
//!
//! 只负责"研究"和"写作"两种能力，不关心流程
//!
//! ## 技术栈
//! - 通过 [`LlmClient`] 使用 `async-openai` 调用
//! - 研究走 Perplexity（OpenAI 兼容协议），写作走任意兼容 OpenAI 的模型

use async_trait::async_trait;
use tracing::{debug, info};

use crate::clients::LlmClient;
use crate::error::{AppError, AppResult};
use crate::services::ports::{ContentGenerator, ResearchProvider};
use crate::services::prompt::{
    build_research_prompt, build_research_question, normalize_research_text,
};
use crate::utils::logging::truncate_text;

/// 研究服务
///
/// 职责：
/// - 构建研究提示词并调用研究 API
/// - 规范化返回文本
/// - 空结果视为远程错误，交给重试层处理
pub struct ResearchService {
    client: LlmClient,
}

impl ResearchService {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResearchProvider for ResearchService {
    async fn research(
        &self,
        primary_keyword: &str,
        secondary_keywords: &[String],
        query: Option<&str>,
    ) -> AppResult<String> {
        let question = build_research_question(primary_keyword, secondary_keywords, query);
        debug!("研究问题: {}", truncate_text(&question, 80));

        let raw = self
            .client
            .chat(&build_research_prompt(&question), None)
            .await?;
        let text = normalize_research_text(&raw);
        if text.is_empty() {
            return Err(AppError::empty_response(self.client.model_name()));
        }

        info!(
            "🔎 研究完成: {} ({} 字符)",
            primary_keyword,
            text.chars().count()
        );
        Ok(text)
    }
}

/// 写作服务
///
/// 职责：
/// - 把完整提示词发给写作模型，返回正文
pub struct WritingService {
    client: LlmClient,
    system_message: Option<String>,
}

impl WritingService {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            system_message: None,
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }
}

#[async_trait]
impl ContentGenerator for WritingService {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        debug!("写作提示词长度: {} 字符", prompt.len());
        self.client
            .chat(prompt, self.system_message.as_deref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 需要真实的 API Key，手动运行：
    /// `PERPLEXITY_API_KEY=... cargo test -- --ignored live_research`
    #[tokio::test]
    #[ignore]
    async fn live_research() {
        let key = std::env::var("PERPLEXITY_API_KEY").unwrap();
        let client = LlmClient::new(&key, "https://api.perplexity.ai", "sonar");
        let service = ResearchService::new(client);
        let text = service
            .research("inversión inmobiliaria", &["hipotecas".to_string()], None)
            .await
            .unwrap();
        assert!(!text.is_empty());
    }
}
