/// LLM API 客户端
///
/// 封装兼容 OpenAI 协议的聊天接口（Perplexity、OpenAI、各类网关）
use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::RateLimiter;

/// LLM 客户端
///
/// 如果注入了限流器，每次请求前都会先 `acquire()`。
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(api_key: &str, api_base_url: &str, model_name: impl Into<String>) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: model_name.into(),
            temperature: 0.7,
            max_tokens: 4000,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 发送聊天请求
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回去掉首尾空白的响应内容
    pub async fn chat(&self, user_message: &str, system_message: Option<&str>) -> AppResult<String> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| AppError::invalid_config("system_message", e.to_string()))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| AppError::invalid_config("user_message", e.to_string()))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| AppError::invalid_config("chat_request", e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败 ({}): {}", self.model_name, e);
            AppError::request_failed(self.model_name.clone(), e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::empty_response(self.model_name.clone()))?;

        Ok(content.trim().to_string())
    }
}
