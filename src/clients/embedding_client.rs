/// 向量 API 客户端
///
/// 调用兼容 OpenAI 协议的 `/embeddings` 接口
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::ensure_success;
use crate::services::ports::Embedder;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// 向量客户端
pub struct EmbeddingClient {
    http: Client,
    api_key: String,
    api_base_url: String,
    model_name: String,
}

impl EmbeddingClient {
    pub fn new(
        http: Client,
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            model_name: model_name.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.api_base_url)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let endpoint = self.endpoint();
        debug!("请求向量: {} 条文本, 模型 {}", texts.len(), self.model_name);

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model_name,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::request_failed(&endpoint, e))?;

        let mut body: EmbeddingResponse = ensure_success(&endpoint, response).await?.json().await?;

        if body.data.len() != texts.len() {
            return Err(AppError::Remote(crate::error::RemoteServiceError::Decode {
                endpoint,
                message: format!("请求 {} 条向量，返回 {} 条", texts.len(), body.data.len()),
            }));
        }

        body.data.sort_by_key(|item| item.index);
        Ok(body.data.into_iter().map(|item| item.embedding).collect())
    }
}
