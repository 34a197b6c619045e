/// AI 检测 / 人性化 API 客户端
///
/// - `POST {base}/detect/ai` → `{ai_score, features, timestamp}`
/// - `POST {base}/humanize`  → `{humanized_text}`
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::ensure_success;
use crate::services::ports::{AiAnalysis, ContentValidator};

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
    region: &'a str,
}

#[derive(Deserialize)]
struct HumanizeResponse {
    humanized_text: String,
}

/// AI 检测客户端
pub struct ValidationClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    region: String,
}

impl ValidationClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            region: region.into(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
        body: &TextRequest<'_>,
    ) -> AppResult<T> {
        let endpoint = format!("{}{}", self.base_url, route);
        let mut request = self.http.post(&endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::request_failed(&endpoint, e))?;
        let parsed = ensure_success(&endpoint, response).await?.json::<T>().await?;
        Ok(parsed)
    }
}

#[async_trait]
impl ContentValidator for ValidationClient {
    async fn analyze(&self, text: &str) -> AppResult<AiAnalysis> {
        debug!("AI 检测: {} 字符", text.len());
        self.post(
            "/detect/ai",
            &TextRequest {
                text,
                region: &self.region,
            },
        )
        .await
    }

    async fn humanize(&self, text: &str, region: &str) -> AppResult<String> {
        debug!("人性化改写: {} 字符, 地区 {}", text.len(), region);
        let response: HumanizeResponse = self
            .post("/humanize", &TextRequest { text, region })
            .await?;
        if response.humanized_text.trim().is_empty() {
            return Err(AppError::empty_response(format!("{}/humanize", self.base_url)));
        }
        Ok(response.humanized_text)
    }
}
