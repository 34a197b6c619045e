/// 文档存储客户端
///
/// 把成稿推送到外部文档服务，返回文档 ID。失败只记录日志。
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::AppResult;
use crate::infrastructure::ensure_success;
use crate::services::ports::DocumentStore;

#[derive(Serialize)]
struct SaveDocumentRequest<'a> {
    id: &'a str,
    title: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct SaveDocumentResponse {
    #[serde(alias = "documentId", alias = "doc_id")]
    id: String,
}

/// HTTP 文档存储
pub struct HttpDocumentStore {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(http: Client, endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            token,
        }
    }

    async fn try_save(&self, content: &str, title: &str, id: &str) -> AppResult<String> {
        let mut request = self.http.post(&self.endpoint).json(&SaveDocumentRequest {
            id,
            title,
            content,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let body: SaveDocumentResponse = ensure_success(&self.endpoint, response)
            .await?
            .json()
            .await?;
        Ok(body.id)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn save(&self, content: &str, title: &str, id: &str) -> Option<String> {
        match self.try_save(content, title, id).await {
            Ok(doc_id) => {
                info!("[文章 {}] 📄 已导出到文档存储: {}", id, doc_id);
                Some(doc_id)
            }
            Err(e) => {
                error!("[文章 {}] 导出到文档存储失败: {}", id, e);
                None
            }
        }
    }
}
