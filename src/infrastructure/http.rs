use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{AppError, AppResult};

/// 构建共享的 HTTP 客户端
pub fn build_http_client(timeout: Duration) -> AppResult<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("seo_article_batch/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// 非 2xx 响应转换为 `RemoteServiceError::BadStatus`
pub async fn ensure_success(endpoint: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::bad_status(endpoint, status.as_u16(), body))
}
