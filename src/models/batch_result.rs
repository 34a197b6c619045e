use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 结果表中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// 已入队，尚未处理
    Queued,
    Completed,
    Failed,
}

impl ResultStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResultStatus::Queued)
    }
}

/// 内链候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalLink {
    pub url: String,
    pub description: String,
    /// 与主关键词的余弦相似度
    pub similarity: f64,
}

/// AI 检测相关的元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<f64>,
    pub was_improved: bool,
}

/// 单篇文章的处理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub id: String,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_data: Option<String>,
    #[serde(default)]
    pub internal_links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: ContentMetadata,
    pub timestamp: DateTime<Local>,
}

impl BatchResult {
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ResultStatus::Queued,
            content: None,
            research_data: None,
            internal_links: Vec::new(),
            error: None,
            metadata: ContentMetadata::default(),
            timestamp: Local::now(),
        }
    }

    pub fn completed(
        id: impl Into<String>,
        research_data: String,
        content: String,
        internal_links: Vec<String>,
        metadata: ContentMetadata,
    ) -> Self {
        Self {
            status: ResultStatus::Completed,
            content: Some(content),
            research_data: Some(research_data),
            internal_links,
            metadata,
            ..Self::queued(id)
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Failed,
            error: Some(error.into()),
            ..Self::queued(id)
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ResultStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_status() {
        assert_eq!(BatchResult::queued("a").status, ResultStatus::Queued);
        let done = BatchResult::completed(
            "a",
            "r".into(),
            "c".into(),
            vec![],
            ContentMetadata::default(),
        );
        assert!(done.is_completed());
        let failed = BatchResult::failed("a", "boom");
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.status.is_terminal());
    }

    #[test]
    fn failed_result_serializes_without_content() {
        let json = serde_json::to_value(BatchResult::failed("a", "boom")).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json.get("content").is_none());
    }
}
