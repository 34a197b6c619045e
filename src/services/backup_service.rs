//! 本地备份服务 - 业务能力层
//!
//! 目录结构：`<backup_dir>/<YYYYMMDD>/<id>_content.md` + `<id>_metadata.json`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde_json::json;
use tokio::fs;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::models::BatchResult;
use crate::services::ports::BackupWriter;

/// 本地备份服务
///
/// 职责：
/// - 按日期目录保存正文和元数据
/// - 批量备份已完成的文章
/// - 清理过期的日期目录
pub struct BackupService {
    backup_dir: PathBuf,
}

impl BackupService {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    async fn write_backup(
        &self,
        content: &str,
        metadata: &serde_json::Value,
        id: &str,
    ) -> AppResult<PathBuf> {
        let date_dir = self
            .backup_dir
            .join(Local::now().format("%Y%m%d").to_string());
        fs::create_dir_all(&date_dir)
            .await
            .map_err(|e| AppError::file_write_failed(date_dir.display().to_string(), e))?;

        let content_file = date_dir.join(format!("{}_content.md", id));
        fs::write(&content_file, content)
            .await
            .map_err(|e| AppError::file_write_failed(content_file.display().to_string(), e))?;

        let metadata_file = date_dir.join(format!("{}_metadata.json", id));
        let metadata_json = serde_json::to_string_pretty(metadata).unwrap_or_default();
        fs::write(&metadata_file, metadata_json)
            .await
            .map_err(|e| AppError::file_write_failed(metadata_file.display().to_string(), e))?;

        Ok(date_dir)
    }

    /// 备份所有已完成的结果，返回 `id → 备份目录`
    ///
    /// `titles` 提供文章标题，缺失时写入 `Untitled`
    pub async fn save_batch_backup(
        &self,
        results: &HashMap<String, BatchResult>,
        titles: &HashMap<String, String>,
    ) -> HashMap<String, PathBuf> {
        let mut saved = HashMap::new();

        for (id, result) in results.iter().filter(|(_, r)| r.is_completed()) {
            let Some(content) = result.content.as_deref() else {
                continue;
            };
            let metadata = json!({
                "id": id,
                "title": titles.get(id).map(String::as_str).unwrap_or("Untitled"),
                "timestamp": result.timestamp.to_rfc3339(),
                "research_data": result.research_data.as_deref().unwrap_or_default(),
                "internal_links": result.internal_links,
                "ai_score": result.metadata.ai_score,
                "was_improved": result.metadata.was_improved,
            });

            if let Some(path) = self.save(content, &metadata, id).await {
                saved.insert(id.clone(), path);
            }
        }

        info!("💾 批量备份完成: {}/{}", saved.len(), results.len());
        saved
    }

    /// 删除早于 `days` 天的日期目录，返回删除数量
    pub async fn cleanup_old_backups(&self, days: i64) -> usize {
        self.cleanup_old_backups_at(days, Local::now().date_naive())
            .await
    }

    pub async fn cleanup_old_backups_at(&self, days: i64, today: NaiveDate) -> usize {
        let mut entries = match fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("读取备份目录失败 ({}): {}", self.backup_dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            // 非日期命名的目录不动
            let Some(dir_date) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| NaiveDate::parse_from_str(n, "%Y%m%d").ok())
            else {
                continue;
            };

            if (today - dir_date).num_days() > days {
                match fs::remove_dir_all(&path).await {
                    Ok(()) => {
                        info!("🗑️ 已删除旧备份: {}", path.display());
                        removed += 1;
                    }
                    Err(e) => error!("删除旧备份失败 ({}): {}", path.display(), e),
                }
            }
        }
        removed
    }
}

#[async_trait]
impl BackupWriter for BackupService {
    async fn save(&self, content: &str, metadata: &serde_json::Value, id: &str) -> Option<PathBuf> {
        match self.write_backup(content, metadata, id).await {
            Ok(path) => {
                info!("[文章 {}] 💾 已备份: {}", id, path.display());
                Some(path)
            }
            Err(e) => {
                error!("[文章 {}] 备份失败: {}", id, e);
                None
            }
        }
    }
}
