//! 应用入口 - 编排层
//!
//! 组装所有依赖（客户端、限流器、服务、编排器），
//! 然后按 读取 → 校验 → 处理 → 备份 → 导出 → 报告 的顺序运行一次。

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::{EmbeddingClient, HttpDocumentStore, LlmClient, ValidationClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{build_http_client, RateLimiter, RetryPolicy};
use crate::models::{read_article_table, DataValidator};
use crate::orchestrator::batch_processor::ArticleBatchProcessor;
use crate::orchestrator::run_stats::ProcessingStats;
use crate::services::{
    BackupService, DocumentStore, InternalLinkService, ReportWriter, ResearchService,
    WritingService,
};
use crate::utils::logging::{
    init_log_file, log_articles_loaded, log_startup, print_final_stats,
};
use crate::workflow::ResearchOrchestrator;

/// 备份保留天数
const BACKUP_RETENTION_DAYS: i64 = 30;

const WRITER_SYSTEM_MESSAGE: &str =
    "You are an expert SEO content writer who writes in fluent native-level Spanish.";

/// 应用主结构
pub struct App {
    config: Config,
    processor: ArticleBatchProcessor,
    validator: DataValidator,
    reports: ReportWriter,
    backup: Option<BackupService>,
    doc_store: Option<Arc<dyn DocumentStore>>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;

        // 初始化日志文件
        init_log_file(&config.output_log_file)?;
        log_startup(config.batch_size, config.max_retries);

        let http = build_http_client(config.request_timeout())?;
        let retry = RetryPolicy::from_config(&config)?;

        // 每个外部 API 一个限流器
        let research_limiter = Arc::new(RateLimiter::new(
            "research",
            config.research_calls_per_minute,
        )?);
        let content_limiter = Arc::new(RateLimiter::new(
            "content",
            config.content_calls_per_minute,
        )?);

        let research_client = LlmClient::new(
            &config.research_api_key,
            &config.research_api_base_url,
            &config.research_model_name,
        )
        .with_rate_limiter(research_limiter);
        let content_client = LlmClient::new(
            &config.content_api_key,
            &config.content_api_base_url,
            &config.content_model_name,
        )
        .with_max_tokens(config.content_max_tokens)
        .with_rate_limiter(content_limiter);

        let tone = load_tone(&config.tone_file).await;

        let mut orchestrator = ResearchOrchestrator::new(
            Arc::new(ResearchService::new(research_client)),
            Arc::new(WritingService::new(content_client).with_system_message(WRITER_SYSTEM_MESSAGE)),
            retry,
        )
        .with_tone(tone);

        if config.internal_links_enabled() {
            let embedder = EmbeddingClient::new(
                http.clone(),
                &config.embedding_api_key,
                &config.embedding_api_base_url,
                &config.embedding_model_name,
            );
            let mut links = InternalLinkService::new(Arc::new(embedder));
            match links.load_links(Path::new(&config.links_file)).await {
                Ok(_) => {
                    orchestrator = orchestrator.with_links(Arc::new(links), config.link_count);
                }
                Err(e) => warn!("⚠️ 内链加载失败，本次不使用内链: {}", e),
            }
        } else {
            info!("新站点或未启用内链，跳过内链");
        }

        if config.use_validation {
            let validator = ValidationClient::new(
                http.clone(),
                &config.validation_api_base_url,
                config.validation_api_key.clone(),
                &config.site_region,
            );
            orchestrator = orchestrator.with_validation(
                Arc::new(validator),
                config.ai_score_threshold,
                &config.site_region,
            );
        }

        let processor = ArticleBatchProcessor::new(
            Arc::new(orchestrator),
            config.batch_size,
            config.batch_delay(),
        )?;

        let backup = config
            .backup_local
            .then(|| BackupService::new(&config.backup_dir));
        let doc_store = config.doc_store_url.as_ref().map(|url| {
            Arc::new(HttpDocumentStore::new(
                http.clone(),
                url,
                config.doc_store_token.clone(),
            )) as Arc<dyn DocumentStore>
        });

        Ok(Self {
            reports: ReportWriter::new(&config.report_dir),
            validator: DataValidator::new(),
            config,
            processor,
            backup,
            doc_store,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> AppResult<&ProcessingStats> {
        info!("\n📁 正在读取文章列表: {}", self.config.input_csv);
        let table = read_article_table(Path::new(&self.config.input_csv)).await?;

        if table.is_empty() {
            warn!("⚠️ 没有找到待处理的文章，程序结束");
            // 空队列也走完状态机，统计带上起止时间
            self.processor.process_batch().await?;
            return Ok(self.processor.stats());
        }

        let report = self.validator.validate(&table);
        if let Err(e) = self.reports.write_validation_report(&report) {
            warn!("校验报告写入失败: {}", e);
        }

        let total = self.processor.load(&table)?;
        log_articles_loaded(total, self.config.batch_size);

        self.processor.process_batch().await?;

        self.persist_results().await;

        if let Err(e) = self.reports.write_failed_items(
            self.processor.failed_items(),
            self.processor.results(),
        ) {
            warn!("失败列表写入失败: {}", e);
        }

        print_final_stats(self.processor.stats(), &self.config.output_log_file);
        Ok(self.processor.stats())
    }

    /// 备份与导出，失败只记录日志
    async fn persist_results(&self) {
        let results = self.processor.results();
        let titles = self.processor.titles();

        if let Some(backup) = &self.backup {
            backup.save_batch_backup(results, &titles).await;
            backup.cleanup_old_backups(BACKUP_RETENTION_DAYS).await;
        }

        if let Some(store) = &self.doc_store {
            let mut exported = 0;
            for (id, result) in results.iter().filter(|(_, r)| r.is_completed()) {
                let Some(content) = result.content.as_deref() else {
                    continue;
                };
                let title = titles.get(id).map(String::as_str).unwrap_or(id.as_str());
                if store.save(content, title, id).await.is_some() {
                    exported += 1;
                }
            }
            info!("📄 已导出 {} 篇到文档存储", exported);
        }
    }

    pub fn processor(&self) -> &ArticleBatchProcessor {
        &self.processor
    }
}

/// 读取语气模板，文件不存在时使用空模板
async fn load_tone(path: &str) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(tone) => tone,
        Err(e) => {
            warn!("⚠️ 读取语气模板失败 ({}): {}，使用空模板", path, e);
            String::new()
        }
    }
}
