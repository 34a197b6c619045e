use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError, FileError};

/// 程序配置文件
///
/// 取值顺序：默认值 → TOML 文件（`SEO_CONFIG_FILE`）→ 环境变量。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 批处理配置 ---
    /// 每批同时处理的文章数量
    pub batch_size: usize,
    /// 每次外部调用的最大尝试次数（含首次）
    pub max_retries: u32,
    /// 两批之间的等待时间（秒）
    pub batch_delay_secs: u64,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 重试退避的基础延迟（毫秒）
    pub retry_base_delay_ms: u64,
    /// 重试退避的下限（毫秒）
    pub retry_min_delay_ms: u64,
    /// 重试退避的上限（毫秒）
    pub retry_max_delay_ms: u64,

    // --- 文件路径 ---
    /// 待处理文章的 CSV
    pub input_csv: String,
    /// 语气模板文件
    pub tone_file: String,
    /// 内链 CSV（URL + 描述）
    pub links_file: String,
    /// 本地备份目录
    pub backup_dir: String,
    /// 报告输出目录（校验报告、失败列表）
    pub report_dir: String,
    /// 运行日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,

    // --- 功能开关 ---
    pub use_internal_links: bool,
    pub backup_local: bool,
    pub use_validation: bool,
    /// 新站点没有可链接的旧文章，跳过内链
    pub is_new_site: bool,
    pub site_language: String,
    pub site_region: String,

    // --- 研究 API（Perplexity，兼容 OpenAI 协议）---
    pub research_api_key: String,
    pub research_api_base_url: String,
    pub research_model_name: String,
    pub research_calls_per_minute: usize,

    // --- 内容生成 API ---
    pub content_api_key: String,
    pub content_api_base_url: String,
    pub content_model_name: String,
    pub content_max_tokens: u32,
    pub content_calls_per_minute: usize,

    // --- 向量 API（内链）---
    pub embedding_api_key: String,
    pub embedding_api_base_url: String,
    pub embedding_model_name: String,
    pub link_count: usize,

    // --- AI 检测 / 人性化 API ---
    pub validation_api_base_url: String,
    pub validation_api_key: Option<String>,
    pub ai_score_threshold: f64,

    // --- 文档存储 ---
    pub doc_store_url: Option<String>,
    pub doc_store_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            batch_delay_secs: 1,
            request_timeout_secs: 30,
            retry_base_delay_ms: 1_000,
            retry_min_delay_ms: 4_000,
            retry_max_delay_ms: 10_000,
            input_csv: "articles.csv".to_string(),
            tone_file: "tone.txt".to_string(),
            links_file: "links.csv".to_string(),
            backup_dir: "backups".to_string(),
            report_dir: "reports".to_string(),
            output_log_file: "batch_processor.log".to_string(),
            verbose_logging: false,
            use_internal_links: false,
            backup_local: true,
            use_validation: false,
            is_new_site: true,
            site_language: "es".to_string(),
            site_region: "es".to_string(),
            research_api_key: String::new(),
            research_api_base_url: "https://api.perplexity.ai".to_string(),
            research_model_name: "llama-3.1-sonar-small-128k-online".to_string(),
            research_calls_per_minute: 20,
            content_api_key: String::new(),
            content_api_base_url: "https://api.openai.com/v1".to_string(),
            content_model_name: "gpt-4o".to_string(),
            content_max_tokens: 4000,
            content_calls_per_minute: 50,
            embedding_api_key: String::new(),
            embedding_api_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model_name: "text-embedding-ada-002".to_string(),
            link_count: 3,
            validation_api_base_url: "http://localhost:8000".to_string(),
            validation_api_key: None,
            ai_score_threshold: 0.4,
            doc_store_url: None,
            doc_store_token: None,
        }
    }
}

impl Config {
    /// 加载配置：可选的 TOML 文件 + 环境变量覆盖，最后校验
    pub fn load() -> AppResult<Self> {
        let mut config = match std::env::var("SEO_CONFIG_FILE") {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺失的字段使用默认值
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        if !Path::new(path).exists() {
            return Err(FileError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| AppError::file_read_failed(path, e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AppError::File(FileError::TomlParseFailed { source, .. }) => {
                AppError::File(FileError::TomlParseFailed {
                    path: path.to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: String::new(),
                source,
            })
        })
    }

    /// 用环境变量覆盖当前配置
    pub fn apply_env(&mut self) -> AppResult<()> {
        override_parsed("BATCH_SIZE", &mut self.batch_size)?;
        override_parsed("MAX_RETRIES", &mut self.max_retries)?;
        override_parsed("BATCH_DELAY_SECS", &mut self.batch_delay_secs)?;
        override_parsed("REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs)?;
        override_parsed("RETRY_BASE_DELAY_MS", &mut self.retry_base_delay_ms)?;
        override_parsed("RETRY_MIN_DELAY_MS", &mut self.retry_min_delay_ms)?;
        override_parsed("RETRY_MAX_DELAY_MS", &mut self.retry_max_delay_ms)?;
        override_string("INPUT_CSV", &mut self.input_csv);
        override_string("TONE_FILE", &mut self.tone_file);
        override_string("LINKS_FILE", &mut self.links_file);
        override_string("BACKUP_DIR", &mut self.backup_dir);
        override_string("REPORT_DIR", &mut self.report_dir);
        override_string("OUTPUT_LOG_FILE", &mut self.output_log_file);
        override_parsed("VERBOSE_LOGGING", &mut self.verbose_logging)?;
        override_parsed("USE_INTERNAL_LINKS", &mut self.use_internal_links)?;
        override_parsed("BACKUP_LOCAL", &mut self.backup_local)?;
        override_parsed("USE_VALIDATION", &mut self.use_validation)?;
        override_parsed("IS_NEW_SITE", &mut self.is_new_site)?;
        override_string("SITE_LANGUAGE", &mut self.site_language);
        override_string("SITE_REGION", &mut self.site_region);
        override_string("PERPLEXITY_API_KEY", &mut self.research_api_key);
        override_string("RESEARCH_API_BASE_URL", &mut self.research_api_base_url);
        override_string("RESEARCH_MODEL_NAME", &mut self.research_model_name);
        override_parsed(
            "RESEARCH_CALLS_PER_MINUTE",
            &mut self.research_calls_per_minute,
        )?;
        override_string("CONTENT_API_KEY", &mut self.content_api_key);
        override_string("CONTENT_API_BASE_URL", &mut self.content_api_base_url);
        override_string("CONTENT_MODEL_NAME", &mut self.content_model_name);
        override_parsed("CONTENT_MAX_TOKENS", &mut self.content_max_tokens)?;
        override_parsed(
            "CONTENT_CALLS_PER_MINUTE",
            &mut self.content_calls_per_minute,
        )?;
        override_string("OPENAI_API_KEY", &mut self.embedding_api_key);
        override_string("EMBEDDING_API_BASE_URL", &mut self.embedding_api_base_url);
        override_string("EMBEDDING_MODEL_NAME", &mut self.embedding_model_name);
        override_parsed("LINK_COUNT", &mut self.link_count)?;
        override_string("VALIDATION_API_BASE_URL", &mut self.validation_api_base_url);
        override_optional("VALIDATION_API_KEY", &mut self.validation_api_key);
        override_parsed("AI_SCORE_THRESHOLD", &mut self.ai_score_threshold)?;
        override_optional("DOC_STORE_URL", &mut self.doc_store_url);
        override_optional("DOC_STORE_TOKEN", &mut self.doc_store_token);
        Ok(())
    }

    /// 校验参数取值
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::invalid_config("batch_size", "必须大于 0"));
        }
        if self.max_retries == 0 {
            return Err(AppError::invalid_config("max_retries", "必须大于 0"));
        }
        if self.research_calls_per_minute == 0 || self.content_calls_per_minute == 0 {
            return Err(AppError::invalid_config("calls_per_minute", "必须大于 0"));
        }
        if self.retry_min_delay_ms > self.retry_max_delay_ms {
            return Err(AppError::invalid_config(
                "retry_min_delay_ms",
                format!(
                    "下限 {}ms 大于上限 {}ms",
                    self.retry_min_delay_ms, self.retry_max_delay_ms
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.ai_score_threshold) {
            return Err(AppError::invalid_config(
                "ai_score_threshold",
                "必须在 [0, 1] 区间内",
            ));
        }
        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 是否启用内链
    pub fn internal_links_enabled(&self) -> bool {
        self.use_internal_links && !self.is_new_site
    }
}

fn override_string(var_name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(var_name) {
        *target = value;
    }
}

fn override_optional(var_name: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(var_name) {
        *target = if value.trim().is_empty() {
            None
        } else {
            Some(value)
        };
    }
}

fn override_parsed<T: FromStr>(var_name: &str, target: &mut T) -> AppResult<()> {
    if let Ok(value) = std::env::var(var_name) {
        *target = parse_env_value(var_name, &value)?;
    }
    Ok(())
}

fn parse_env_value<T: FromStr>(var_name: &str, value: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        AppError::Config(ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: std::any::type_name::<T>().to_string(),
        })
    })
}
