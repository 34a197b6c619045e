use thiserror::Error;

/// 应用程序错误类型
///
/// 只有加载期的校验错误和配置错误会传到批处理器的调用方，
/// 单篇文章的远程调用失败在编排器边界被转换成 `BatchResult`。
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入数据校验错误（整批拒绝）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 远程服务错误（可重试）
    #[error("远程服务错误: {0}")]
    Remote(#[from] RemoteServiceError),
    /// 配置错误（构造时即失败）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 重试耗尽后的远程错误
    #[error("{operation} 在 {attempts} 次尝试后仍然失败: {source}")]
    TransientApiFailure {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
}

/// 输入数据校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 缺少必需的列
    #[error("缺少必需的列: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// 存在无效行
    #[error("{count} 行数据无效: {}", .errors.join("; "))]
    InvalidRows { count: usize, errors: Vec<String> },
    /// 文章 ID 重复
    #[error("文章ID重复: {0}")]
    DuplicateId(String),
}

/// 远程服务错误
#[derive(Debug, Error)]
pub enum RemoteServiceError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回非 2xx 状态码
    #[error("返回错误状态 ({endpoint}): {status} {body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 返回内容为空
    #[error("返回内容为空: {endpoint}")]
    EmptyResponse { endpoint: String },
    /// 响应解析失败
    #[error("响应解析失败 ({endpoint}): {message}")]
    Decode { endpoint: String, message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 参数取值非法
    #[error("参数 {name} 取值非法: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// CSV 解析失败
    #[error("CSV解析失败 ({path}): {source}")]
    CsvParseFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 非法的状态迁移
    #[error("文章 {id} 无法从 {from} 迁移到 {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },
    /// 处理器状态不允许当前操作
    #[error("批处理器当前状态为 {state}，无法执行该操作")]
    ProcessorNotIdle { state: String },
    /// 处理器已完成，不能复用
    #[error("批处理器已完成，不能重复使用")]
    ProcessorCompleted,
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建网络请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Remote(RemoteServiceError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建非 2xx 状态码错误
    pub fn bad_status(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        AppError::Remote(RemoteServiceError::BadStatus {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        })
    }

    /// 创建空响应错误
    pub fn empty_response(endpoint: impl Into<String>) -> Self {
        AppError::Remote(RemoteServiceError::EmptyResponse {
            endpoint: endpoint.into(),
        })
    }

    /// 创建参数非法错误
    pub fn invalid_config(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否值得重试
    ///
    /// 只有远程服务错误是暂时性的；配置、校验、业务错误重试也不会成功。
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Remote(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        if err.is_decode() {
            AppError::Remote(RemoteServiceError::Decode {
                endpoint,
                message: err.to_string(),
            })
        } else {
            AppError::request_failed(endpoint, err)
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_remote_errors_are_retryable() {
        assert!(AppError::empty_response("research").is_retryable());
        assert!(AppError::bad_status("generate", 503, "busy").is_retryable());
        assert!(!AppError::invalid_config("batch_size", "必须大于 0").is_retryable());
        assert!(!AppError::from(ValidationError::DuplicateId("x".into())).is_retryable());
    }

    #[test]
    fn missing_columns_message_names_columns() {
        let err = AppError::from(ValidationError::MissingColumns(vec![
            "keyword".to_string(),
            "title".to_string(),
        ]));
        let msg = err.to_string();
        assert!(msg.contains("keyword"));
        assert!(msg.contains("title"));
    }
}
