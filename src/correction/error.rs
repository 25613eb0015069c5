//! 纠错模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。管道对所有错误都"软失败"：
//! 单个句子出错只会让这一轮没有建议，不会影响其他句子或宿主页面。

use std::fmt;

use thiserror::Error;

/// 纠错错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrectionError {
    /// 模型或凭据不可用
    #[error("后端不可用: {0}")]
    BackendUnavailable(String),

    /// 网络或通道错误
    #[error("传输错误: {0}")]
    TransportError(String),

    /// 模型输出无法解析
    #[error("解析错误: {0}")]
    ParseFailure(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    TimeoutError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl CorrectionError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            CorrectionError::TransportError(_) => true,
            CorrectionError::TimeoutError(_) => true,
            CorrectionError::BackendUnavailable(_) => false,
            CorrectionError::ParseFailure(_) => false,
            CorrectionError::ConfigError(_) => false,
            CorrectionError::InvalidInput(_) => false,
            CorrectionError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CorrectionError::BackendUnavailable(_) => ErrorSeverity::Warning,
            CorrectionError::TransportError(_) => ErrorSeverity::Warning,
            CorrectionError::ParseFailure(_) => ErrorSeverity::Info,
            CorrectionError::ConfigError(_) => ErrorSeverity::Critical,
            CorrectionError::InvalidInput(_) => ErrorSeverity::Info,
            CorrectionError::TimeoutError(_) => ErrorSeverity::Warning,
            CorrectionError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            CorrectionError::BackendUnavailable(_) => ErrorCategory::Backend,
            CorrectionError::TransportError(_) => ErrorCategory::Transport,
            CorrectionError::ParseFailure(_) => ErrorCategory::Parsing,
            CorrectionError::ConfigError(_) => ErrorCategory::Configuration,
            CorrectionError::InvalidInput(_) => ErrorCategory::Input,
            CorrectionError::TimeoutError(_) => ErrorCategory::Timeout,
            CorrectionError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = match &self {
            CorrectionError::BackendUnavailable(msg)
            | CorrectionError::TransportError(msg)
            | CorrectionError::ParseFailure(msg)
            | CorrectionError::ConfigError(msg)
            | CorrectionError::InvalidInput(msg)
            | CorrectionError::TimeoutError(msg)
            | CorrectionError::InternalError(msg) => format!("{} (上下文: {})", msg, context),
        };

        match &mut self {
            CorrectionError::BackendUnavailable(ref mut msg)
            | CorrectionError::TransportError(ref mut msg)
            | CorrectionError::ParseFailure(ref mut msg)
            | CorrectionError::ConfigError(ref mut msg)
            | CorrectionError::InvalidInput(ref mut msg)
            | CorrectionError::TimeoutError(ref mut msg)
            | CorrectionError::InternalError(ref mut msg) => *msg = new_msg,
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Backend,
    Transport,
    Parsing,
    Configuration,
    Input,
    Timeout,
    Internal,
}

impl From<std::io::Error> for CorrectionError {
    fn from(error: std::io::Error) -> Self {
        CorrectionError::TransportError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for CorrectionError {
    fn from(error: serde_json::Error) -> Self {
        CorrectionError::ParseFailure(format!("JSON解析错误: {}", error))
    }
}

impl From<toml::de::Error> for CorrectionError {
    fn from(error: toml::de::Error) -> Self {
        CorrectionError::ConfigError(format!("TOML解析错误: {}", error))
    }
}

impl From<regex::Error> for CorrectionError {
    fn from(error: regex::Error) -> Self {
        CorrectionError::ConfigError(format!("正则表达式无效: {}", error))
    }
}

impl From<reqwest::Error> for CorrectionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            CorrectionError::TimeoutError(format!("HTTP请求超时: {}", error))
        } else {
            CorrectionError::TransportError(format!("HTTP请求失败: {}", error))
        }
    }
}

impl From<tokio::time::error::Elapsed> for CorrectionError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        CorrectionError::TimeoutError(format!("异步操作超时: {}", error))
    }
}

/// 错误结果类型别名
pub type CorrectionResult<T> = Result<T, CorrectionError>;

/// 错误统计信息
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: std::collections::HashMap<ErrorCategory, usize>,
    pub by_severity: std::collections::HashMap<ErrorSeverity, usize>,
    pub retryable_errors: usize,
    pub critical_errors: usize,
}

impl ErrorStats {
    /// 记录错误
    pub fn record_error(&mut self, error: &CorrectionError) {
        self.total_errors += 1;

        let category = error.category();
        *self.by_category.entry(category).or_insert(0) += 1;

        let severity = error.severity();
        *self.by_severity.entry(severity).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }

        if severity == ErrorSeverity::Critical {
            self.critical_errors += 1;
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// 获取错误率
    pub fn error_rate(&self, total_operations: usize) -> f64 {
        if total_operations == 0 {
            0.0
        } else {
            self.total_errors as f64 / total_operations as f64
        }
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误（只写日志，不返回给用户）
    pub fn log_error(error: &CorrectionError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("纠错信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("纠错警告: {}", error),
            ErrorSeverity::Error => tracing::error!("纠错错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("纠错严重错误: {}", error),
        }
    }

    /// 创建后端不可用错误
    pub fn unavailable<T: fmt::Display>(msg: T) -> CorrectionError {
        CorrectionError::BackendUnavailable(msg.to_string())
    }

    /// 创建传输错误
    pub fn transport_error<T: fmt::Display>(msg: T) -> CorrectionError {
        CorrectionError::TransportError(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> CorrectionError {
        CorrectionError::ConfigError(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> CorrectionError {
        CorrectionError::InvalidInput(msg.to_string())
    }
}
