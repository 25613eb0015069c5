//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，配置管理器用它覆盖文件中的设置

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 只在变量被显式设置时返回值
    fn get_set() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "IDIOMATIC_ZH_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 后端相关环境变量
pub mod backend {
    use super::*;

    /// 选择的后端
    pub struct Kind;
    impl EnvVar<String> for Kind {
        const NAME: &'static str = "IDIOMATIC_ZH_BACKEND";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Correction backend: local or cloud";

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                "local" => Ok("local".to_string()),
                "cloud" => Ok("cloud".to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid backend '{}'. Use: local, cloud", value),
                }),
            }
        }
    }

    /// 云端凭据
    pub struct ApiKey;
    impl EnvVar<String> for ApiKey {
        const NAME: &'static str = "IDIOMATIC_ZH_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Credential for the hosted completion endpoint";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_string())
        }
    }

    /// 云端 API 地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "IDIOMATIC_ZH_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Hosted completion endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 本地模型地址
    pub struct LocalUrl;
    impl EnvVar<String> for LocalUrl {
        const NAME: &'static str = "IDIOMATIC_ZH_LOCAL_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "On-device model server URL";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 单次模型调用超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "IDIOMATIC_ZH_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(30));
        const DESCRIPTION: &'static str = "Per model call timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }
}

/// 管道相关环境变量
pub mod pipeline {
    use super::*;

    /// 防抖间隔
    pub struct DebounceMs;
    impl EnvVar<u64> for DebounceMs {
        const NAME: &'static str = "IDIOMATIC_ZH_DEBOUNCE_MS";
        const DEFAULT: Option<u64> = Some(1000);
        const DESCRIPTION: &'static str = "Quiet period before a correction session starts";

        fn parse(value: &str) -> EnvResult<u64> {
            parse_positive_usize(value, Self::NAME, 50, 10_000).map(|ms| ms as u64)
        }
    }

    /// 有用性阈值
    pub struct UsefulnessThreshold;
    impl EnvVar<f64> for UsefulnessThreshold {
        const NAME: &'static str = "IDIOMATIC_ZH_USEFULNESS_THRESHOLD";
        const DEFAULT: Option<f64> = Some(0.5);
        const DESCRIPTION: &'static str = "Suggestions must score strictly above this value";

        fn parse(value: &str) -> EnvResult<f64> {
            let threshold: f64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number".to_string(),
            })?;

            if !(0.0..=1.0).contains(&threshold) {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Threshold must be within [0, 1]".to_string(),
                });
            }

            Ok(threshold)
        }
    }

    /// 最小词数
    pub struct MinWordCount;
    impl EnvVar<usize> for MinWordCount {
        const NAME: &'static str = "IDIOMATIC_ZH_MIN_WORD_COUNT";
        const DEFAULT: Option<usize> = Some(4);
        const DESCRIPTION: &'static str = "Minimum word count for a sentence to be sent";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 100)
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存容量
    pub struct Capacity;
    impl EnvVar<usize> for Capacity {
        const NAME: &'static str = "IDIOMATIC_ZH_CACHE_CAPACITY";
        const DEFAULT: Option<usize> = Some(500);
        const DESCRIPTION: &'static str = "Maximum cached sentences per page";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 10, 100_000)
        }
    }
}

fn parse_http_url(value: &str, var_name: &str) -> EnvResult<String> {
    let url = value.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: "URL must start with http:// or https://".to_string(),
        })
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn doc_line<T: fmt::Debug, V: EnvVar<T>>(docs: &mut String) {
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        V::NAME,
        V::DESCRIPTION,
        V::DEFAULT
    ));
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    doc_line::<String, core::LogLevel>(&mut docs);
    doc_line::<bool, core::NoColor>(&mut docs);

    docs.push_str("\n## Backend Configuration\n\n");
    doc_line::<String, backend::Kind>(&mut docs);
    doc_line::<String, backend::ApiKey>(&mut docs);
    doc_line::<String, backend::ApiUrl>(&mut docs);
    doc_line::<String, backend::LocalUrl>(&mut docs);
    doc_line::<Duration, backend::RequestTimeout>(&mut docs);

    docs.push_str("\n## Pipeline Configuration\n\n");
    doc_line::<u64, pipeline::DebounceMs>(&mut docs);
    doc_line::<f64, pipeline::UsefulnessThreshold>(&mut docs);
    doc_line::<usize, pipeline::MinWordCount>(&mut docs);

    docs.push_str("\n## Cache Configuration\n\n");
    doc_line::<usize, cache::Capacity>(&mut docs);

    docs
}
