//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::constants;
use crate::correction::error::{CorrectionError, CorrectionResult};

/// 纠错后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// 设备上的本地模型
    #[default]
    Local,
    /// 托管的云端模型
    Cloud,
}

impl std::str::FromStr for BackendKind {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "cloud" => Ok(BackendKind::Cloud),
            other => Err(CorrectionError::ConfigError(format!("未知后端: {}", other))),
        }
    }
}

/// 网址过滤模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlFilterMode {
    /// 匹配的页面不运行
    #[default]
    Blocklist,
    /// 只有匹配的页面才运行
    Allowlist,
}

/// 纠错配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrectionConfig {
    // 后端配置
    pub backend: BackendKind,
    pub api_key: String,
    pub cloud_api_url: String,
    pub cloud_model: String,
    pub cloud_max_tokens: u32,
    pub local_url: String,
    pub local_model: String,
    pub local_temperature: f32,
    pub local_top_k: u32,
    pub request_timeout_secs: u64,

    // 管道配置
    pub debounce_ms: u64,
    pub usefulness_threshold: f64,
    pub min_word_count: usize,

    // 缓存配置
    pub cache_capacity: usize,

    // 网址过滤
    pub url_filter_mode: UrlFilterMode,
    pub url_patterns: Vec<String>,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            api_key: String::new(),
            cloud_api_url: constants::DEFAULT_CLOUD_API_URL.to_string(),
            cloud_model: constants::DEFAULT_CLOUD_MODEL.to_string(),
            cloud_max_tokens: constants::DEFAULT_CLOUD_MAX_TOKENS,
            local_url: constants::DEFAULT_LOCAL_URL.to_string(),
            local_model: constants::DEFAULT_LOCAL_MODEL.to_string(),
            local_temperature: constants::DEFAULT_LOCAL_TEMPERATURE,
            local_top_k: constants::DEFAULT_LOCAL_TOP_K,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),

            debounce_ms: constants::DEFAULT_DEBOUNCE.as_millis() as u64,
            usefulness_threshold: constants::DEFAULT_USEFULNESS_THRESHOLD,
            min_word_count: constants::DEFAULT_MIN_WORD_COUNT,

            cache_capacity: constants::DEFAULT_CACHE_CAPACITY,

            url_filter_mode: UrlFilterMode::Blocklist,
            url_patterns: Vec::new(),
        }
    }
}

impl CorrectionConfig {
    /// 创建指定后端的默认配置
    pub fn with_backend(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> CorrectionResult<()> {
        if self.cache_capacity == 0 {
            return Err(CorrectionError::ConfigError("缓存容量不能为0".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(CorrectionError::ConfigError("请求超时不能为0".to_string()));
        }

        if self.min_word_count == 0 {
            return Err(CorrectionError::ConfigError("最小词数不能为0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.usefulness_threshold) {
            return Err(CorrectionError::ConfigError(format!(
                "有用性阈值必须在0到1之间: {}",
                self.usefulness_threshold
            )));
        }

        for pattern in &self.url_patterns {
            Regex::new(pattern).map_err(|e| {
                CorrectionError::from(e).with_context(format!("网址规则 {}", pattern))
            })?;
        }

        Ok(())
    }

    /// 应用环境变量覆盖（只覆盖显式设置的变量）
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{backend, cache, pipeline, EnvVar};

        if let Some(result) = backend::Kind::get_set() {
            match result.map_err(|e| e.to_string()).and_then(|kind| {
                kind.parse::<BackendKind>().map_err(|e| e.to_string())
            }) {
                Ok(kind) => self.backend = kind,
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }

        if let Some(Ok(key)) = backend::ApiKey::get_set() {
            self.api_key = key;
        }

        override_with::<String, backend::ApiUrl>(&mut self.cloud_api_url);
        override_with::<String, backend::LocalUrl>(&mut self.local_url);

        if let Some(result) = backend::RequestTimeout::get_set() {
            match result {
                Ok(timeout) => self.request_timeout_secs = timeout.as_secs(),
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }

        override_with::<u64, pipeline::DebounceMs>(&mut self.debounce_ms);
        override_with::<f64, pipeline::UsefulnessThreshold>(&mut self.usefulness_threshold);
        override_with::<usize, pipeline::MinWordCount>(&mut self.min_word_count);
        override_with::<usize, cache::Capacity>(&mut self.cache_capacity);
    }

    /// 防抖间隔
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// 单次模型调用超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn override_with<T, V: crate::env::EnvVar<T>>(slot: &mut T) {
    match V::get_set() {
        Some(Ok(value)) => {
            tracing::info!("环境变量覆盖 {}", V::NAME);
            *slot = value;
        }
        Some(Err(e)) => tracing::warn!("忽略无效的环境变量: {}", e),
        None => {}
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: CorrectionConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> CorrectionResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(path: &str) -> CorrectionResult<Self> {
        Self::load_dotenv();
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// 取出配置
    pub fn into_config(self) -> CorrectionConfig {
        self.config
    }

    /// 从文件加载配置
    fn load_config() -> CorrectionResult<CorrectionConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(CorrectionConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> CorrectionResult<CorrectionConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CorrectionError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        parse_config(path, &content)
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> CorrectionResult<()> {
        let config = CorrectionConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| CorrectionError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| CorrectionError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

/// 按扩展名解析配置内容
pub fn parse_config(path: &str, content: &str) -> CorrectionResult<CorrectionConfig> {
    if path.ends_with(".json") {
        serde_json::from_str(content)
            .map_err(|e| CorrectionError::ConfigError(format!("解析JSON配置失败: {}", e)))
    } else {
        toml::from_str(content)
            .map_err(|e| CorrectionError::ConfigError(format!("解析TOML配置失败: {}", e)))
    }
}
