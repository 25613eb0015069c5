//! 纠错配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{BackendKind, ConfigManager, CorrectionConfig, UrlFilterMode};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 管道相关
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
    pub const DEFAULT_USEFULNESS_THRESHOLD: f64 = 0.5;
    pub const DEFAULT_MIN_WORD_COUNT: usize = 4;

    // 分句相关
    pub const SENTENCE_TERMINATORS: &[char] = &['。', '.'];

    // 接受建议后清理掉的残留标点
    pub const STRAY_PUNCTUATION: &[char] = &['，', ',', '、', '；', ';'];

    // 允许触发纠错的输入框类型
    pub const TEXT_INPUT_TYPES: &[&str] = &["text", "email", "password", "search", "tel", "url"];

    // 后端设置
    pub const DEFAULT_CLOUD_API_URL: &str = "https://api.anthropic.com/v1/messages";
    pub const DEFAULT_CLOUD_MODEL: &str = "claude-sonnet-4-5-20250929";
    pub const DEFAULT_CLOUD_API_VERSION: &str = "2023-06-01";
    pub const DEFAULT_CLOUD_MAX_TOKENS: u32 = 1024;
    pub const RATING_MAX_TOKENS: u32 = 50;
    pub const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:11434";
    pub const DEFAULT_LOCAL_MODEL: &str = "qwen2.5:3b";
    pub const DEFAULT_LOCAL_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_LOCAL_TOP_K: u32 = 3;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    // 缓存设置
    pub const DEFAULT_CACHE_CAPACITY: usize = 500;

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "idiomatic-zh.toml",
        ".idiomatic-zh.toml",
        "idiomatic-zh.json",
        "~/.config/idiomatic-zh/config.toml",
        "/etc/idiomatic-zh/config.toml",
    ];
}

/// 加载配置，失败时退回默认值
pub fn load_correction_config() -> CorrectionConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.get_config().clone(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            CorrectionConfig::default()
        }
    }
}
