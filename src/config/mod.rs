use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::sync::Arc;

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// 谱面数据来源，http(s) 地址或本地 JSON 文件路径
    pub catalog_source: String,
    pub catalog_cache_ttl_secs: u64,
    pub profile_base_url: String,
    pub profile_user_agent: String,
    pub http_timeout_secs: u64,
    pub usage_log_path: String,
    pub preferences_path: String,
    pub fonts_dir: String,
    pub max_concurrent_renders: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            catalog_source: "data/data.json".to_string(),
            catalog_cache_ttl_secs: 10 * 60,
            profile_base_url: "https://ongeki-score.net".to_string(),
            profile_user_agent: "Mozilla/5.0 (pongeki-backend)".to_string(),
            http_timeout_secs: 15,
            usage_log_path: "data/usage_log.csv".to_string(),
            preferences_path: "data/preferences.json".to_string(),
            fonts_dir: "resources/fonts".to_string(),
            max_concurrent_renders: 4,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: env_or("HOST", &d.host),
            port: env_parse_or("PORT", d.port),
            catalog_source: env_or("CATALOG_SOURCE", &d.catalog_source),
            catalog_cache_ttl_secs: env_parse_or("CATALOG_CACHE_TTL_SECS", d.catalog_cache_ttl_secs),
            profile_base_url: env_or("PROFILE_BASE_URL", &d.profile_base_url),
            profile_user_agent: env_or("PROFILE_USER_AGENT", &d.profile_user_agent),
            http_timeout_secs: env_parse_or("HTTP_TIMEOUT_SECS", d.http_timeout_secs),
            usage_log_path: env_or("USAGE_LOG_PATH", &d.usage_log_path),
            preferences_path: env_or("PREFERENCES_PATH", &d.preferences_path),
            fonts_dir: env_or("FONTS_DIR", &d.fonts_dir),
            max_concurrent_renders: env_parse_or("MAX_CONCURRENT_RENDERS", d.max_concurrent_renders)
                .max(1),
        }
    }

    /// 从 YAML 文件读取配置，文件里没写的字段使用默认值
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::ConfigError(format!(
                "无法读取配置文件 '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        let mut config: Self = serde_yaml::from_str(&contents)?;
        config.max_concurrent_renders = config.max_concurrent_renders.max(1);
        Ok(config)
    }

    /// 设置了 CONFIG_FILE 时优先读文件，读取失败则回退到环境变量
    pub fn load() -> Self {
        match env::var("CONFIG_FILE") {
            Ok(path) => match Self::from_file(&path) {
                Ok(config) => {
                    log::info!("已从配置文件加载配置: {path}");
                    config
                }
                Err(e) => {
                    log::error!("加载配置文件失败，回退到环境变量: {e}");
                    Self::from_env()
                }
            },
            Err(_) => Self::from_env(),
        }
    }
}

lazy_static! {
    pub static ref CONFIG: Arc<AppConfig> = Arc::new(AppConfig::load());
}
