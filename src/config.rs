use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub consul: ConsulConfig,
    pub watcher: WatcherConfig,
    pub discovery: FetchConfig,
    pub reactor: ReactorConfig,
    pub log: LogConfig,
}

/// Consul HTTP API 连接配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsulConfig {
    pub url: String,
    /// ACL token，作为 X-Consul-Token 头发送
    pub token: Option<String>,
    pub datacenter: Option<String>,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8500".to_string(),
            token: None,
            datacenter: None,
        }
    }
}

/// 健康索引长轮询配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// 服务端等待预算（秒），Consul 上限为 600
    pub wait_secs: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            wait_secs: 55,
            backoff_base_ms: 250,
            backoff_max_ms: 30_000,
        }
    }
}

impl WatcherConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

/// 缓存未命中时按需获取的配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub fetch_timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
        }
    }
}

impl FetchConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReactorConfig {
    pub thread_name: String,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            thread_name: "flare-reactor".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// RUST_LOG 未设置时使用的过滤指令
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consul.url.trim().is_empty() {
            return Err(ConfigError::Invalid("consul.url 不能为空".to_string()));
        }
        if self.watcher.wait_secs == 0 || self.watcher.wait_secs > 600 {
            return Err(ConfigError::Invalid(format!(
                "watcher.wait_secs 必须在 1..=600 之间，当前为 {}",
                self.watcher.wait_secs
            )));
        }
        if self.watcher.backoff_base_ms > self.watcher.backoff_max_ms {
            return Err(ConfigError::Invalid(
                "watcher.backoff_base_ms 不能大于 backoff_max_ms".to_string(),
            ));
        }
        if self.discovery.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "discovery.fetch_timeout_ms 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}
