//! 服务实例定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// 服务实例
///
/// 不可变值。身份由 `(service_id, host, port)` 决定，元数据和标签不参与比较。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// 服务名（如 "orders-api"）
    pub service_id: String,

    pub host: String,

    pub port: u16,

    /// 注册时携带的 Meta
    pub metadata: HashMap<String, String>,

    /// 注册时携带的标签
    pub tags: Vec<String>,
}

impl ServiceInstance {
    /// 创建新的服务实例
    pub fn new(service_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            service_id: service_id.into(),
            host: host.into(),
            port,
            metadata: HashMap::new(),
            tags: Vec::new(),
        }
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 添加标签
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// `host:port`，IPv6 地址加方括号
    pub fn authority(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// 转换为 HTTP URL
    pub fn to_http_url(&self) -> String {
        format!("http://{}", self.authority())
    }
}

impl PartialEq for ServiceInstance {
    fn eq(&self, other: &Self) -> bool {
        self.service_id == other.service_id && self.host == other.host && self.port == other.port
    }
}

impl Eq for ServiceInstance {}

impl Hash for ServiceInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service_id.hash(state);
        self.host.hash(state);
        self.port.hash(state);
    }
}
