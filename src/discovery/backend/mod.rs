//! 远端健康注册中心抽象
//!
//! 只消费两种查询：
//! - 全局 "所有 passing 检查" 视图的阻塞查询，仅作为变更通知
//! - 按服务查询 passing 实例

pub mod consul;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::discovery::instance::ServiceInstance;
use crate::error::RegistryError;

pub use consul::ConsulHealthClient;

/// 健康检查状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passing,
    Warning,
    Critical,
    Maintenance,
    #[serde(other)]
    Unknown,
}

/// 一条健康检查记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    #[serde(default)]
    pub node: String,
    #[serde(rename = "CheckID", default)]
    pub check_id: String,
    #[serde(default)]
    pub name: String,
    pub status: CheckStatus,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    /// 节点级检查为空串
    #[serde(default)]
    pub service_name: String,
}

impl HealthCheck {
    pub fn passing(service_name: impl Into<String>) -> Self {
        Self {
            node: String::new(),
            check_id: String::new(),
            name: String::new(),
            status: CheckStatus::Passing,
            service_id: String::new(),
            service_name: service_name.into(),
        }
    }

    pub fn with_status(mut self, status: CheckStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeDescriptor {
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub address: String,
}

/// 注册的服务描述
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDescriptor {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: HashMap<String, String>,
}

/// 按服务查询的一条结果：节点、服务、以及该实例的全部检查
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceEntry {
    #[serde(default)]
    pub node: NodeDescriptor,
    pub service: ServiceDescriptor,
    #[serde(default, deserialize_with = "null_as_default")]
    pub checks: Vec<HealthCheck>,
}

impl ServiceEntry {
    /// 全部检查均为 passing 时才产出实例；服务地址为空时回退到节点地址
    pub fn to_instance(&self) -> Option<ServiceInstance> {
        if !self.checks.iter().all(|c| c.status == CheckStatus::Passing) {
            return None;
        }
        let host = if self.service.address.is_empty() {
            &self.node.address
        } else {
            &self.service.address
        };
        if host.is_empty() || self.service.service.is_empty() {
            return None;
        }
        Some(ServiceInstance {
            service_id: self.service.service.clone(),
            host: host.clone(),
            port: self.service.port,
            metadata: self.service.meta.clone(),
            tags: self.service.tags.clone(),
        })
    }
}

/// 带注册中心索引的响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedResponse<T> {
    pub index: u64,
    pub value: T,
}

/// 远端健康注册中心
#[async_trait]
pub trait HealthRegistry: Send + Sync {
    /// 阻塞查询全局 passing 检查视图
    ///
    /// # 参数
    /// * `wait_index` - 上次观察到的索引，0 表示立即返回
    /// * `wait` - 服务端等待预算
    async fn passing_checks(
        &self,
        wait_index: u64,
        wait: Duration,
    ) -> Result<IndexedResponse<Vec<HealthCheck>>, RegistryError>;

    /// 查询某个服务的健康条目
    async fn service_health(
        &self,
        service: &str,
        passing_only: bool,
    ) -> Result<IndexedResponse<Vec<ServiceEntry>>, RegistryError>;
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
