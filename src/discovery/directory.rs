//! 本地实例目录
//!
//! 服务名到实例集合的并发映射，键忽略大小写。条目只能整体替换或整体删除，
//! 读者拿到的是不可变快照，永远看不到半填充的条目。

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::discovery::instance::ServiceInstance;

/// 某一时刻的实例集合，不可变
pub type InstanceSnapshot = Arc<[ServiceInstance]>;

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// 最近一次写入时使用的服务名
    pub service_name: String,
    pub instances: InstanceSnapshot,
    /// 读取该集合时注册中心返回的索引，未知时为 0
    pub index: u64,
}

/// 忽略大小写的目录键
pub(crate) fn directory_key(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug, Default)]
pub struct InstanceDirectory {
    entries: DashMap<String, CacheEntry>,
}

impl InstanceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找服务的实例快照
    pub fn lookup(&self, name: &str) -> Option<InstanceSnapshot> {
        self.entries
            .get(&directory_key(name))
            .map(|entry| entry.instances.clone())
    }

    /// 用新的实例集合替换该服务的条目，后写者胜
    pub fn populate(&self, name: &str, instances: Vec<ServiceInstance>) -> InstanceSnapshot {
        self.populate_at(name, instances, 0)
    }

    /// 同 [`populate`](Self::populate)，并记录读取时的注册中心索引
    pub fn populate_at(
        &self,
        name: &str,
        instances: Vec<ServiceInstance>,
        index: u64,
    ) -> InstanceSnapshot {
        // 先在映射之外构建完整集合，再一次性发布
        let snapshot: InstanceSnapshot = instances.into();
        let entry = CacheEntry {
            service_name: name.to_string(),
            instances: snapshot.clone(),
            index,
        };
        self.entries.insert(directory_key(name), entry);
        debug!(service = name, count = snapshot.len(), index, "directory populated");
        snapshot
    }

    /// 删除整个条目；返回条目是否存在
    pub fn evict(&self, name: &str) -> bool {
        self.entries.remove(&directory_key(name)).is_some()
    }

    pub fn entry(&self, name: &str) -> Option<CacheEntry> {
        self.entries.get(&directory_key(name)).map(|e| e.value().clone())
    }

    pub fn entry_index(&self, name: &str) -> Option<u64> {
        self.entries.get(&directory_key(name)).map(|e| e.index)
    }

    /// 当前缓存的服务名（保留写入时的大小写）
    pub fn service_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.value().service_name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
