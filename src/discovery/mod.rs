//! 本地缓存的服务发现
//!
//! - [`InstanceDirectory`]：忽略大小写的服务名到实例快照的并发映射
//! - [`HealthWatcher`]：对 Consul 全局健康索引做长轮询，索引变化时失效缓存
//! - [`DiscoveryClient`]：读路径，未命中时以 single-flight 方式按需获取并发布

pub mod backend;
pub mod client;
pub mod directory;
pub mod instance;
pub mod watcher;

pub use backend::{
    CheckStatus, ConsulHealthClient, HealthCheck, HealthRegistry, IndexedResponse,
    NodeDescriptor, ServiceDescriptor, ServiceEntry,
};
pub use client::DiscoveryClient;
pub use directory::{CacheEntry, InstanceDirectory, InstanceSnapshot};
pub use instance::ServiceInstance;
pub use watcher::{HealthWatcher, WatchOutcome};
