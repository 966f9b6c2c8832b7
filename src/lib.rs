//! Flare Cloud Core Library
//!
//! 两个互相独立的子系统：
//!
//! - **服务发现**：本地缓存 Consul 健康实例，未命中时以 single-flight 方式按需获取，
//!   后台对全局健康索引做长轮询，索引变化时整体失效相关服务的缓存。
//! - **套接字复用**：按 `{protocol}://{host}:{port}` 对每个地址只绑定一次套接字，
//!   所有套接字共享一个单线程事件反应器。
//!
//! ```rust,no_run
//! use flare_cloud_core::{Config, DiscoveryClient};
//!
//! # async fn run() -> flare_cloud_core::Result<()> {
//! let config = Config::load_from_file("flare-cloud.toml")?;
//! let client = DiscoveryClient::new(&config)?;
//! let instances = client.get_instances("orders-api").await?;
//! for instance in &instances {
//!     println!("{}", instance.to_http_url());
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod retry;
pub mod socket;
pub mod telemetry;

// Re-exports
pub use config::{
    Config, ConsulConfig, FetchConfig, LogConfig, LogFormat, ReactorConfig, WatcherConfig,
};
pub use error::{
    ConfigError, DiscoveryError, ErrorCategory, ErrorCode, FlareError, RegistryError, Result,
    SocketError,
};
pub use lifecycle::{Lifecycle, LifecycleState};

pub use discovery::{
    DiscoveryClient, HealthRegistry, HealthWatcher, InstanceDirectory, InstanceSnapshot,
    ServiceInstance, WatchOutcome,
};
pub use socket::{
    AddressKey, EventReactor, MessageSocket, SocketBinder, SocketEvent, SocketHandle,
    SocketRegistry,
};
pub use telemetry::init_tracing;
