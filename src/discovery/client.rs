//! 服务发现客户端
//!
//! 读路径：先查本地目录，命中直接返回快照的副本；未命中时对同名服务的并发请求
//! 合并为一次远端获取（single-flight），获取完整结果后再发布到目录，然后把同一
//! 集合返回给所有等待者。后台监听任务负责失效。

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::discovery::backend::{ConsulHealthClient, HealthRegistry};
use crate::discovery::directory::{InstanceDirectory, InstanceSnapshot, directory_key};
use crate::discovery::instance::ServiceInstance;
use crate::discovery::watcher::HealthWatcher;
use crate::error::{DiscoveryError, FlareError};
use crate::lifecycle::{Lifecycle, LifecycleState};

type FetchResult = Result<InstanceSnapshot, DiscoveryError>;
type InflightFetch = Shared<BoxFuture<'static, FetchResult>>;

/// 服务发现客户端
pub struct DiscoveryClient {
    registry: Arc<dyn HealthRegistry>,
    directory: Arc<InstanceDirectory>,
    watcher: Arc<HealthWatcher>,
    inflight: Arc<DashMap<String, InflightFetch>>,
    fetch_timeout: Duration,
    lifecycle: Lifecycle,
    watch_task: Mutex<Option<JoinHandle<()>>>,
}

impl DiscoveryClient {
    /// 根据配置创建 Consul 客户端并启动后台监听
    ///
    /// 必须在 tokio 运行时内调用
    pub fn new(config: &Config) -> Result<Self, FlareError> {
        config.validate()?;
        let registry = Arc::new(ConsulHealthClient::new(&config.consul)?);
        info!(url = %registry.url(), "consul discovery client created");
        Ok(Self::with_registry(registry, config))
    }

    /// 使用给定的注册中心实现创建客户端并启动后台监听
    pub fn with_registry(registry: Arc<dyn HealthRegistry>, config: &Config) -> Self {
        let directory = Arc::new(InstanceDirectory::new());
        let watcher = Arc::new(HealthWatcher::new(
            registry.clone(),
            directory.clone(),
            &config.watcher,
        ));
        Self::from_parts(registry, directory, watcher, config)
    }

    /// 使用已构建好的目录和监听器组装客户端
    pub fn from_parts(
        registry: Arc<dyn HealthRegistry>,
        directory: Arc<InstanceDirectory>,
        watcher: Arc<HealthWatcher>,
        config: &Config,
    ) -> Self {
        let lifecycle = Lifecycle::new("discovery");
        let handle = watcher.clone().spawn(&lifecycle);
        Self {
            registry,
            directory,
            watcher,
            inflight: Arc::new(DashMap::new()),
            fetch_timeout: config.discovery.fetch_timeout(),
            lifecycle,
            watch_task: Mutex::new(Some(handle)),
        }
    }

    pub fn description(&self) -> &'static str {
        "Flare Cloud Consul Client"
    }

    /// 获取服务的健康实例
    ///
    /// 未知服务或没有 passing 实例时返回空列表；远端不可用时返回错误且不修改缓存
    pub async fn get_instances(
        &self,
        service_id: &str,
    ) -> Result<Vec<ServiceInstance>, DiscoveryError> {
        if let Some(snapshot) = self.directory.lookup(service_id) {
            return Ok(snapshot.to_vec());
        }

        let key = directory_key(service_id);
        let fetch = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| self.start_fetch(key, service_id))
            .clone();

        fetch.await.map(|snapshot| snapshot.to_vec())
    }

    /// 正在进行的按需获取数量
    pub fn pending_fetches(&self) -> usize {
        self.inflight.len()
    }

    /// 构建共享的获取任务
    ///
    /// 任务在发布结果之前自行让出在途槽位：之后的未命中要么读到本次写入的条目，
    /// 要么发起新的获取，不会拿到一个可能已被失效的旧结果
    fn start_fetch(&self, key: String, service_id: &str) -> InflightFetch {
        let registry = self.registry.clone();
        let directory = self.directory.clone();
        let inflight = self.inflight.clone();
        let timeout = self.fetch_timeout;
        let service = service_id.to_string();

        async move {
            debug!(service = %service, "cache miss, fetching instances");
            let outcome =
                tokio::time::timeout(timeout, registry.service_health(&service, true)).await;
            inflight.remove(&key);

            let response = match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!(service = %service, error = %e, "instance fetch failed");
                    return Err(DiscoveryError::unavailable(service, &e));
                }
                Err(_) => {
                    warn!(
                        service = %service,
                        timeout_ms = timeout.as_millis() as u64,
                        "instance fetch timed out"
                    );
                    return Err(DiscoveryError::Timeout { service });
                }
            };

            let instances: Vec<ServiceInstance> = response
                .value
                .iter()
                .filter_map(|entry| entry.to_instance())
                .collect();
            Ok(directory.populate_at(&service, instances, response.index))
        }
        .boxed()
        .shared()
    }

    /// 当前缓存的服务名
    pub fn services(&self) -> Vec<String> {
        self.directory.service_names()
    }

    pub fn directory(&self) -> &Arc<InstanceDirectory> {
        &self.directory
    }

    /// 后台监听的当前索引
    pub fn cursor(&self) -> u64 {
        self.watcher.cursor()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// 停止后台监听并等待其退出
    ///
    /// 正在进行的长轮询会被允许完成，因此最长可能等待一个等待预算
    pub async fn shutdown(&self) {
        self.lifecycle.begin_shutdown();
        let handle = self.watch_task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "health watcher task ended abnormally");
            }
        }
        self.lifecycle.mark_stopped();
    }
}

impl Drop for DiscoveryClient {
    fn drop(&mut self) {
        self.lifecycle.begin_shutdown();
    }
}
