//! 健康索引监听
//!
//! 对全局 passing 检查视图做阻塞查询，把索引变化当作变更通知：
//! 索引不变（等待超时）时什么都不做；索引变化时删除响应中出现的每个服务的缓存条目，
//! 迫使下一次读取重新获取。注册中心索引不携带按服务的差异，所以这里是保守的整体失效。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatcherConfig;
use crate::discovery::backend::{HealthCheck, HealthRegistry};
use crate::discovery::directory::{InstanceDirectory, directory_key};
use crate::error::RegistryError;
use crate::lifecycle::Lifecycle;
use crate::retry::{BackoffPolicy, ExponentialBackoffPolicy};

/// 单次轮询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// 长轮询超时，索引未变
    Unchanged,
    /// 索引前进，列出的服务已被失效
    Advanced { index: u64, evicted: Vec<String> },
}

pub struct HealthWatcher {
    registry: Arc<dyn HealthRegistry>,
    directory: Arc<InstanceDirectory>,
    wait: Duration,
    backoff: Box<dyn BackoffPolicy>,
    cursor: AtomicU64,
}

impl HealthWatcher {
    pub fn new(
        registry: Arc<dyn HealthRegistry>,
        directory: Arc<InstanceDirectory>,
        config: &WatcherConfig,
    ) -> Self {
        Self {
            registry,
            directory,
            wait: config.wait(),
            backoff: Box::new(ExponentialBackoffPolicy::new(
                config.backoff_base(),
                config.backoff_max(),
            )),
            cursor: AtomicU64::new(0),
        }
    }

    /// 替换退避策略
    pub fn with_backoff(mut self, backoff: impl BackoffPolicy + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// 从指定索引开始监听
    pub fn with_cursor(self, index: u64) -> Self {
        self.cursor.store(index, Ordering::SeqCst);
        self
    }

    /// 当前游标
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    /// 执行一次阻塞查询并应用结果
    ///
    /// 出错时游标保持不变。注册中心返回的索引至少按 1 处理：以 0 发起的查询会立即返回，
    /// 游标停在 0 会让循环空转
    pub async fn poll_once(&self) -> Result<WatchOutcome, RegistryError> {
        let cursor = self.cursor();
        let response = self.registry.passing_checks(cursor, self.wait).await?;
        Ok(self.apply(cursor, response.index.max(1), &response.value))
    }

    fn apply(&self, cursor: u64, index: u64, checks: &[HealthCheck]) -> WatchOutcome {
        if index == cursor {
            return WatchOutcome::Unchanged;
        }

        let expired = distinct_services(checks);
        debug!(
            cursor,
            index,
            services = ?expired,
            "health index moved, evicting passing services"
        );
        let evicted: Vec<String> = expired
            .into_iter()
            .filter(|name| self.directory.evict(name))
            .collect();

        if index < cursor {
            warn!(cursor, index, "registry index went backwards, keeping cursor");
        }
        self.cursor.fetch_max(index, Ordering::SeqCst);

        WatchOutcome::Advanced { index, evicted }
    }

    /// 运行监听循环直到取消
    ///
    /// 取消令牌在每次网络调用前后检查；已发出的调用会等它完成，不会被中途丢弃
    pub async fn run(&self, token: CancellationToken) {
        info!(wait_secs = self.wait.as_secs(), "health watcher started");
        let mut failures = 0usize;

        while !token.is_cancelled() {
            let result = self.poll_once().await;
            if token.is_cancelled() {
                break;
            }

            match result {
                Ok(_) => failures = 0,
                Err(e) => {
                    let delay = self.backoff.backoff_duration(failures);
                    failures = failures.saturating_add(1);
                    warn!(
                        error = %e,
                        cursor = self.cursor(),
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        "health watch failed, backing off"
                    );
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!(cursor = self.cursor(), "health watcher stopped");
    }

    /// 在当前 tokio 运行时上启动后台监听任务
    pub fn spawn(self: Arc<Self>, lifecycle: &Lifecycle) -> JoinHandle<()> {
        let token = lifecycle.token();
        tokio::spawn(async move { self.run(token).await })
    }
}

/// 响应中出现的服务名，忽略大小写去重，跳过节点级检查
fn distinct_services(checks: &[HealthCheck]) -> Vec<String> {
    let mut seen: HashMap<String, String> = HashMap::new();
    for check in checks {
        if check.service_name.is_empty() {
            continue;
        }
        seen.entry(directory_key(&check.service_name))
            .or_insert_with(|| check.service_name.clone());
    }
    let mut names: Vec<String> = seen.into_values().collect();
    names.sort();
    names
}
