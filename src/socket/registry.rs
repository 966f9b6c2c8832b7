//! 按地址复用的套接字注册表
//!
//! 每个地址键至多创建一个套接字：同一地址的并发调用在该键的 `OnceCell` 上串行，
//! 只有一个调用者执行绑定并向反应器注册，所有调用者拿到同一个句柄。绑定失败时
//! 单元保持未初始化，之后的调用可以重试。不同地址之间互不阻塞。
//!
//! 注意：地址已存在时，后来者传入的 `handler` 不会被挂接，只会记录一条警告。

use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::config::ReactorConfig;
use crate::error::SocketError;
use crate::socket::address::AddressKey;
use crate::socket::handle::{SocketBinder, SocketEvent, SocketHandle, SocketHandler};
use crate::socket::reactor::EventReactor;
use crate::socket::tcp::TcpBinder;

pub struct SocketRegistry {
    binder: Arc<dyn SocketBinder>,
    reactor: Arc<EventReactor>,
    sockets: DashMap<AddressKey, Arc<OnceCell<SocketHandle>>>,
}

impl SocketRegistry {
    /// 使用 TCP 绑定器和给定的反应器
    pub fn new(reactor: Arc<EventReactor>) -> Self {
        Self::with_binder(reactor, Arc::new(TcpBinder::new()))
    }

    pub fn with_binder(reactor: Arc<EventReactor>, binder: Arc<dyn SocketBinder>) -> Self {
        Self {
            binder,
            reactor,
            sockets: DashMap::new(),
        }
    }

    /// 按配置启动一个独占的反应器
    pub fn start(config: &ReactorConfig) -> Result<Self, SocketError> {
        let reactor = Arc::new(EventReactor::start(config.thread_name.clone())?);
        Ok(Self::new(reactor))
    }

    pub fn reactor(&self) -> &Arc<EventReactor> {
        &self.reactor
    }

    /// 打开（或复用）绑定在 `{protocol}://{endpoint}` 上的套接字
    ///
    /// 只有首次成功创建时的 `handler` 会收到该地址的就绪事件
    pub async fn open_socket<F>(
        &self,
        protocol: &str,
        endpoint: SocketAddr,
        handler: F,
    ) -> Result<SocketHandle, SocketError>
    where
        F: Fn(SocketEvent) + Send + Sync + 'static,
    {
        let address = AddressKey::new(protocol, endpoint)?;
        let cell = self.sockets.entry(address.clone()).or_default().clone();

        let mut created = false;
        let handle = cell
            .get_or_try_init(|| {
                created = true;
                std::future::ready(self.bind_and_register(&address, Arc::new(handler)))
            })
            .await?
            .clone();

        if !created {
            warn!(address = %address, "socket already bound, handler discarded");
        }
        Ok(handle)
    }

    /// `open_socket("tcp", endpoint, handler)`
    pub async fn open_tcp<F>(
        &self,
        endpoint: SocketAddr,
        handler: F,
    ) -> Result<SocketHandle, SocketError>
    where
        F: Fn(SocketEvent) + Send + Sync + 'static,
    {
        self.open_socket("tcp", endpoint, handler).await
    }

    /// 以字符串 IP 和端口打开 TCP 套接字
    pub async fn open_tcp_at<F>(
        &self,
        ip: &str,
        port: u16,
        handler: F,
    ) -> Result<SocketHandle, SocketError>
    where
        F: Fn(SocketEvent) + Send + Sync + 'static,
    {
        let address = AddressKey::from_parts("tcp", ip, port)?;
        self.open_socket(address.protocol(), address.endpoint(), handler)
            .await
    }

    fn bind_and_register(
        &self,
        address: &AddressKey,
        handler: SocketHandler,
    ) -> Result<SocketHandle, SocketError> {
        debug!(address = %address, "create socket");
        let socket = self.binder.bind(address)?;
        let events = socket
            .take_events()
            .ok_or_else(|| SocketError::AlreadyClosed(address.to_string()))?;

        if let Err(e) = self.reactor.register(address.clone(), events, handler) {
            if let Err(close_err) = socket.close() {
                warn!(address = %address, error = %close_err, "close after failed registration");
            }
            return Err(e);
        }
        info!(address = %address, reactor = %self.reactor.name(), "socket bound and registered");
        Ok(SocketHandle::new(socket))
    }

    /// 当前已成功创建的套接字
    pub fn get(&self, protocol: &str, endpoint: SocketAddr) -> Option<SocketHandle> {
        let address = AddressKey::new(protocol, endpoint).ok()?;
        self.sockets
            .get(&address)
            .and_then(|cell| cell.get().cloned())
    }

    pub fn contains(&self, protocol: &str, endpoint: SocketAddr) -> bool {
        self.get(protocol, endpoint).is_some()
    }

    /// 已成功创建的套接字数量
    pub fn len(&self) -> usize {
        self.sockets
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 尽力关闭所有套接字
    ///
    /// 单个套接字关闭失败只记录日志，不影响其余套接字；之后清空注册表。
    /// 不保证与并发的 `open_socket` 安全交错。
    pub fn dispose(&self) {
        let handles: Vec<SocketHandle> = self
            .sockets
            .iter()
            .filter_map(|entry| entry.value().get().cloned())
            .collect();

        for handle in handles {
            match handle.close() {
                Ok(()) => debug!(address = %handle.address(), "socket disposed"),
                Err(e) => {
                    error!(address = %handle.address(), error = %e, "dispose socket failed")
                }
            }
        }
        self.sockets.clear();
    }
}

impl Drop for SocketRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}
