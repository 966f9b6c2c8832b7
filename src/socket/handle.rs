//! 消息套接字协作方接口
//!
//! 真正的套接字库只需要实现两个 trait：`SocketBinder` 负责同步绑定，
//! `MessageSocket` 交出就绪事件流并支持关闭。事件流由 [`EventReactor`](super::EventReactor) 驱动。

use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::SocketError;
use crate::socket::address::AddressKey;

/// 套接字上的一次就绪事件（一帧入站消息）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEvent {
    pub address: AddressKey,
    pub peer: Option<SocketAddr>,
    pub payload: Bytes,
}

/// 就绪事件回调，在反应器线程上串行执行，不能阻塞
pub type SocketHandler = Arc<dyn Fn(SocketEvent) + Send + Sync>;

/// 套接字交给反应器驱动的事件流
pub type EventStream = BoxStream<'static, SocketEvent>;

pub trait MessageSocket: Send + Sync {
    fn address(&self) -> &AddressKey;

    /// 实际绑定的本地地址（端口 0 时由系统分配）
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// 取出事件流，只能成功一次
    fn take_events(&self) -> Option<EventStream>;

    /// 关闭套接字；事件流随之结束
    fn close(&self) -> Result<(), SocketError>;
}

pub trait SocketBinder: Send + Sync {
    /// 同步创建并绑定套接字，失败时不留下任何状态
    fn bind(&self, address: &AddressKey) -> Result<Arc<dyn MessageSocket>, SocketError>;
}

/// 共享的已绑定套接字句柄
#[derive(Clone)]
pub struct SocketHandle {
    socket: Arc<dyn MessageSocket>,
}

impl SocketHandle {
    pub fn new(socket: Arc<dyn MessageSocket>) -> Self {
        Self { socket }
    }

    pub fn address(&self) -> &AddressKey {
        self.socket.address()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn close(&self) -> Result<(), SocketError> {
        self.socket.close()
    }

    /// 两个句柄是否指向同一个套接字
    pub fn ptr_eq(&self, other: &SocketHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.socket), Arc::as_ptr(&other.socket))
    }
}

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandle")
            .field("address", &self.address().to_string())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}
