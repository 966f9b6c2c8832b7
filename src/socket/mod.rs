//! 按地址复用的套接字与共享事件反应器
//!
//! 调用方按 `{protocol}://{host}:{port}` 请求套接字，[`SocketRegistry`] 对每个地址只绑定一次，
//! 并把就绪事件交给唯一的 [`EventReactor`] 线程分发给该地址的回调。

pub mod address;
pub mod handle;
pub mod reactor;
pub mod registry;
pub mod tcp;

pub use address::AddressKey;
pub use handle::{
    EventStream, MessageSocket, SocketBinder, SocketEvent, SocketHandle, SocketHandler,
};
pub use reactor::EventReactor;
pub use registry::SocketRegistry;
pub use tcp::{TcpBinder, TcpRouterSocket};
