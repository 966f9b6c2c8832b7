//! 基于 TCP 的路由套接字
//!
//! 同步绑定监听端口；接受的每个连接上按长度前缀分帧，每一帧产生一个 [`SocketEvent`]。

use futures::StreamExt;
use futures::future;
use futures::stream;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::SocketError;
use crate::socket::address::AddressKey;
use crate::socket::handle::{EventStream, MessageSocket, SocketBinder, SocketEvent};

/// 默认的最大帧长度
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// 只支持 `tcp` 协议的绑定器
#[derive(Debug, Clone)]
pub struct TcpBinder {
    max_frame_length: usize,
}

impl TcpBinder {
    pub fn new() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }

    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }
}

impl Default for TcpBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketBinder for TcpBinder {
    fn bind(&self, address: &AddressKey) -> Result<Arc<dyn MessageSocket>, SocketError> {
        if address.protocol() != "tcp" {
            return Err(SocketError::UnsupportedProtocol(address.protocol().to_string()));
        }
        let bind_error = |source| SocketError::Bind {
            address: address.to_string(),
            source,
        };

        let listener = std::net::TcpListener::bind(address.endpoint()).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        debug!(address = %address, local = %local_addr, "tcp socket bound");

        Ok(Arc::new(TcpRouterSocket {
            address: address.clone(),
            local_addr,
            listener: Mutex::new(Some(listener)),
            cancel: CancellationToken::new(),
            max_frame_length: self.max_frame_length,
        }))
    }
}

pub struct TcpRouterSocket {
    address: AddressKey,
    local_addr: SocketAddr,
    listener: Mutex<Option<std::net::TcpListener>>,
    cancel: CancellationToken,
    max_frame_length: usize,
}

impl TcpRouterSocket {
    fn take_listener(&self) -> Option<std::net::TcpListener> {
        match self.listener.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl MessageSocket for TcpRouterSocket {
    fn address(&self) -> &AddressKey {
        &self.address
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }

    fn take_events(&self) -> Option<EventStream> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let listener = self.take_listener()?;
        let address = self.address.clone();
        let max_frame_length = self.max_frame_length;

        // from_std 需要运行时上下文，推迟到反应器线程第一次轮询时执行
        let events = stream::once(async move { tokio::net::TcpListener::from_std(listener) })
            .filter_map(|listener| {
                future::ready(match listener {
                    Ok(listener) => Some(TcpListenerStream::new(listener)),
                    Err(e) => {
                        error!(error = %e, "failed to register tcp listener");
                        None
                    }
                })
            })
            .flatten()
            .filter_map(|conn| {
                future::ready(match conn {
                    Ok(conn) => Some(conn),
                    Err(e) => {
                        warn!(error = %e, "tcp accept failed");
                        None
                    }
                })
            })
            .flat_map_unordered(None, move |conn| {
                let peer = conn.peer_addr().ok();
                let address = address.clone();
                let codec = LengthDelimitedCodec::builder()
                    .max_frame_length(max_frame_length)
                    .new_codec();
                FramedRead::new(conn, codec)
                    .filter_map(move |frame| {
                        future::ready(match frame {
                            Ok(frame) => Some(SocketEvent {
                                address: address.clone(),
                                peer,
                                payload: frame.freeze(),
                            }),
                            Err(e) => {
                                debug!(error = %e, peer = ?peer, "dropping malformed frame");
                                None
                            }
                        })
                    })
                    .boxed()
            })
            .take_until(self.cancel.clone().cancelled_owned());

        Some(events.boxed())
    }

    fn close(&self) -> Result<(), SocketError> {
        if self.cancel.is_cancelled() {
            return Err(SocketError::AlreadyClosed(self.address.to_string()));
        }
        self.cancel.cancel();
        // 未交给反应器的监听器在这里直接释放
        drop(self.take_listener());
        debug!(address = %self.address, "tcp socket closed");
        Ok(())
    }
}
