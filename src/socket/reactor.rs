//! 单线程事件反应器
//!
//! 一个专用线程运行 current-thread tokio 运行时，用 `StreamMap` 同时轮询所有已注册
//! 套接字的事件流，回调在该线程上串行执行。回调里做阻塞操作会拖住所有套接字。

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio_stream::StreamMap;
use tracing::{debug, error, info, warn};

use crate::error::SocketError;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::socket::address::AddressKey;
use crate::socket::handle::{EventStream, SocketEvent, SocketHandler};

enum ReactorCommand {
    Register {
        address: AddressKey,
        events: EventStream,
        handler: SocketHandler,
    },
    Shutdown,
}

pub struct EventReactor {
    name: String,
    commands: mpsc::UnboundedSender<ReactorCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
    lifecycle: Lifecycle,
    registrations: AtomicUsize,
}

impl EventReactor {
    /// 启动反应器线程
    pub fn start(name: impl Into<String>) -> Result<Self, SocketError> {
        let name = name.into();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SocketError::ReactorStart)?;
        let (commands, rx) = mpsc::unbounded_channel();

        let thread = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || runtime.block_on(event_loop(rx)))
            .map_err(SocketError::ReactorStart)?;

        info!(reactor = %name, "event reactor started");
        Ok(Self {
            name,
            commands,
            thread: Mutex::new(Some(thread)),
            lifecycle: Lifecycle::new("reactor"),
            registrations: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// 注册以来成功提交的套接字数量
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// 把套接字的事件流交给反应器线程，之后每个事件都在该线程上调用 `handler`
    pub fn register(
        &self,
        address: AddressKey,
        events: EventStream,
        handler: SocketHandler,
    ) -> Result<(), SocketError> {
        if !self.lifecycle.is_running() {
            return Err(SocketError::ReactorStopped);
        }
        self.commands
            .send(ReactorCommand::Register {
                address,
                events,
                handler,
            })
            .map_err(|_| SocketError::ReactorStopped)?;
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// 停止事件循环并等待线程退出；重复调用无副作用
    pub fn shutdown(&self) {
        if !self.lifecycle.begin_shutdown() {
            return;
        }
        let _ = self.commands.send(ReactorCommand::Shutdown);

        let thread = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(thread) = thread {
            if std::thread::current().id() == thread.thread().id() {
                warn!(reactor = %self.name, "shutdown called from reactor thread, not joining");
            } else if thread.join().is_err() {
                error!(reactor = %self.name, "event reactor thread panicked");
            }
        }
        self.lifecycle.mark_stopped();
        info!(reactor = %self.name, "event reactor stopped");
    }
}

impl Drop for EventReactor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 结束时追加一个 `None`，让事件循环知道何时移除回调
fn with_end_marker(events: EventStream) -> BoxStream<'static, Option<SocketEvent>> {
    events.map(Some).chain(stream::once(async { None })).boxed()
}

async fn event_loop(mut commands: mpsc::UnboundedReceiver<ReactorCommand>) {
    let mut streams: StreamMap<AddressKey, BoxStream<'static, Option<SocketEvent>>> =
        StreamMap::new();
    let mut handlers: HashMap<AddressKey, SocketHandler> = HashMap::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ReactorCommand::Register { address, events, handler }) => {
                    debug!(address = %address, "socket registered with reactor");
                    handlers.insert(address.clone(), handler);
                    streams.insert(address, with_end_marker(events));
                }
                Some(ReactorCommand::Shutdown) | None => break,
            },
            Some((address, event)) = streams.next(), if !streams.is_empty() => match event {
                Some(event) => {
                    if let Some(handler) = handlers.get(&address) {
                        dispatch(handler, event);
                    }
                }
                None => {
                    debug!(address = %address, "socket event stream ended");
                    handlers.remove(&address);
                }
            },
        }
    }
}

fn dispatch(handler: &SocketHandler, event: SocketEvent) {
    let address = event.address.clone();
    if std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
        error!(address = %address, "socket handler panicked");
    }
}
