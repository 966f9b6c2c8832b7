//! 客户端生命周期状态机
//!
//! `Running -> ShuttingDown -> Stopped`，只能前进。后台任务持有 `Lifecycle` 的克隆，
//! 在每个挂起点之前和之后检查取消令牌，而不是轮询共享的布尔标志。

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    name: &'static str,
    state: watch::Sender<LifecycleState>,
    token: CancellationToken,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(LifecycleState::Running);
        Self {
            name,
            state,
            token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// 后台任务使用的取消令牌
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 进入 ShuttingDown 并触发取消；返回是否由本次调用完成了状态转换
    pub fn begin_shutdown(&self) -> bool {
        let changed = self.advance(LifecycleState::ShuttingDown);
        self.token.cancel();
        changed
    }

    /// 所有后台任务退出后调用
    pub fn mark_stopped(&self) {
        self.token.cancel();
        self.advance(LifecycleState::Stopped);
    }

    fn advance(&self, next: LifecycleState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if changed {
            info!(component = self.name, state = ?next, "lifecycle transition");
        }
        changed
    }
}
