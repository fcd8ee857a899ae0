//! 任务监管：取消令牌的生命周期
//!
//! 持有根 CancellationToken；Ctrl+C 触发 cancel 后，所有子 token（每任务一个）同步取消。
//! 暂停状态不在这里：它属于各任务自己的 TaskContext。

use tokio_util::sync::CancellationToken;

/// 任务级生命周期管理：根取消令牌与按任务派生的子令牌
#[derive(Debug, Default)]
pub struct TaskSupervisor {
    cancel_token: CancellationToken,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 触发取消（用户 Ctrl+C）
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// 创建子 token（用于单个任务）
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}
