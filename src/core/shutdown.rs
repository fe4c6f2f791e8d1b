//! 关闭信号
//!
//! 编排器在终止时（手动停止、规划失败、致命错误、完成、循环预算耗尽）发出 shutdown，
//! 所有者通过 token 等待或订阅关闭原因，而不是注册回调。

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::core::{AgentHandle, PlanningFailure};

/// 关闭原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户调用 stop_agent
    ManualStop,
    /// 所有任务完成
    Completed,
    /// 达到循环预算
    LoopLimit,
    /// 目标拆解失败
    PlanningFailed(PlanningFailure),
    /// 分析 / 执行阶段的致命错误
    FatalError(String),
}

/// 关闭信号管理器
#[derive(Clone, Debug)]
pub struct ShutdownManager {
    shutdown_token: CancellationToken,
    reason_tx: broadcast::Sender<ShutdownReason>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (reason_tx, _) = broadcast::channel(16);
        Self {
            shutdown_token: CancellationToken::new(),
            reason_tx,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// 触发关闭；可重复调用，每次都会广播原因
    pub fn shutdown(&self, reason: ShutdownReason) {
        tracing::debug!(?reason, "Shutdown signalled");
        let _ = self.reason_tx.send(reason);
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.reason_tx.subscribe()
    }

    pub async fn wait_for_shutdown(&self) {
        self.shutdown_token.cancelled().await;
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 安装系统信号处理器 (Ctrl+C, SIGTERM)：收到信号时停止 Agent
pub fn install_signal_handlers(handle: AgentHandle) {
    let ctrl_c_handle = handle.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            tracing::info!("Received Ctrl+C, stopping agent...");
            ctrl_c_handle.stop_agent();
        }
    });

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM, stopping agent...");
                handle.stop_agent();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_manager_new() {
        let manager = ShutdownManager::new();
        assert!(!manager.is_shutdown());
    }

    #[test]
    fn test_shutdown_manager_token() {
        let manager = ShutdownManager::new();
        let token = manager.token();
        assert!(!token.is_cancelled());
        manager.shutdown(ShutdownReason::ManualStop);
        assert!(token.is_cancelled());
        assert!(manager.is_shutdown());
    }

    #[tokio::test]
    async fn test_subscribers_receive_every_reason() {
        let manager = ShutdownManager::new();
        let mut rx = manager.subscribe();
        manager.shutdown(ShutdownReason::ManualStop);
        manager.shutdown(ShutdownReason::ManualStop);
        assert_eq!(rx.recv().await.unwrap(), ShutdownReason::ManualStop);
        assert_eq!(rx.recv().await.unwrap(), ShutdownReason::ManualStop);
        manager.wait_for_shutdown().await;
    }
}
