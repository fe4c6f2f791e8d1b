//! 运行监管：停止信号与播放控制
//!
//! AgentHandle 可克隆，在编排循环与其所有者之间共享。停止请求只在循环的迭代边界被观察到；
//! 正在进行的推理调用不会被打断。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::core::{
    AgentMessage, EventSink, Playback, PlaybackController, RunMode, ShutdownManager,
    ShutdownReason,
};

#[derive(Clone)]
pub struct AgentHandle {
    /// 用户停止时触发
    stop_token: CancellationToken,
    /// 保证 manual-shutdown 消息只发一次
    stopped: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    playback: Arc<RwLock<PlaybackController>>,
    mode: RunMode,
    sink: Arc<dyn EventSink>,
    shutdown: ShutdownManager,
}

impl AgentHandle {
    pub fn new(mode: RunMode, sink: Arc<dyn EventSink>, shutdown: ShutdownManager) -> Self {
        Self {
            stop_token: CancellationToken::new(),
            stopped: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            playback: Arc::new(RwLock::new(PlaybackController::new(mode))),
            mode,
            sink,
            shutdown,
        }
    }

    /// 停止 Agent：发出 manual-shutdown、清除运行标志并触发 shutdown。
    ///
    /// 重复调用不会再次发消息，但每次都会触发 shutdown。
    pub fn stop_agent(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_token.cancel();
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!("Agent stopped by user");
            self.sink.emit(AgentMessage::ManualShutdown {
                value: "The agent has been manually shutdown.".to_string(),
            });
        }
        self.shutdown.shutdown(ShutdownReason::ManualStop);
    }

    /// 设置播放标志；仅单步模式生效
    pub async fn update_playback_control(&self, value: Playback) {
        self.playback.write().await.set_playback(value);
    }

    pub(crate) async fn should_suspend(&self) -> bool {
        self.playback.write().await.should_suspend()
    }

    pub async fn playback(&self) -> Playback {
        self.playback.read().await.playback()
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_token.is_cancelled()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn shutdown_manager(&self) -> &ShutdownManager {
        &self.shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(mode: RunMode) -> (AgentHandle, mpsc::UnboundedReceiver<AgentMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AgentHandle::new(mode, Arc::new(tx), ShutdownManager::new()), rx)
    }

    #[tokio::test]
    async fn test_stop_emits_once_and_signals_each_time() {
        let (handle, mut rx) = handle(RunMode::Automatic);
        let mut reasons = handle.shutdown_manager().subscribe();
        handle.set_running(true);

        handle.stop_agent();
        handle.stop_agent();

        assert!(!handle.is_running());
        assert!(handle.is_stop_requested());
        assert_eq!(rx.try_recv().unwrap().kind(), "manual-shutdown");
        assert!(rx.try_recv().is_err());
        assert_eq!(reasons.recv().await.unwrap(), ShutdownReason::ManualStop);
        assert_eq!(reasons.recv().await.unwrap(), ShutdownReason::ManualStop);
    }

    #[tokio::test]
    async fn test_playback_only_in_step_mode() {
        let (auto, _rx) = handle(RunMode::Automatic);
        auto.update_playback_control(Playback::Pause).await;
        assert_eq!(auto.playback().await, Playback::Play);
        assert!(!auto.should_suspend().await);

        let (step, _rx) = handle(RunMode::StepPaused);
        assert!(step.should_suspend().await);
        step.update_playback_control(Playback::Play).await;
        assert!(!step.should_suspend().await);
        assert!(step.should_suspend().await);
    }
}
