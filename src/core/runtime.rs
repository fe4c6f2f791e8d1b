//! Agent 运行时：后台任务驱动编排器
//!
//! 建立 cmd / state / done 三通道：命令（Resume/Pause/Stop）从所有者发往运行时；
//! 每次 run 返回后发布状态快照；最终结果通过 oneshot 交还所有者。

use tokio::sync::{mpsc, oneshot, watch};

use crate::core::{
    AgentError, AgentHandle, Orchestrator, Playback, RunOutcome, RunStateSnapshot,
};

/// 从所有者发往运行时的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 单步模式下放行一个任务周期
    Resume,
    Pause,
    Stop,
}

pub struct AgentRuntime {
    pub cmd_tx: mpsc::UnboundedSender<Command>,
    pub state_rx: watch::Receiver<RunStateSnapshot>,
    /// 终止时的结果（完成 / 停止 / 预算耗尽 / 错误）
    pub done_rx: oneshot::Receiver<Result<RunOutcome, AgentError>>,
    pub handle: AgentHandle,
}

async fn apply(handle: &AgentHandle, cmd: Command) {
    match cmd {
        Command::Resume => handle.update_playback_control(Playback::Play).await,
        Command::Pause => handle.update_playback_control(Playback::Pause).await,
        Command::Stop => handle.stop_agent(),
    }
}

/// 在后台运行编排器，直到终止
pub async fn spawn_agent(mut orchestrator: Orchestrator) -> AgentRuntime {
    let handle = orchestrator.handle();
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(orchestrator.snapshot().await);
    let (done_tx, done_rx) = oneshot::channel();

    let control = handle.clone();
    tokio::spawn(async move {
        loop {
            // 运行期间仍处理命令：Stop 在下一个迭代边界生效，Resume 预先放行下一周期
            let result = {
                let run = orchestrator.run();
                tokio::pin!(run);
                loop {
                    tokio::select! {
                        r = &mut run => break r,
                        Some(cmd) = cmd_rx.recv() => apply(&control, cmd).await,
                    }
                }
            };
            let _ = state_tx.send(orchestrator.snapshot().await);

            match result {
                Ok(RunOutcome::Paused) => loop {
                    match cmd_rx.recv().await {
                        Some(Command::Pause) => {}
                        Some(cmd) => {
                            apply(&control, cmd).await;
                            break;
                        }
                        // 所有者已离开
                        None => {
                            control.stop_agent();
                            break;
                        }
                    }
                },
                other => {
                    let _ = done_tx.send(other);
                    break;
                }
            }
        }
    });

    AgentRuntime {
        cmd_tx,
        state_rx,
        done_rx,
        handle,
    }
}
