//! Agent 编排器：目标拆解 + 任务循环
//!
//! 启动阶段：拆解目标 -> 逐个入队（Started）。
//! 循环阶段每轮：停止检查 -> 暂停检查 -> 无待执行任务则完成 -> 递增 loop_count 并检查预算 ->
//! 分析 -> 执行 -> 生成后续任务（失败只定稿当前任务）。
//! 循环是显式迭代，调用栈深度与循环次数无关。

use std::sync::Arc;
use std::time::Duration;

use crate::config::DEFAULT_LOOP_BUDGET;
use crate::core::{
    AgentError, AgentHandle, AgentMessage, AgentPhase, EventSink, ExpansionFailure, Playback,
    ReasoningError, ReasoningPhase, RecoveryAction, RecoveryEngine, RunMode, RunOutcome,
    RunState, RunStateSnapshot, ShutdownManager, ShutdownReason, Task, TaskId, TaskStatus,
    TaskStore,
};
use crate::reasoning::{FollowUpContext, ReasoningClient};

/// 节奏延迟，让事件流可按顺序消费
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// 批量入队任务之间
    pub short: Duration,
    /// 单个任务周期内阶段切换之间
    pub long: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            short: Duration::ZERO,
            long: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            short: Duration::from_millis(800),
            long: Duration::from_millis(1000),
        }
    }
}

/// 构造时确定，运行中不再变化
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub loop_budget: u32,
    pub mode: RunMode,
    pub pacing: Pacing,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            loop_budget: DEFAULT_LOOP_BUDGET,
            mode: RunMode::Automatic,
            pacing: Pacing::default(),
        }
    }
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub struct Orchestrator {
    goal: String,
    reasoning: Arc<dyn ReasoningClient>,
    sink: Arc<dyn EventSink>,
    recovery: RecoveryEngine,
    pacing: Pacing,
    tasks: TaskStore,
    state: RunState,
    phase: AgentPhase,
    handle: AgentHandle,
}

impl Orchestrator {
    pub fn new(
        goal: impl Into<String>,
        reasoning: Arc<dyn ReasoningClient>,
        sink: Arc<dyn EventSink>,
        config: OrchestratorConfig,
    ) -> Self {
        let handle = AgentHandle::new(config.mode, sink.clone(), ShutdownManager::new());
        Self {
            goal: goal.into(),
            reasoning,
            sink,
            recovery: RecoveryEngine::new(),
            pacing: config.pacing,
            tasks: TaskStore::new(),
            state: RunState::new(config.loop_budget),
            phase: AgentPhase::Idle,
            handle,
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn run_state(&self) -> &RunState {
        &self.state
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// 可克隆的控制句柄（停止 / 播放控制），供其他任务使用
    pub fn handle(&self) -> AgentHandle {
        self.handle.clone()
    }

    pub fn shutdown_manager(&self) -> &ShutdownManager {
        self.handle.shutdown_manager()
    }

    pub fn stop_agent(&self) {
        self.handle.stop_agent();
    }

    pub async fn update_playback_control(&self, value: Playback) {
        self.handle.update_playback_control(value).await;
    }

    pub async fn snapshot(&self) -> RunStateSnapshot {
        RunStateSnapshot {
            phase: self.phase,
            loop_count: self.state.loop_count,
            loop_budget: self.state.loop_budget,
            is_running: self.handle.is_running(),
            mode: self.handle.mode(),
            playback: self.handle.playback().await,
            completed_task_values: self.state.completed_task_values.clone(),
            tasks: self.tasks.tasks().to_vec(),
        }
    }

    /// 运行 Agent：首次调用执行启动阶段，之后的调用从循环处继续。
    ///
    /// 单步模式下返回 `RunOutcome::Paused` 表示等待下一次恢复；终止后再次调用只返回终止结果。
    pub async fn run(&mut self) -> Result<RunOutcome, AgentError> {
        match self.phase {
            AgentPhase::Completed => return Ok(RunOutcome::Completed),
            AgentPhase::StoppedManually => return Ok(RunOutcome::StoppedManually),
            AgentPhase::FailedLoopLimit => return Ok(RunOutcome::LoopLimitReached),
            AgentPhase::FailedPlanning | AgentPhase::Aborted => {
                return Err(AgentError::Terminated(self.phase))
            }
            AgentPhase::Idle => {
                if self.handle.is_stop_requested() {
                    self.phase = AgentPhase::StoppedManually;
                    return Ok(RunOutcome::StoppedManually);
                }
                self.start().await?;
            }
            AgentPhase::Running | AgentPhase::Paused => {}
        }
        self.run_loop().await
    }

    async fn start(&mut self) -> Result<(), AgentError> {
        self.phase = AgentPhase::Running;
        self.handle.set_running(true);
        tracing::info!(goal = %self.goal, "Starting agent");

        self.sink.emit(AgentMessage::Goal {
            value: self.goal.clone(),
        });
        self.sink.emit(AgentMessage::Thinking {
            value: "Thinking...".to_string(),
        });

        let decomposed = self.reasoning.decompose_goal(&self.goal).await;
        let initial = match decomposed {
            Ok(tasks) => tasks,
            Err(e) => {
                let failure = self.recovery.classify_planning(&e);
                tracing::error!(error = %e, ?failure, "Goal decomposition failed");
                self.sink.emit(AgentMessage::Error {
                    value: failure.user_message().to_string(),
                    fatal: true,
                });
                self.phase = AgentPhase::FailedPlanning;
                self.handle.set_running(false);
                self.shutdown_manager()
                    .shutdown(ShutdownReason::PlanningFailed(failure));
                return Err(AgentError::Planning(failure));
            }
        };

        tracing::info!(count = initial.len(), "Goal decomposed");
        for value in initial {
            pace(self.pacing.short).await;
            self.enqueue(value)?;
        }
        Ok(())
    }

    async fn run_loop(&mut self) -> Result<RunOutcome, AgentError> {
        loop {
            if self.handle.is_stop_requested() {
                self.phase = AgentPhase::StoppedManually;
                self.handle.set_running(false);
                return Ok(RunOutcome::StoppedManually);
            }

            if self.handle.should_suspend().await {
                tracing::debug!(loop_count = self.state.loop_count, "Paused, waiting for resume");
                self.phase = AgentPhase::Paused;
                self.handle.set_running(false);
                return Ok(RunOutcome::Paused);
            }
            self.phase = AgentPhase::Running;
            self.handle.set_running(true);

            let Some(task) = self.tasks.next_started().cloned() else {
                tracing::info!(
                    completed = self.state.completed_task_values.len(),
                    "All tasks completed"
                );
                self.sink.emit(AgentMessage::Completed {
                    value: "All tasks completed. Shutting down.".to_string(),
                });
                self.finish(AgentPhase::Completed, ShutdownReason::Completed);
                return Ok(RunOutcome::Completed);
            };

            self.state.loop_count += 1;
            if self.state.budget_exceeded() {
                tracing::info!(loop_budget = self.state.loop_budget, "Loop budget exhausted");
                self.sink.emit(AgentMessage::LoopLimit {
                    loop_budget: self.state.loop_budget,
                    value: format!(
                        "This agent has run for the maximum number of loops ({}). \
                         To save your wallet, this agent is shutting down.",
                        self.state.loop_budget
                    ),
                });
                self.finish(AgentPhase::FailedLoopLimit, ShutdownReason::LoopLimit);
                return Ok(RunOutcome::LoopLimitReached);
            }

            self.run_cycle(task).await?;
        }
    }

    /// 单个任务周期：执行 -> 分析 -> 完成 -> 生成后续任务
    async fn run_cycle(&mut self, task: Task) -> Result<(), AgentError> {
        pace(self.pacing.long).await;
        tracing::debug!(task = %task.value, loop_count = self.state.loop_count, "Executing task");
        self.transition(&task.id, TaskStatus::Executing, None)?;
        self.sink.emit(AgentMessage::Thinking {
            value: format!("Analyzing task: {}", task.value),
        });

        let analyzed = self.reasoning.analyze_task(&self.goal, &task.value).await;
        let analysis = match analyzed {
            Ok(a) => a,
            Err(e) => return self.recover(ReasoningPhase::Analyze, &task, e),
        };
        self.sink.emit(AgentMessage::Analysis {
            task_id: task.id.clone(),
            task: task.value.clone(),
            analysis: analysis.clone(),
        });

        let executed = self
            .reasoning
            .execute_task(&self.goal, &task.value, &analysis)
            .await;
        let result = match executed {
            Ok(r) => r,
            Err(e) => return self.recover(ReasoningPhase::Execute, &task, e),
        };
        self.transition(&task.id, TaskStatus::Completed, Some(result.clone()))?;
        self.state.completed_task_values.push(task.value.clone());

        pace(self.pacing.long).await;
        self.sink.emit(AgentMessage::Thinking {
            value: "Generating follow-up tasks...".to_string(),
        });
        let context = FollowUpContext {
            current: task.value.clone(),
            remaining: self
                .tasks
                .remaining_tasks()
                .into_iter()
                .map(|t| t.value.clone())
                .collect(),
            completed: self.state.completed_task_values.clone(),
        };

        let expansion = self
            .reasoning
            .generate_follow_ups(&self.goal, &context, &result)
            .await;
        match expansion {
            Ok(follow_ups) if follow_ups.is_empty() => {
                self.transition(&task.id, TaskStatus::Final, None)?;
            }
            Ok(follow_ups) => {
                tracing::debug!(count = follow_ups.len(), "Follow-up tasks generated");
                for value in follow_ups {
                    pace(self.pacing.short).await;
                    self.enqueue(value)?;
                }
            }
            Err(e) => return self.recover(ReasoningPhase::FollowUps, &task, e),
        }
        Ok(())
    }

    /// 按 RecoveryEngine 的决定处理周期内的推理失败：定稿当前任务并继续，或终止运行
    fn recover(
        &mut self,
        phase: ReasoningPhase,
        task: &Task,
        err: ReasoningError,
    ) -> Result<(), AgentError> {
        match self.recovery.handle(phase, &err) {
            RecoveryAction::FinalizeTask => {
                let value = match phase {
                    ReasoningPhase::FollowUps => ExpansionFailure(err).to_string(),
                    _ => AgentError::Reasoning { phase, source: err }.to_string(),
                };
                tracing::warn!(task = %task.value, %phase, error = %value, "Recoverable reasoning failure");
                self.sink.emit(AgentMessage::Error {
                    value,
                    fatal: false,
                });
                self.transition(&task.id, TaskStatus::Final, None)
            }
            RecoveryAction::Abort => Err(self.abort(phase, err)),
        }
    }

    fn enqueue(&mut self, value: String) -> Result<(), AgentError> {
        let task = Task::new(value);
        self.tasks.append(task.clone())?;
        self.sink.emit(AgentMessage::Task {
            task,
            previous: None,
        });
        Ok(())
    }

    fn transition(
        &mut self,
        id: &TaskId,
        status: TaskStatus,
        info: Option<String>,
    ) -> Result<(), AgentError> {
        let previous = self.tasks.update_status(id, status, info)?;
        if let Some(task) = self.tasks.get(id) {
            self.sink.emit(AgentMessage::Task {
                task: task.clone(),
                previous: Some(previous),
            });
        }
        Ok(())
    }

    fn finish(&mut self, phase: AgentPhase, reason: ShutdownReason) {
        self.phase = phase;
        self.handle.set_running(false);
        self.shutdown_manager().shutdown(reason);
    }

    /// 致命错误：发出一条错误消息、触发 shutdown，并把错误交还所有者
    fn abort(&mut self, phase: ReasoningPhase, err: ReasoningError) -> AgentError {
        tracing::error!(%phase, error = %err, "Reasoning backend failed, aborting");
        let err = AgentError::Reasoning { phase, source: err };
        self.sink.emit(AgentMessage::Error {
            value: err.to_string(),
            fatal: true,
        });
        self.finish(AgentPhase::Aborted, ShutdownReason::FatalError(err.to_string()));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::MockReasoningClient;
    use tokio::sync::mpsc;

    fn orchestrator(
        config: OrchestratorConfig,
    ) -> (Orchestrator, mpsc::UnboundedReceiver<AgentMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let orch = Orchestrator::new(
            "Write a haiku",
            Arc::new(MockReasoningClient),
            Arc::new(tx),
            config,
        );
        (orch, rx)
    }

    fn fast(mode: RunMode, loop_budget: u32) -> OrchestratorConfig {
        OrchestratorConfig {
            loop_budget,
            mode,
            pacing: Pacing::none(),
        }
    }

    #[test]
    fn test_default_config() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.loop_budget, DEFAULT_LOOP_BUDGET);
        assert_eq!(cfg.pacing.short, Duration::from_millis(800));
        assert_eq!(cfg.pacing.long, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_mock_run_completes() {
        let (mut orch, mut rx) = orchestrator(fast(RunMode::Automatic, 10));
        let outcome = orch.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(orch.phase(), AgentPhase::Completed);
        assert!(!orch.is_running());
        assert_eq!(orch.run_state().loop_count, 3);
        assert!(orch
            .tasks()
            .tasks()
            .iter()
            .all(|t| t.status == TaskStatus::Final));

        let first = rx.try_recv().unwrap();
        assert_eq!(first, AgentMessage::Goal { value: "Write a haiku".into() });
        assert!(orch.shutdown_manager().is_shutdown());
    }

    #[tokio::test]
    async fn test_run_after_completion_has_no_side_effects() {
        let (mut orch, mut rx) = orchestrator(fast(RunMode::Automatic, 10));
        orch.run().await.unwrap();
        while rx.try_recv().is_ok() {}

        assert_eq!(orch.run().await.unwrap(), RunOutcome::Completed);
        assert!(rx.try_recv().is_err());
        assert_eq!(orch.run_state().loop_count, 3);
    }

    #[tokio::test]
    async fn test_stop_before_start_skips_decomposition() {
        let (mut orch, mut rx) = orchestrator(fast(RunMode::Automatic, 10));
        orch.stop_agent();
        assert_eq!(orch.run().await.unwrap(), RunOutcome::StoppedManually);
        assert!(orch.tasks().is_empty());
        assert_eq!(rx.try_recv().unwrap().kind(), "manual-shutdown");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_snapshot_reflects_state() {
        let (mut orch, _rx) = orchestrator(fast(RunMode::StepPaused, 10));
        assert_eq!(orch.run().await.unwrap(), RunOutcome::Paused);
        let snap = orch.snapshot().await;
        assert_eq!(snap.phase, AgentPhase::Paused);
        assert_eq!(snap.mode, RunMode::StepPaused);
        assert_eq!(snap.playback, Playback::Pause);
        assert_eq!(snap.loop_count, 0);
        assert_eq!(snap.tasks.len(), 3);
        assert!(!snap.is_running);
    }
}
