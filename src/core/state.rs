//! 运行状态：阶段、循环计数、已完成任务，以及供展示层使用的快照

use serde::Serialize;

use crate::core::{Playback, RunMode, Task};

/// Agent 阶段；Paused 仅在单步模式下出现
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Idle,
    Running,
    Paused,
    Completed,
    StoppedManually,
    FailedPlanning,
    FailedLoopLimit,
    /// 分析 / 执行阶段的致命错误
    Aborted,
}

impl AgentPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            AgentPhase::Idle | AgentPhase::Running | AgentPhase::Paused
        )
    }
}

/// 一次 run 调用的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// 单步模式下等待下一次恢复
    Paused,
    Completed,
    StoppedManually,
    LoopLimitReached,
}

/// 编排器内部的运行状态
#[derive(Clone, Debug)]
pub struct RunState {
    /// 只追加
    pub completed_task_values: Vec<String>,
    /// 仅在进入执行分支时递增
    pub loop_count: u32,
    pub loop_budget: u32,
}

impl RunState {
    pub fn new(loop_budget: u32) -> Self {
        Self {
            completed_task_values: Vec::new(),
            loop_count: 0,
            loop_budget,
        }
    }

    pub fn budget_exceeded(&self) -> bool {
        self.loop_count > self.loop_budget
    }
}

/// 状态快照（展示层只读）
#[derive(Clone, Debug, Serialize)]
pub struct RunStateSnapshot {
    pub phase: AgentPhase,
    pub loop_count: u32,
    pub loop_budget: u32,
    pub is_running: bool,
    pub mode: RunMode,
    pub playback: Playback,
    pub completed_task_values: Vec<String>,
    pub tasks: Vec<Task>,
}
