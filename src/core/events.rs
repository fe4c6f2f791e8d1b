//! 进度消息：编排器发往展示层的事件
//!
//! AgentMessage 是封闭的标签枚举，可序列化为 JSON 供前端展示；EventSink 只负责按发出顺序投递，无需确认。

use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::{Task, TaskId, TaskStatus};
use crate::reasoning::Analysis;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentMessage {
    /// 本次运行的目标
    Goal { value: String },
    /// 正在调用推理后端
    Thinking { value: String },
    /// 任务入队或状态迁移；previous 为 None 表示新入队
    Task {
        task: Task,
        previous: Option<TaskStatus>,
    },
    /// 任务分析结果
    Analysis {
        task_id: TaskId,
        task: String,
        analysis: Analysis,
    },
    /// 错误；fatal 为 false 时循环继续
    Error { value: String, fatal: bool },
    /// 所有任务完成
    Completed { value: String },
    /// 达到循环预算
    LoopLimit { loop_budget: u32, value: String },
    /// 用户手动停止
    ManualShutdown { value: String },
}

impl AgentMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentMessage::Goal { .. } => "goal",
            AgentMessage::Thinking { .. } => "thinking",
            AgentMessage::Task { .. } => "task",
            AgentMessage::Analysis { .. } => "analysis",
            AgentMessage::Error { .. } => "error",
            AgentMessage::Completed { .. } => "completed",
            AgentMessage::LoopLimit { .. } => "loop-limit",
            AgentMessage::ManualShutdown { .. } => "manual-shutdown",
        }
    }

    /// 单行展示文本
    pub fn display_text(&self) -> String {
        match self {
            AgentMessage::Goal { value } => format!("Embarking on a new goal: {}", value),
            AgentMessage::Thinking { value } => value.clone(),
            AgentMessage::Task { task, previous } => match (previous, task.status) {
                (None, _) => format!("Added task: {}", task.value),
                (_, TaskStatus::Executing) => format!("Executing: {}", task.value),
                (_, TaskStatus::Completed) => format!(
                    "Completed: {}\n{}",
                    task.value,
                    task.info.as_deref().unwrap_or_default()
                ),
                (_, TaskStatus::Final) => format!("Finalized: {}", task.value),
                (_, TaskStatus::Started) => format!("Task: {}", task.value),
            },
            AgentMessage::Analysis { task, analysis, .. } => {
                format!("Analysis for '{}': {:?} {}", task, analysis.action, analysis.arg)
            }
            AgentMessage::Error { value, .. } => value.clone(),
            AgentMessage::Completed { value } => value.clone(),
            AgentMessage::LoopLimit { value, .. } => value.clone(),
            AgentMessage::ManualShutdown { value } => value.clone(),
        }
    }
}

/// 消息接收端（展示层实现）
pub trait EventSink: Send + Sync {
    fn emit(&self, message: AgentMessage);
}

impl EventSink for mpsc::UnboundedSender<AgentMessage> {
    fn emit(&self, message: AgentMessage) {
        // 接收端已关闭时丢弃
        let _ = self.send(message);
    }
}

/// 仅写日志的接收端
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, message: AgentMessage) {
        tracing::info!(kind = message.kind(), "{}", message.display_text());
    }
}
