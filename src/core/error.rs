//! Agent 错误类型
//!
//! 规划失败（致命）按配额 / 拒绝访问 / 一般访问错误分类；后续任务生成失败（可恢复）单独包装，
//! 由 RecoveryEngine 决定定稿当前任务还是终止运行。

use serde::Serialize;
use thiserror::Error;

use crate::core::{AgentPhase, TaskStoreError};
use crate::llm::LlmError;

/// 推理后端调用失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReasoningError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Unparseable model output: {0}")]
    Parse(String),

    #[error("Empty model output")]
    Empty,
}

/// 启动阶段（目标拆解）失败的用户可见分类
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningFailure {
    #[error("API quota exceeded")]
    QuotaExceeded,

    #[error("Access denied")]
    AccessDenied,

    #[error("Error accessing the reasoning backend")]
    GenericAccessError,
}

impl PlanningFailure {
    /// 展示给用户的错误文本
    pub fn user_message(self) -> &'static str {
        match self {
            PlanningFailure::QuotaExceeded => {
                "ERROR: Your API key has exceeded its quota. Check your plan and billing details."
            }
            PlanningFailure::AccessDenied => {
                "ERROR: Access to the model was denied. Check that your API key is valid and has access to this model."
            }
            PlanningFailure::GenericAccessError => {
                "ERROR: Failed to reach the reasoning backend. Check your API key and network, then try again."
            }
        }
    }
}

/// 后续任务生成失败（非致命）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to generate follow-up tasks: {0}")]
pub struct ExpansionFailure(pub ReasoningError);

/// 推理调用所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningPhase {
    Decompose,
    Analyze,
    Execute,
    FollowUps,
}

impl std::fmt::Display for ReasoningPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReasoningPhase::Decompose => "decompose",
            ReasoningPhase::Analyze => "analyze",
            ReasoningPhase::Execute => "execute",
            ReasoningPhase::FollowUps => "follow-ups",
        };
        f.write_str(s)
    }
}

/// 逃逸出编排器的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Planning failed: {0}")]
    Planning(PlanningFailure),

    #[error("Reasoning backend failed during {phase}: {source}")]
    Reasoning {
        phase: ReasoningPhase,
        #[source]
        source: ReasoningError,
    },

    #[error(transparent)]
    TaskStore(#[from] TaskStoreError),

    #[error("Agent already terminated ({0:?})")]
    Terminated(AgentPhase),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_distinct() {
        let msgs = [
            PlanningFailure::QuotaExceeded.user_message(),
            PlanningFailure::AccessDenied.user_message(),
            PlanningFailure::GenericAccessError.user_message(),
        ];
        assert_ne!(msgs[0], msgs[1]);
        assert_ne!(msgs[1], msgs[2]);
        assert!(msgs.iter().all(|m| m.starts_with("ERROR")));
    }

    #[test]
    fn test_reasoning_error_display() {
        let err = AgentError::Reasoning {
            phase: ReasoningPhase::Execute,
            source: ReasoningError::Llm(LlmError::Network("reset".into())),
        };
        assert_eq!(
            err.to_string(),
            "Reasoning backend failed during execute: Network error: reset"
        );
    }
}
