//! 错误恢复引擎
//!
//! 根据失败所处阶段返回 RecoveryAction：后续任务生成失败只定稿当前任务，其余阶段终止运行；
//! 启动阶段的失败另外归类为 PlanningFailure，供用户看到可操作的提示。

use crate::core::{PlanningFailure, ReasoningError, ReasoningPhase};
use crate::llm::LlmError;

/// 恢复引擎给出的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 记录非致命错误，将当前任务定稿后继续循环
    FinalizeTask,
    /// 调用 shutdown 并终止运行
    Abort,
}

#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, phase: ReasoningPhase, _err: &ReasoningError) -> RecoveryAction {
        match phase {
            ReasoningPhase::FollowUps => RecoveryAction::FinalizeTask,
            ReasoningPhase::Decompose | ReasoningPhase::Analyze | ReasoningPhase::Execute => {
                RecoveryAction::Abort
            }
        }
    }

    /// 将目标拆解失败映射为用户可见分类
    pub fn classify_planning(&self, err: &ReasoningError) -> PlanningFailure {
        match err {
            ReasoningError::Llm(LlmError::QuotaExceeded | LlmError::RateLimited) => {
                PlanningFailure::QuotaExceeded
            }
            ReasoningError::Llm(LlmError::Unauthorized(_) | LlmError::Forbidden(_)) => {
                PlanningFailure::AccessDenied
            }
            _ => PlanningFailure::GenericAccessError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_up_failure_is_recoverable() {
        let engine = RecoveryEngine::new();
        let action = engine.handle(ReasoningPhase::FollowUps, &ReasoningError::Empty);
        assert_eq!(action, RecoveryAction::FinalizeTask);
    }

    #[test]
    fn test_execution_failure_aborts() {
        let engine = RecoveryEngine::new();
        for phase in [
            ReasoningPhase::Decompose,
            ReasoningPhase::Analyze,
            ReasoningPhase::Execute,
        ] {
            assert_eq!(
                engine.handle(phase, &ReasoningError::Empty),
                RecoveryAction::Abort
            );
        }
    }

    #[test]
    fn test_classify_quota() {
        let engine = RecoveryEngine::new();
        let err = ReasoningError::Llm(LlmError::QuotaExceeded);
        assert_eq!(engine.classify_planning(&err), PlanningFailure::QuotaExceeded);
    }

    #[test]
    fn test_classify_access_denied() {
        let engine = RecoveryEngine::new();
        let err = ReasoningError::Llm(LlmError::Forbidden("region".into()));
        assert_eq!(engine.classify_planning(&err), PlanningFailure::AccessDenied);
        let err = ReasoningError::Llm(LlmError::Unauthorized("bad key".into()));
        assert_eq!(engine.classify_planning(&err), PlanningFailure::AccessDenied);
    }

    #[test]
    fn test_classify_generic() {
        let engine = RecoveryEngine::new();
        assert_eq!(
            engine.classify_planning(&ReasoningError::Llm(LlmError::Timeout(60))),
            PlanningFailure::GenericAccessError
        );
        assert_eq!(
            engine.classify_planning(&ReasoningError::Parse("x".into())),
            PlanningFailure::GenericAccessError
        );
    }
}
