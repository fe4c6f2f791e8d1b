//! 推理后端抽象：目标拆解、任务分析、任务执行、后续任务生成

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::ReasoningError;

/// 分析后决定采取的动作
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisAction {
    #[default]
    Reason,
    Search,
    Code,
    Image,
}

/// 任务分析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub action: AnalysisAction,
    #[serde(default)]
    pub arg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Analysis {
    pub fn reason(arg: impl Into<String>) -> Self {
        Self {
            action: AnalysisAction::Reason,
            arg: arg.into(),
            reasoning: None,
        }
    }

    /// 模型输出无法解析时使用
    pub fn fallback() -> Self {
        Self::reason("Fallback due to parsing failure")
    }
}

/// 生成后续任务时的上下文
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FollowUpContext {
    /// 刚完成的任务
    pub current: String,
    /// 仍处于 Started 的任务（不含 current）
    pub remaining: Vec<String>,
    /// 已完成任务（按完成顺序）
    pub completed: Vec<String>,
}

/// 推理客户端：编排器通过它驱动目标拆解与任务执行
///
/// 同一编排器对它的调用总是串行的。
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// 将目标拆解为初始任务列表
    async fn decompose_goal(&self, goal: &str) -> Result<Vec<String>, ReasoningError>;

    /// 分析任务，决定执行方式
    async fn analyze_task(&self, goal: &str, task: &str) -> Result<Analysis, ReasoningError>;

    /// 执行任务，返回结果文本
    async fn execute_task(
        &self,
        goal: &str,
        task: &str,
        analysis: &Analysis,
    ) -> Result<String, ReasoningError>;

    /// 根据上一任务的结果生成后续任务；返回空列表表示无需继续拆分
    async fn generate_follow_ups(
        &self,
        goal: &str,
        context: &FollowUpContext,
        prior_result: &str,
    ) -> Result<Vec<String>, ReasoningError>;
}
