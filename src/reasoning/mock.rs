//! Mock 推理后端（无需 API Key）
//!
//! 把目标拆成固定的三步，执行结果回显任务名，且不生成后续任务，便于本地跑通完整循环。

use async_trait::async_trait;

use crate::core::ReasoningError;
use crate::reasoning::{Analysis, FollowUpContext, ReasoningClient};

#[derive(Debug, Default)]
pub struct MockReasoningClient;

#[async_trait]
impl ReasoningClient for MockReasoningClient {
    async fn decompose_goal(&self, goal: &str) -> Result<Vec<String>, ReasoningError> {
        Ok(vec![
            format!("Research: {}", goal),
            format!("Draft a plan for: {}", goal),
            format!("Summarize the outcome of: {}", goal),
        ])
    }

    async fn analyze_task(&self, _goal: &str, task: &str) -> Result<Analysis, ReasoningError> {
        Ok(Analysis::reason(task))
    }

    async fn execute_task(
        &self,
        _goal: &str,
        task: &str,
        _analysis: &Analysis,
    ) -> Result<String, ReasoningError> {
        Ok(format!("Mock result for '{}'", task))
    }

    async fn generate_follow_ups(
        &self,
        _goal: &str,
        _context: &FollowUpContext,
        _prior_result: &str,
    ) -> Result<Vec<String>, ReasoningError> {
        Ok(Vec::new())
    }
}
