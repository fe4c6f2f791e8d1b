//! 推理层：ReasoningClient 抽象、基于 LLM 的实现、Mock 实现与输出解析

pub mod llm;
pub mod mock;
pub mod parse;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use llm::{LlmReasoningClient, Prompts};
pub use mock::MockReasoningClient;
pub use parse::{extract_tasks, parse_analysis};
pub use traits::{Analysis, AnalysisAction, FollowUpContext, ReasoningClient};

use crate::config::AppConfig;
use crate::llm::create_llm_from_config;

/// 根据配置构建推理后端；没有可用的 LLM 时退回 Mock
pub fn create_reasoning_from_config(cfg: &AppConfig) -> Arc<dyn ReasoningClient> {
    match create_llm_from_config(cfg) {
        Some(llm) => Arc::new(
            LlmReasoningClient::new(
                llm,
                cfg.agent.language.clone(),
                Duration::from_secs(cfg.llm.timeouts.request),
            )
            .with_prompts(Prompts::load()),
        ),
        None => Arc::new(MockReasoningClient),
    }
}
