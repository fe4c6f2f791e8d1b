//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek）

pub mod deepseek;
pub mod message;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use deepseek::{
    create_deepseek_client, resolve_deepseek_model, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT,
};
pub use message::{Message, Role};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

use crate::config::AppConfig;

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容）；返回 None 表示使用 Mock 推理后端
pub fn create_llm_from_config(cfg: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Provider set to mock");
        return None;
    }
    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        let model = resolve_deepseek_model(
            cfg.llm.deepseek.model.as_deref(),
            std::env::var("DEEPSEEK_MODEL").ok(),
            &cfg.llm.model,
        );
        let client = create_deepseek_client(&model, cfg.llm.base_url.as_deref())?;
        tracing::info!("Using DeepSeek LLM ({})", model);
        Some(Arc::new(client))
    } else if use_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let base = cfg.llm.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", model);
        Some(Arc::new(OpenAiClient::new(
            base,
            &model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        )))
    } else {
        tracing::warn!("No API key set or provider unknown, using mock reasoning backend");
        None
    }
}
