//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek）实现 LlmClient：complete 返回整段回复。
//! 错误按「配额 / 鉴权 / 超时 / 网络」分类，供上层把规划失败映射为用户可读的错误类型。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// LLM 调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Rate limited")]
    RateLimited,

    #[error("API quota exceeded")]
    QuotaExceeded,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),
}

impl LlmError {
    /// 根据 API 返回的错误类型 / 错误码 / 文本归类
    pub fn classify(kind: &str, message: &str) -> Self {
        let haystack = format!("{} {}", kind, message).to_lowercase();
        if haystack.contains("insufficient_quota") || haystack.contains("quota") {
            Self::QuotaExceeded
        } else if haystack.contains("rate_limit") || haystack.contains("429") {
            Self::RateLimited
        } else if haystack.contains("invalid_api_key")
            || haystack.contains("unauthorized")
            || haystack.contains("401")
        {
            Self::Unauthorized(message.to_string())
        } else if haystack.contains("forbidden")
            || haystack.contains("unsupported_country")
            || haystack.contains("403")
        {
            Self::Forbidden(message.to_string())
        } else {
            Self::Api(message.to_string())
        }
    }
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
