//! DeepSeek 后端：走 OpenAI 兼容端点，复用 OpenAiClient

use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 模型名：[llm.deepseek].model > DEEPSEEK_MODEL > [llm].model > deepseek-chat
pub fn resolve_deepseek_model(
    section_model: Option<&str>,
    env_model: Option<String>,
    fallback_model: &str,
) -> String {
    section_model
        .map(str::to_string)
        .or(env_model)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if fallback_model.trim().is_empty() {
                DEEPSEEK_CHAT.to_string()
            } else {
                fallback_model.to_string()
            }
        })
}

/// DEEPSEEK_API_KEY 优先，其次 OPENAI_API_KEY（同一把 Key 走兼容端点）
fn deepseek_api_key() -> Option<String> {
    std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
}

/// 创建 DeepSeek 客户端；没有可用 Key 时返回 None
pub fn create_deepseek_client(model: &str, base_url: Option<&str>) -> Option<OpenAiClient> {
    let api_key = deepseek_api_key()?;
    let base_url = base_url.unwrap_or(DEEPSEEK_BASE_URL);
    Some(OpenAiClient::new(Some(base_url), model, Some(&api_key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_model_wins() {
        let model = resolve_deepseek_model(
            Some("deepseek-reasoner"),
            Some("from-env".to_string()),
            "deepseek-chat",
        );
        assert_eq!(model, "deepseek-reasoner");
    }

    #[test]
    fn test_env_model_before_llm_model() {
        let model = resolve_deepseek_model(None, Some("from-env".to_string()), "deepseek-chat");
        assert_eq!(model, "from-env");
    }

    #[test]
    fn test_falls_back_to_chat_model() {
        assert_eq!(resolve_deepseek_model(None, None, "custom"), "custom");
        assert_eq!(resolve_deepseek_model(Some(" "), None, ""), DEEPSEEK_CHAT);
    }
}
