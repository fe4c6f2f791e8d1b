//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AUTOBEE__*` 覆盖（双下划线表示嵌套，如 `AUTOBEE__AGENT__LOOP_BUDGET=10`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::{OrchestratorConfig, Pacing, RunMode};

/// 免费额度下的默认循环预算
pub const DEFAULT_LOOP_BUDGET: u32 = 25;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub llm: LlmSection,
}

/// [agent] 段：循环预算、运行模式、节奏延迟、输出语言
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_loop_budget")]
    pub loop_budget: u32,
    #[serde(default)]
    pub mode: RunMode,
    /// 批量入队任务之间的短延迟（毫秒）
    #[serde(default = "default_short_pacing_ms")]
    pub short_pacing_ms: u64,
    /// 单个任务周期内阶段切换之间的长延迟（毫秒）
    #[serde(default = "default_long_pacing_ms")]
    pub long_pacing_ms: u64,
    /// 提示词要求的输出语言
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_loop_budget() -> u32 {
    DEFAULT_LOOP_BUDGET
}

fn default_short_pacing_ms() -> u64 {
    800
}

fn default_long_pacing_ms() -> u64 {
    1000
}

fn default_language() -> String {
    "English".to_string()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            loop_budget: default_loop_budget(),
            mode: RunMode::default(),
            short_pacing_ms: default_short_pacing_ms(),
            long_pacing_ms: default_long_pacing_ms(),
            language: default_language(),
        }
    }
}

impl From<&AgentSection> for OrchestratorConfig {
    fn from(section: &AgentSection) -> Self {
        OrchestratorConfig {
            loop_budget: section.loop_budget,
            mode: section.mode,
            pacing: Pacing {
                short: Duration::from_millis(section.short_pacing_ms),
                long: Duration::from_millis(section.long_pacing_ms),
            },
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次 LLM 请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 AUTOBEE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AUTOBEE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AUTOBEE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.loop_budget, DEFAULT_LOOP_BUDGET);
        assert_eq!(cfg.agent.mode, RunMode::Automatic);
        assert_eq!(cfg.agent.short_pacing_ms, 800);
        assert_eq!(cfg.agent.long_pacing_ms, 1000);
        assert_eq!(cfg.llm.provider, "deepseek");
        assert_eq!(cfg.llm.timeouts.request, 60);
    }

    #[test]
    fn test_agent_section_into_orchestrator_config() {
        let section = AgentSection {
            loop_budget: 7,
            mode: RunMode::StepPaused,
            short_pacing_ms: 10,
            long_pacing_ms: 20,
            language: "English".to_string(),
        };
        let cfg = OrchestratorConfig::from(&section);
        assert_eq!(cfg.loop_budget, 7);
        assert_eq!(cfg.mode, RunMode::StepPaused);
        assert_eq!(cfg.pacing.short, Duration::from_millis(10));
        assert_eq!(cfg.pacing.long, Duration::from_millis(20));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[agent]\nloop_budget = 3\nmode = \"step_paused\"\n\n[llm]\nprovider = \"mock\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.agent.loop_budget, 3);
        assert_eq!(cfg.agent.mode, RunMode::StepPaused);
        assert_eq!(cfg.agent.long_pacing_ms, 1000);
        assert_eq!(cfg.llm.provider, "mock");
    }
}
