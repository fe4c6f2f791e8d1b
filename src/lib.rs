//! AutoBee - 自主任务编排智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 任务存储、播放控制、进度消息、错误与恢复、关闭信号、编排循环与运行时
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek）
//! - **observability**: 日志初始化
//! - **reasoning**: 推理后端抽象（目标拆解 / 分析 / 执行 / 后续任务）及 LLM、Mock 实现

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod reasoning;

pub use crate::core::{Orchestrator, OrchestratorConfig, RunOutcome};
