//! 基于 LLM 的推理后端
//!
//! 每个操作对应一段提示词模板（可由 config/prompts/<name>.txt 覆盖），模型输出经 parse 模块解析。
//! 每次调用都套一层请求超时；编排器本身不做超时控制。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::ReasoningError;
use crate::llm::{LlmClient, LlmError, Message};
use crate::reasoning::{extract_tasks, parse_analysis, Analysis, FollowUpContext, ReasoningClient};

const SYSTEM_PROMPT: &str = "You are AutoBee, an autonomous agent that breaks goals into tasks and completes them one by one.";

const START_GOAL_PROMPT: &str = "You are a task creation AI called AutoBee. You answer in the \"{language}\" language. \
Your objective is: \"{goal}\". \
Create a list of zero to three tasks to be completed by your AI system such that your goal is more closely reached or completely reached. \
Return the response as a JSON array of strings that can be used in JSON.parse().";

const ANALYZE_PROMPT: &str = "High level objective: \"{goal}\"\nCurrent task: \"{task}\"\n\
Based on this information, choose the best action to take: \"reason\" to answer from your own knowledge, \
\"search\" to look something up, \"code\" to write code, or \"image\" to create an image. \
Respond only with a JSON object of the form {\"action\": \"reason\", \"arg\": \"...\", \"reasoning\": \"...\"}.";

const EXECUTE_PROMPT: &str = "Answer in the \"{language}\" language. Given the following overall objective `{goal}` and the following sub-task, `{task}`.\n\
The chosen approach is `{action}` with argument `{arg}`.\n\
Perform the task by understanding the problem, extracting variables, and being smart and efficient. \
Write a detailed response that addresses the task.";

const CREATE_TASKS_PROMPT: &str = "You are an AI task creation agent. You must answer in the \"{language}\" language. \
You have the following objective `{goal}`.\n\
You have the following incomplete tasks `{remaining}` and have just executed the following task `{task}` and received the following result `{result}`.\n\
You have already completed: `{completed}`.\n\
Based on this, create a single new task to be completed by your AI system ONLY IF NEEDED such that your goal is more closely reached or completely reached. \
Return the response as a JSON array of strings; return [] if no new task is needed.";

/// 提示词模板集合
#[derive(Debug, Clone)]
pub struct Prompts {
    pub system: String,
    pub start_goal: String,
    pub analyze: String,
    pub execute: String,
    pub create_tasks: String,
}

/// 依次尝试 config/prompts/<name>.txt 与 ../config/prompts/<name>.txt，找不到用内置模板
fn load_prompt(name: &str, fallback: &str) -> String {
    [
        format!("config/prompts/{}.txt", name),
        format!("../config/prompts/{}.txt", name),
    ]
    .into_iter()
    .find_map(|p| std::fs::read_to_string(p).ok())
    .unwrap_or_else(|| fallback.to_string())
}

impl Prompts {
    pub fn load() -> Self {
        Self {
            system: load_prompt("system", SYSTEM_PROMPT),
            start_goal: load_prompt("start_goal", START_GOAL_PROMPT),
            analyze: load_prompt("analyze", ANALYZE_PROMPT),
            execute: load_prompt("execute", EXECUTE_PROMPT),
            create_tasks: load_prompt("create_tasks", CREATE_TASKS_PROMPT),
        }
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            start_goal: START_GOAL_PROMPT.to_string(),
            analyze: ANALYZE_PROMPT.to_string(),
            execute: EXECUTE_PROMPT.to_string(),
            create_tasks: CREATE_TASKS_PROMPT.to_string(),
        }
    }
}

fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

pub struct LlmReasoningClient {
    llm: Arc<dyn LlmClient>,
    prompts: Prompts,
    language: String,
    request_timeout: Duration,
}

impl LlmReasoningClient {
    pub fn new(llm: Arc<dyn LlmClient>, language: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            llm,
            prompts: Prompts::default(),
            language: language.into(),
            request_timeout,
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    async fn ask(&self, prompt: String) -> Result<String, ReasoningError> {
        let messages = [Message::system(self.prompts.system.clone()), Message::user(prompt)];
        let output = tokio::time::timeout(self.request_timeout, self.llm.complete(&messages))
            .await
            .map_err(|_| LlmError::Timeout(self.request_timeout.as_secs()))??;
        let (prompt_tokens, completion_tokens, _) = self.llm.token_usage();
        tracing::debug!(prompt_tokens, completion_tokens, "LLM call finished");
        Ok(output)
    }
}

#[async_trait]
impl ReasoningClient for LlmReasoningClient {
    async fn decompose_goal(&self, goal: &str) -> Result<Vec<String>, ReasoningError> {
        let prompt = render(
            &self.prompts.start_goal,
            &[("goal", goal), ("language", &self.language)],
        );
        let output = self.ask(prompt).await?;
        Ok(extract_tasks(&output, &[]))
    }

    async fn analyze_task(&self, goal: &str, task: &str) -> Result<Analysis, ReasoningError> {
        let prompt = render(&self.prompts.analyze, &[("goal", goal), ("task", task)]);
        let output = self.ask(prompt).await?;
        Ok(parse_analysis(&output))
    }

    async fn execute_task(
        &self,
        goal: &str,
        task: &str,
        analysis: &Analysis,
    ) -> Result<String, ReasoningError> {
        let action = serde_json::to_value(analysis.action)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "reason".to_string());
        let prompt = render(
            &self.prompts.execute,
            &[
                ("goal", goal),
                ("task", task),
                ("action", &action),
                ("arg", &analysis.arg),
                ("language", &self.language),
            ],
        );
        let output = self.ask(prompt).await?;
        let output = output.trim();
        if output.is_empty() {
            return Err(ReasoningError::Empty);
        }
        Ok(output.to_string())
    }

    async fn generate_follow_ups(
        &self,
        goal: &str,
        context: &FollowUpContext,
        prior_result: &str,
    ) -> Result<Vec<String>, ReasoningError> {
        let remaining = serde_json::to_string(&context.remaining)
            .map_err(|e| ReasoningError::Parse(e.to_string()))?;
        let completed = serde_json::to_string(&context.completed)
            .map_err(|e| ReasoningError::Parse(e.to_string()))?;
        let prompt = render(
            &self.prompts.create_tasks,
            &[
                ("goal", goal),
                ("task", &context.current),
                ("result", prior_result),
                ("remaining", &remaining),
                ("completed", &completed),
                ("language", &self.language),
            ],
        );
        let output = self.ask(prompt).await?;

        let mut exclude = context.completed.clone();
        exclude.push(context.current.clone());
        exclude.extend(context.remaining.iter().cloned());
        Ok(extract_tasks(&output, &exclude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 按顺序返回预设回复，并记录收到的提示词
    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(last);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    struct HangingLlm;

    #[async_trait]
    impl LlmClient for HangingLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
            std::future::pending().await
        }
    }

    fn client(llm: Arc<dyn LlmClient>) -> LlmReasoningClient {
        LlmReasoningClient::new(llm, "English", Duration::from_secs(5))
    }

    #[test]
    fn test_render_replaces_all_placeholders() {
        let out = render("{goal} / {goal} / {task}", &[("goal", "g"), ("task", "t")]);
        assert_eq!(out, "g / g / t");
    }

    #[tokio::test]
    async fn test_decompose_goal_parses_array() {
        let llm = ScriptedLlm::new(vec![Ok(r#"["Book flights", "Book hotel"]"#.to_string())]);
        let tasks = client(llm.clone()).decompose_goal("Plan a trip to Paris").await.unwrap();
        assert_eq!(tasks, vec!["Book flights", "Book hotel"]);
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Plan a trip to Paris"));
        assert!(prompts[0].contains("English"));
    }

    #[tokio::test]
    async fn test_decompose_propagates_llm_error() {
        let llm = ScriptedLlm::new(vec![Err(LlmError::QuotaExceeded)]);
        let err = client(llm).decompose_goal("x").await.unwrap_err();
        assert_eq!(err, ReasoningError::Llm(LlmError::QuotaExceeded));
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_garbage() {
        let llm = ScriptedLlm::new(vec![Ok("I think we should just reason.".to_string())]);
        let analysis = client(llm).analyze_task("g", "t").await.unwrap();
        assert_eq!(analysis, Analysis::fallback());
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_output() {
        let llm = ScriptedLlm::new(vec![Ok("   ".to_string())]);
        let err = client(llm)
            .execute_task("g", "t", &Analysis::reason("t"))
            .await
            .unwrap_err();
        assert_eq!(err, ReasoningError::Empty);
    }

    #[tokio::test]
    async fn test_follow_ups_exclude_known_tasks() {
        let llm = ScriptedLlm::new(vec![Ok(
            r#"["Book hotel", "Compare airlines", "Book flights"]"#.to_string(),
        )]);
        let context = FollowUpContext {
            current: "Book flights".into(),
            remaining: vec!["Book hotel".into()],
            completed: vec!["Book flights".into()],
        };
        let tasks = client(llm.clone())
            .generate_follow_ups("Plan a trip", &context, "Flights booked")
            .await
            .unwrap();
        assert_eq!(tasks, vec!["Compare airlines"]);
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Flights booked"));
        assert!(prompts[0].contains(r#"["Book hotel"]"#));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let client = LlmReasoningClient::new(Arc::new(HangingLlm), "English", Duration::from_millis(20));
        let err = client.decompose_goal("g").await.unwrap_err();
        assert_eq!(err, ReasoningError::Llm(LlmError::Timeout(0)));
    }
}
