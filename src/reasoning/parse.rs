//! 模型输出解析
//!
//! 从文本中提取 JSON（```json ... ``` 代码块或首尾括号之间的片段）；任务列表解析失败时退回按行提取。

use crate::reasoning::Analysis;

/// 提取 open..close 之间的 JSON 片段
fn json_slice(text: &str, open: char, close: char) -> Option<&str> {
    let trimmed = text.trim();
    let body = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else {
        trimmed
    };
    let start = body.find(open)?;
    let end = body.rfind(close)?;
    (end > start).then(|| &body[start..=end])
}

/// 去掉列表前缀："- "、"* "、"1. "、"2) "；没有前缀时返回 None（"3.5%" 之类不算前缀）
fn strip_list_marker(line: &str) -> Option<&str> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .filter(|r| r.is_empty() || r.starts_with(char::is_whitespace))
        .map(str::trim)
}

/// 解析任务列表；丢弃空项、重复项以及与 `exclude` 中已有任务相同的项
pub fn extract_tasks(output: &str, exclude: &[String]) -> Vec<String> {
    let parsed: Option<Vec<String>> =
        json_slice(output, '[', ']').and_then(|s| serde_json::from_str(s).ok());

    let candidates: Vec<String> = match parsed {
        Some(list) => list,
        None => output
            .lines()
            .filter_map(strip_list_marker)
            .map(str::to_string)
            .collect(),
    };

    let mut tasks: Vec<String> = Vec::new();
    for task in candidates {
        let task = task.trim().to_string();
        if task.is_empty() || exclude.contains(&task) || tasks.contains(&task) {
            continue;
        }
        tasks.push(task);
    }
    tasks
}

/// 解析分析结果；无法解析时返回 Analysis::fallback()
pub fn parse_analysis(output: &str) -> Analysis {
    json_slice(output, '{', '}')
        .and_then(|s| serde_json::from_str::<Analysis>(s).ok())
        .unwrap_or_else(|| {
            tracing::warn!("Failed to parse analysis, falling back to reason");
            Analysis::fallback()
        })
}
