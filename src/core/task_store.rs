//! 任务存储：按入队顺序保存任务及其状态
//!
//! 只追加、不删除；状态单调前进（started → executing → completed / final，completed 可追溯改为 final）。
//! 同一时刻最多一个任务处于 executing。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 任务 ID
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        Self(format!("task_{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 已入队，等待执行
    Started,
    /// 正在执行
    Executing,
    /// 已完成（仍可能因没有后续任务被改为 Final）
    Completed,
    /// 已完成且没有产生后续任务
    Final,
}

impl TaskStatus {
    /// 是否允许从 self 迁移到 next
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Started, TaskStatus::Executing)
                | (TaskStatus::Executing, TaskStatus::Completed)
                | (TaskStatus::Executing, TaskStatus::Final)
                | (TaskStatus::Completed, TaskStatus::Final)
        )
    }

    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Final)
    }
}

/// 单个任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// 任务描述
    pub value: String,
    pub status: TaskStatus,
    /// 执行结果
    pub info: Option<String>,
    /// 创建时间（毫秒时间戳）
    pub created_at: i64,
}

impl Task {
    /// 新任务总是以 Started 入队
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            value: value.into(),
            status: TaskStatus::Started,
            info: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskStoreError {
    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("Duplicate task id: {0}")]
    DuplicateId(TaskId),

    #[error("Invalid transition for {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Task {running} is already executing")]
    AlreadyExecuting { running: TaskId },
}

/// 任务存储（单个编排器独占，按顺序修改）
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加任务（保持入队顺序）
    pub fn append(&mut self, task: Task) -> Result<(), TaskStoreError> {
        if self.tasks.iter().any(|t| t.id == task.id) {
            return Err(TaskStoreError::DuplicateId(task.id));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// 更新状态与可选结果；返回迁移前的状态
    pub fn update_status(
        &mut self,
        id: &TaskId,
        status: TaskStatus,
        info: Option<String>,
    ) -> Result<TaskStatus, TaskStoreError> {
        if status == TaskStatus::Executing {
            if let Some(running) = self
                .tasks
                .iter()
                .find(|t| t.status == TaskStatus::Executing && &t.id != id)
            {
                return Err(TaskStoreError::AlreadyExecuting {
                    running: running.id.clone(),
                });
            }
        }

        let task = self
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| TaskStoreError::UnknownTask(id.clone()))?;

        let from = task.status;
        if !from.can_transition_to(status) {
            return Err(TaskStoreError::InvalidTransition {
                id: id.clone(),
                from,
                to: status,
            });
        }
        task.status = status;
        if info.is_some() {
            task.info = info;
        }
        Ok(from)
    }

    /// 状态为 Started 的任务（入队顺序）
    pub fn remaining_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Started)
            .collect()
    }

    /// 下一个待执行任务
    pub fn next_started(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| t.status == TaskStatus::Started)
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(values: &[&str]) -> (TaskStore, Vec<TaskId>) {
        let mut store = TaskStore::new();
        let mut ids = Vec::new();
        for v in values {
            let task = Task::new(*v);
            ids.push(task.id.clone());
            store.append(task).unwrap();
        }
        (store, ids)
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("task_"));
    }

    #[test]
    fn test_remaining_tasks_in_insertion_order() {
        let (mut store, ids) = store_with(&["a", "b", "c"]);
        store.update_status(&ids[0], TaskStatus::Executing, None).unwrap();
        let remaining: Vec<&str> = store
            .remaining_tasks()
            .iter()
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(remaining, vec!["b", "c"]);
        assert_eq!(store.next_started().unwrap().value, "b");
    }

    #[test]
    fn test_full_lifecycle() {
        let (mut store, ids) = store_with(&["a"]);
        let from = store.update_status(&ids[0], TaskStatus::Executing, None).unwrap();
        assert_eq!(from, TaskStatus::Started);
        store
            .update_status(&ids[0], TaskStatus::Completed, Some("done".into()))
            .unwrap();
        store.update_status(&ids[0], TaskStatus::Final, None).unwrap();
        let task = store.get(&ids[0]).unwrap();
        assert_eq!(task.status, TaskStatus::Final);
        assert_eq!(task.info.as_deref(), Some("done"));
    }

    #[test]
    fn test_status_never_reverts() {
        let (mut store, ids) = store_with(&["a"]);
        store.update_status(&ids[0], TaskStatus::Executing, None).unwrap();
        let err = store
            .update_status(&ids[0], TaskStatus::Started, None)
            .unwrap_err();
        assert!(matches!(err, TaskStoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cannot_skip_executing() {
        let (mut store, ids) = store_with(&["a"]);
        let err = store
            .update_status(&ids[0], TaskStatus::Completed, None)
            .unwrap_err();
        assert!(matches!(err, TaskStoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_single_executing_task() {
        let (mut store, ids) = store_with(&["a", "b"]);
        store.update_status(&ids[0], TaskStatus::Executing, None).unwrap();
        let err = store
            .update_status(&ids[1], TaskStatus::Executing, None)
            .unwrap_err();
        assert_eq!(
            err,
            TaskStoreError::AlreadyExecuting {
                running: ids[0].clone()
            }
        );
    }

    #[test]
    fn test_duplicate_and_unknown_ids() {
        let (mut store, ids) = store_with(&["a"]);
        let dup = store.tasks()[0].clone();
        assert!(matches!(
            store.append(dup),
            Err(TaskStoreError::DuplicateId(_))
        ));
        let unknown = TaskId::new();
        assert!(matches!(
            store.update_status(&unknown, TaskStatus::Executing, None),
            Err(TaskStoreError::UnknownTask(_))
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&ids[0]).unwrap().status, TaskStatus::Started);
    }
}
