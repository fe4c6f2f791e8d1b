//! 核心编排层：任务存储、播放控制、进度消息、错误与恢复、关闭信号、编排循环与运行时

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod playback;
pub mod recovery;
pub mod runtime;
pub mod shutdown;
pub mod state;
pub mod supervisor;
pub mod task_store;

pub use error::{AgentError, ExpansionFailure, PlanningFailure, ReasoningError, ReasoningPhase};
pub use events::{AgentMessage, EventSink, TracingSink};
pub use orchestrator::{Orchestrator, OrchestratorConfig, Pacing};
pub use playback::{Playback, PlaybackController, RunMode};
pub use recovery::{RecoveryAction, RecoveryEngine};
pub use runtime::{spawn_agent, AgentRuntime, Command};
pub use shutdown::{install_signal_handlers, ShutdownManager, ShutdownReason};
pub use state::{AgentPhase, RunOutcome, RunState, RunStateSnapshot};
pub use supervisor::AgentHandle;
pub use task_store::{Task, TaskId, TaskStatus, TaskStore, TaskStoreError};
