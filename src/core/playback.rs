//! 播放控制：自动模式 / 单步暂停模式，以及 Play / Pause 标志
//!
//! 单步模式下标志初始为 Pause；每次循环检查时若为 Play，则放行本轮并立即复位为 Pause，
//! 因此每次外部恢复恰好换来一个完整的任务周期。

use serde::{Deserialize, Serialize};

/// 运行模式（一次运行期间固定）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Automatic,
    StepPaused,
}

/// 播放标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Playback {
    Play,
    Pause,
}

#[derive(Debug, Clone)]
pub struct PlaybackController {
    mode: RunMode,
    playback: Playback,
}

impl PlaybackController {
    pub fn new(mode: RunMode) -> Self {
        let playback = match mode {
            RunMode::Automatic => Playback::Play,
            RunMode::StepPaused => Playback::Pause,
        };
        Self { mode, playback }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// 本轮是否应挂起；单步模式下放行一次后自动复位为 Pause
    pub fn should_suspend(&mut self) -> bool {
        if self.mode != RunMode::StepPaused {
            return false;
        }
        match self.playback {
            Playback::Pause => true,
            Playback::Play => {
                self.playback = Playback::Pause;
                false
            }
        }
    }

    /// 仅在单步模式下生效
    pub fn set_playback(&mut self, value: Playback) {
        if self.mode == RunMode::StepPaused {
            self.playback = value;
        }
    }
}
