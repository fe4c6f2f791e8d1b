//! AutoBee 命令行入口
//!
//! 用法：autobee "<goal>" [--step] [--budget N] [--config PATH] [--quiet]
//! 单步模式下从 stdin 读命令：空行放行一个任务周期，q 停止。

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use autobee::config::load_config;
use autobee::core::{
    install_signal_handlers, spawn_agent, AgentMessage, Command, EventSink, Orchestrator,
    OrchestratorConfig, RunMode, TracingSink,
};
use autobee::reasoning::create_reasoning_from_config;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "autobee", version, about = "Autonomous task-orchestration agent")]
struct Args {
    /// 本次运行的目标
    goal: String,
    /// 单步模式：每次回车放行一个任务周期
    #[arg(long)]
    step: bool,
    /// 覆盖配置中的循环预算
    #[arg(long)]
    budget: Option<u32>,
    /// 额外的配置文件
    #[arg(long)]
    config: Option<PathBuf>,
    /// 不打印进度消息，只写日志
    #[arg(long, short)]
    quiet: bool,
}

/// 直接打印到终端的接收端
struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, message: AgentMessage) {
        print_message(&message);
    }
}

fn print_message(message: &AgentMessage) {
    let prefix = match message {
        AgentMessage::Goal { .. } => "🎯",
        AgentMessage::Thinking { .. } => "🤔",
        AgentMessage::Task { .. } => "📝",
        AgentMessage::Analysis { .. } => "🔍",
        AgentMessage::Error { fatal: true, .. } => "❌",
        AgentMessage::Error { fatal: false, .. } => "⚠️",
        AgentMessage::Completed { .. } => "✅",
        AgentMessage::LoopLimit { .. } => "⏹",
        AgentMessage::ManualShutdown { .. } => "🛑",
    };
    println!("{} {}", prefix, message.display_text());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    autobee::observability::init();

    let args = Args::parse();
    let cfg = load_config(args.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let mut orch_cfg = OrchestratorConfig::from(&cfg.agent);
    if args.step {
        orch_cfg.mode = RunMode::StepPaused;
    }
    if let Some(budget) = args.budget {
        orch_cfg.loop_budget = budget;
    }
    let step_mode = orch_cfg.mode == RunMode::StepPaused;

    let reasoning = create_reasoning_from_config(&cfg);
    let sink: Arc<dyn EventSink> = if args.quiet {
        Arc::new(TracingSink)
    } else {
        Arc::new(StdoutSink)
    };
    let orchestrator = Orchestrator::new(args.goal, reasoning, sink, orch_cfg);
    let runtime = spawn_agent(orchestrator).await;
    install_signal_handlers(runtime.handle.clone());

    if step_mode {
        println!("Step mode: press Enter to run one task, 'q' + Enter to stop.");
        let cmd_tx = runtime.cmd_tx.clone();
        // 交互式读取用独立线程，避免阻塞运行时退出
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let cmd = if line.trim() == "q" {
                    Command::Stop
                } else {
                    Command::Resume
                };
                if cmd_tx.send(cmd).is_err() {
                    break;
                }
            }
        });
    }

    let outcome = runtime
        .done_rx
        .await
        .context("Agent runtime exited unexpectedly")?;
    let state = runtime.state_rx.borrow().clone();

    let outcome = outcome.context("Agent failed")?;
    tracing::info!(
        ?outcome,
        loop_count = state.loop_count,
        completed = state.completed_task_values.len(),
        "Agent finished"
    );
    Ok(())
}
