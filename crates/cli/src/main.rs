//! Interactive Quorum session.
//!
//! Usage:
//!   quorum --config config.toml
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY` - key for the "openai" model provider
//! - `GEMINI_API_KEY` - key for the "gemini" model provider

use quorum_coordinator::{Coordinator, CoordinatorConfig, NewTask};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut history_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--export-history" => {
                if i + 1 < args.len() {
                    history_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Quorum interactive coordinator");
                println!();
                println!("Usage: quorum [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <FILE>          Path to config.toml file");
                println!("      --export-history <FILE>  Dump task history to FILE on exit");
                println!("  -h, --help                   Show this help message");
                println!();
                println!("Environment variables:");
                println!("  OPENAI_API_KEY   Key for the openai model provider");
                println!("  GEMINI_API_KEY   Key for the gemini model provider");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = if let Some(path) = config_path {
        tracing::info!(path = %path, "Loading configuration");
        CoordinatorConfig::from_file(&path)?
    } else {
        tracing::info!("Using default configuration");
        CoordinatorConfig::default()
    };

    let mut coordinator = Coordinator::new(config)?;
    register_default_roster(&mut coordinator)?;

    println!("Quorum 协调中心已启动。输入 help 查看命令，quit 退出。");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut task_counter: u64 = 0;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("命令:");
                println!("  status   显示代理、团队和任务状态");
                println!("  metrics  显示协调指标");
                println!("  quit     退出");
                println!("其他输入会作为任务提交并立即执行。");
            }
            "status" => {
                let agents = coordinator.get_agent_status();
                println!("代理: {} 个，{} 个活跃", agents.total, agents.active);
                for agent in &agents.agents {
                    println!("  - {} ({:?}, {:?})", agent.name, agent.agent_type, agent.status);
                }
                for team in coordinator.get_team_status() {
                    println!("团队: {} ({:?}) 成员 {:?}", team.name, team.mode, team.members);
                }
                let tasks = coordinator.get_task_status();
                println!(
                    "任务: 共 {}，排队 {}，完成 {}，失败 {}",
                    tasks.total, tasks.queued, tasks.completed, tasks.failed
                );
            }
            "metrics" => {
                let metrics = coordinator.get_coordination_metrics();
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            }
            description => {
                task_counter += 1;
                let id = format!("cli-{task_counter}");
                match coordinator.add_task(NewTask::new(&id, description)).await {
                    Ok(_) => match coordinator.execute_next_task().await {
                        Some(task) => match task.result {
                            Some(result) => {
                                println!("[{}] 完成，执行者 {}:", task.id, result.executor);
                                println!("{}", result.output);
                            }
                            None => {
                                println!(
                                    "[{}] 失败: {}",
                                    task.id,
                                    task.error.unwrap_or_default()
                                );
                            }
                        },
                        None => println!("队列为空。"),
                    },
                    Err(e) => println!("任务提交失败: {e}"),
                }
            }
        }
    }

    if let Some(path) = history_path {
        coordinator.export_history(&path)?;
        println!("历史已导出到 {path}");
    }

    coordinator.shutdown();
    Ok(())
}

/// Default roster: one agent per role plus the standing teams.
fn register_default_roster(coordinator: &mut Coordinator) -> anyhow::Result<()> {
    coordinator.create_agent("research", "researcher")?;
    coordinator.create_agent("email", "mailer")?;
    coordinator.create_agent("assistant", "assistant")?;
    coordinator.create_agent("research", "analyst")?;

    coordinator.create_team(
        "research",
        "round_robin",
        &["researcher".to_string(), "analyst".to_string()],
    )?;
    coordinator.create_team(
        "comms",
        "round_robin",
        &["mailer".to_string(), "assistant".to_string()],
    )?;
    coordinator.create_team(
        "all",
        "round_robin",
        &[
            "researcher".to_string(),
            "mailer".to_string(),
            "assistant".to_string(),
            "analyst".to_string(),
        ],
    )?;
    Ok(())
}
