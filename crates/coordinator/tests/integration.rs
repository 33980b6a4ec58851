//! End-to-end tests for the coordination engine, driven through the
//! `Coordinator` facade with in-process mock models.

use std::sync::Arc;

use async_trait::async_trait;
use quorum_common::{QuorumError, Result, TaskPriority, TaskStatus, TaskType};
use quorum_coordinator::{Coordinator, CoordinatorConfig, NewTask};
use quorum_llm::{ChatModel, ChatReply, ChatRequest};

/// Model that always replies with a fixed string.
struct CannedModel {
    reply: String,
}

impl CannedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
        })
    }
}

#[async_trait]
impl ChatModel for CannedModel {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatReply> {
        Ok(ChatReply {
            content: self.reply.clone(),
            model: "canned".to_string(),
            usage: None,
            finish_reason: None,
        })
    }
    fn model_name(&self) -> &str {
        "canned"
    }
}

/// Model that fails every call, simulating an unreachable provider.
struct DownModel;

#[async_trait]
impl ChatModel for DownModel {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatReply> {
        Err(QuorumError::model("connection timed out"))
    }
    fn model_name(&self) -> &str {
        "down"
    }
}

/// Model that errors whenever the prompt carries a failure marker.
struct FailOnMarkerModel;

#[async_trait]
impl ChatModel for FailOnMarkerModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply> {
        let prompt = request
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or("");
        if prompt.contains("FAIL") {
            return Err(QuorumError::model("injected dispatch failure"));
        }
        Ok(ChatReply {
            content: "ok".to_string(),
            model: "marker".to_string(),
            usage: None,
            finish_reason: None,
        })
    }
    fn model_name(&self) -> &str {
        "marker"
    }
}

fn coordinator_with(model: Arc<dyn ChatModel>) -> Coordinator {
    Coordinator::with_model(CoordinatorConfig::default(), model).unwrap()
}

#[tokio::test]
async fn queue_pops_in_priority_order() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));
    coordinator.create_agent("assistant", "helper").unwrap();

    for (id, priority) in [
        ("low", TaskPriority::Low),
        ("urgent1", TaskPriority::Urgent),
        ("medium", TaskPriority::Medium),
        ("urgent2", TaskPriority::Urgent),
    ] {
        coordinator
            .add_task(
                NewTask::new(id, "小任务")
                    .priority(priority)
                    .agent("helper"),
            )
            .await
            .unwrap();
    }

    let executed = coordinator.execute_all_tasks().await;
    let order: Vec<&str> = executed.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, ["urgent1", "urgent2", "medium", "low"]);
}

#[tokio::test]
async fn routing_falls_back_deterministically_when_model_is_down() {
    let mut coordinator = coordinator_with(Arc::new(DownModel));
    coordinator.create_agent("research", "researcher").unwrap();
    coordinator.create_agent("email", "mailer").unwrap();

    coordinator
        .add_task(NewTask::new("t1", "请发送邮件给团队"))
        .await
        .unwrap();

    let task = coordinator.get_task("t1").unwrap();
    assert_eq!(task.task_type, TaskType::Email);
    // Auto-assignment matched the email capability tag.
    assert_eq!(task.assigned_agent.as_deref(), Some("mailer"));
    // The generative path failed, so no decision is recorded.
    assert!(task.routing_decision.is_none());
}

#[tokio::test]
async fn generative_routing_records_decision() {
    let decision_json = r#"{"task_type":"email","executor":"mailer","priority":"urgent","reasoning":"通知类任务","response_style":"professional"}"#;
    let mut coordinator = coordinator_with(CannedModel::new(decision_json));
    coordinator.create_agent("email", "mailer").unwrap();

    coordinator
        .add_task(NewTask::new("t1", "通知全体成员"))
        .await
        .unwrap();

    let task = coordinator.get_task("t1").unwrap();
    assert_eq!(task.task_type, TaskType::Email);
    assert_eq!(task.priority, TaskPriority::Urgent);
    assert_eq!(task.assigned_agent.as_deref(), Some("mailer"));

    let decision = task.routing_decision.as_ref().unwrap();
    assert_eq!(decision.reasoning, "通知类任务");
    assert_eq!(decision.executor.as_deref(), Some("mailer"));
}

#[tokio::test]
async fn duplicate_task_id_leaves_store_unchanged() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));
    coordinator.create_agent("assistant", "helper").unwrap();

    coordinator
        .add_task(NewTask::new("t1", "first").agent("helper"))
        .await
        .unwrap();

    let before = coordinator.get_task_status();

    let err = coordinator
        .add_task(NewTask::new("t1", "second").agent("helper"))
        .await
        .unwrap_err();
    assert!(matches!(err, QuorumError::DuplicateTaskId(_)));

    let after = coordinator.get_task_status();
    assert_eq!(after.total, before.total);
    assert_eq!(after.queued, before.queued);
    assert_eq!(coordinator.get_coordination_metrics().tasks_created, 1);
}

#[tokio::test]
async fn terminal_states_are_mutually_exclusive() {
    let mut coordinator = coordinator_with(Arc::new(FailOnMarkerModel));
    coordinator.create_agent("assistant", "helper").unwrap();

    // Mixed forced successes and forced dispatch failures.
    for i in 0..20 {
        let description = if i % 3 == 0 {
            format!("task {i} FAIL")
        } else {
            format!("task {i}")
        };
        coordinator
            .add_task(NewTask::new(format!("t{i}"), description).agent("helper"))
            .await
            .unwrap();
    }

    let executed = coordinator.execute_all_tasks().await;
    assert_eq!(executed.len(), 20);

    for task in &executed {
        assert!(task.status.is_terminal());
        assert!(task.terminal_fields_consistent(), "task {} violated exclusivity", task.id);
        match task.status {
            TaskStatus::Completed => {
                assert!(task.result.is_some());
                assert!(task.error.is_none());
            }
            TaskStatus::Failed => {
                assert!(task.result.is_none());
                assert!(task.error.is_some());
            }
            other => panic!("unexpected terminal status {other:?}"),
        }
    }

    let metrics = coordinator.get_coordination_metrics();
    assert_eq!(metrics.tasks_completed + metrics.tasks_failed, 20);
    assert_eq!(metrics.tasks_failed, 7);
}

#[tokio::test]
async fn agent_capacity_is_enforced() {
    let config = CoordinatorConfig {
        max_agents: 2,
        ..CoordinatorConfig::default()
    };
    let mut coordinator = Coordinator::with_model(config, CannedModel::new("ok")).unwrap();

    coordinator.create_agent("research", "a").unwrap();
    coordinator.create_agent("email", "b").unwrap();

    let err = coordinator.create_agent("assistant", "c").unwrap_err();
    assert!(matches!(err, QuorumError::CapacityExceeded { limit: 2 }));
    assert_eq!(coordinator.get_agent_status().total, 2);
}

#[tokio::test]
async fn end_to_end_research_task() {
    let config = CoordinatorConfig {
        smart_routing: false,
        ..CoordinatorConfig::default()
    };
    let mut coordinator =
        Coordinator::with_model(config, CannedModel::new("医疗AI研究报告")).unwrap();

    coordinator.create_agent("research", "R").unwrap();
    coordinator.create_agent("email", "E").unwrap();

    coordinator
        .add_task(NewTask::new("t1", "研究AI在医疗的应用"))
        .await
        .unwrap();

    {
        let task = coordinator.get_task("t1").unwrap();
        assert_eq!(task.task_type, TaskType::Research);
        assert_eq!(task.assigned_agent.as_deref(), Some("R"));
        assert!(task.routing_decision.is_none());
    }

    let executed = coordinator.execute_next_task().await.unwrap();
    assert_eq!(executed.status, TaskStatus::Completed);
    let result = executed.result.unwrap();
    assert_eq!(result.executor, "R");
    assert_eq!(result.output, "医疗AI研究报告");

    assert_eq!(coordinator.get_coordination_metrics().tasks_completed, 1);
    assert_eq!(coordinator.history().len(), 1);
}

#[tokio::test]
async fn unassigned_task_with_empty_registry_fails_at_dispatch() {
    let mut coordinator = coordinator_with(Arc::new(DownModel));

    coordinator
        .add_task(NewTask::new("t1", "没有人能做的任务"))
        .await
        .unwrap();

    let executed = coordinator.execute_next_task().await.unwrap();
    assert_eq!(executed.status, TaskStatus::Failed);
    assert!(executed.error.unwrap().contains("No executor assigned"));
    assert_eq!(coordinator.get_coordination_metrics().tasks_failed, 1);
}

#[tokio::test]
async fn missing_named_agent_fails_the_task_not_the_drain() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));
    coordinator.create_agent("assistant", "helper").unwrap();

    coordinator
        .add_task(NewTask::new("bad", "x").agent("ghost"))
        .await
        .unwrap();
    coordinator
        .add_task(NewTask::new("good", "y").agent("helper"))
        .await
        .unwrap();

    let executed = coordinator.execute_all_tasks().await;
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[0].status, TaskStatus::Failed);
    assert_eq!(executed[1].status, TaskStatus::Completed);
}

#[tokio::test]
async fn team_dispatch_takes_precedence_and_aggregates_turns() {
    let config = CoordinatorConfig {
        max_team_turns: 2,
        ..CoordinatorConfig::default()
    };
    let mut coordinator = Coordinator::with_model(config, CannedModel::new("同意")).unwrap();

    coordinator.create_agent("research", "r").unwrap();
    coordinator.create_agent("assistant", "a").unwrap();
    coordinator
        .create_team("duo", "round_robin", &["r".to_string(), "a".to_string()])
        .unwrap();

    coordinator
        .add_task(NewTask::new("t1", "讨论下一步计划").team("duo").agent("r"))
        .await
        .unwrap();

    let executed = coordinator.execute_next_task().await.unwrap();
    assert_eq!(executed.status, TaskStatus::Completed);
    let result = executed.result.unwrap();
    assert_eq!(result.executor, "duo");
    assert!(result.output.contains("【r】"));
    assert!(result.output.contains("【a】"));
}

#[tokio::test]
async fn swarm_team_dispatch_fails() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));
    coordinator.create_agent("assistant", "a").unwrap();
    coordinator
        .create_team("hive", "swarm", &["a".to_string()])
        .unwrap();

    coordinator
        .add_task(NewTask::new("t1", "x").team("hive"))
        .await
        .unwrap();

    let executed = coordinator.execute_next_task().await.unwrap();
    assert_eq!(executed.status, TaskStatus::Failed);
    assert!(executed.error.unwrap().contains("swarm"));
}

#[tokio::test]
async fn duplicate_team_and_unknown_member_are_rejected() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));
    coordinator.create_agent("assistant", "a").unwrap();

    coordinator
        .create_team("team", "round_robin", &["a".to_string()])
        .unwrap();

    let err = coordinator
        .create_team("team", "round_robin", &["a".to_string()])
        .unwrap_err();
    assert!(matches!(err, QuorumError::DuplicateTeamName(_)));

    let err = coordinator
        .create_team("other", "round_robin", &["ghost".to_string()])
        .unwrap_err();
    assert!(matches!(err, QuorumError::UnknownAgent(_)));
}

#[tokio::test]
async fn session_metric_counts_attempts_even_on_failure() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));

    let err = coordinator
        .coordinate_session("讨论", &["nobody".to_string()], 3)
        .await
        .unwrap_err();
    assert!(matches!(err, QuorumError::NoValidParticipants));
    assert_eq!(coordinator.get_coordination_metrics().coordination_sessions, 1);
}

#[tokio::test]
async fn session_expands_team_names_to_members() {
    let mut coordinator = coordinator_with(CannedModel::new("收到"));
    coordinator.create_agent("research", "r").unwrap();
    coordinator.create_agent("assistant", "a").unwrap();
    coordinator
        .create_team("duo", "round_robin", &["r".to_string(), "a".to_string()])
        .unwrap();

    let session = coordinator
        .coordinate_session("制定研究计划", &["duo".to_string()], 2)
        .await
        .unwrap();

    assert_eq!(session.participants, ["r", "a"]);
    assert_eq!(session.rounds, 2);
    assert!(session.result.contains("【r】"));
    assert_eq!(coordinator.get_coordination_metrics().coordination_sessions, 1);
}

#[tokio::test]
async fn pending_tasks_can_be_cancelled() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));
    coordinator.create_agent("assistant", "helper").unwrap();

    coordinator
        .add_task(NewTask::new("t1", "x").agent("helper"))
        .await
        .unwrap();

    let cancelled = coordinator.cancel_task("t1").unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert!(cancelled.terminal_fields_consistent());

    // Cancelled task is no longer queued.
    assert!(coordinator.execute_next_task().await.is_none());

    // A terminal task cannot be cancelled again.
    assert!(coordinator.cancel_task("t1").is_err());
    assert!(coordinator.cancel_task("ghost").is_err());
}

#[tokio::test]
async fn shutdown_clears_live_state_but_keeps_history() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));
    coordinator.create_agent("assistant", "helper").unwrap();
    coordinator
        .add_task(NewTask::new("t1", "x").agent("helper"))
        .await
        .unwrap();
    coordinator.execute_next_task().await.unwrap();

    coordinator.shutdown();
    assert_eq!(coordinator.get_agent_status().total, 0);
    assert!(coordinator.get_team_status().is_empty());
    assert_eq!(coordinator.get_task_status().total, 0);
    assert_eq!(coordinator.history().len(), 1);
}

#[tokio::test]
async fn export_history_writes_iso8601_json() {
    let mut coordinator = coordinator_with(CannedModel::new("ok"));
    coordinator.create_agent("assistant", "helper").unwrap();
    coordinator
        .add_task(NewTask::new("t1", "x").agent("helper"))
        .await
        .unwrap();
    coordinator.execute_next_task().await.unwrap();

    let path = std::env::temp_dir().join("quorum-history-test.json");
    coordinator.export_history(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "t1");
    assert_eq!(records[0]["status"], "completed");
    assert!(records[0]["created_at"].as_str().unwrap().contains('T'));

    std::fs::remove_file(&path).ok();
}
