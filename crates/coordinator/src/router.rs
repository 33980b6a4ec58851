//! The router: free text in, task type / priority / executor out.
//!
//! Two strategies. The generative path asks the chat model for a structured
//! JSON decision under a hard timeout; the heuristic path is ordered keyword
//! matching. Every generative failure (timeout, HTTP error, unparseable or
//! invalid decision) falls back to the heuristic and never reaches the
//! caller of `add_task`.
//!
//! The router is a pure function of the description, the roster snapshot,
//! and the model's reply. It mutates nothing.

use std::sync::Arc;
use std::time::Duration;

use quorum_common::{QuorumError, Result, RoutingDecision, TaskPriority, TaskType};
use quorum_llm::{ChatMessage, ChatModel, ChatRequest};
use tracing::{debug, warn};

use crate::registry::AgentProfile;

const ROUTING_SYSTEM_PROMPT: &str = r#"你是一个多代理系统的任务路由器。分析用户任务并决定如何分配。

只输出一个JSON对象，不要有其他文字，结构如下：

{
  "task_type": "research|email|analysis|coordination|general",
  "executor": "代理名称，或 null",
  "priority": "low|medium|high|urgent",
  "reasoning": "简要说明路由理由",
  "response_style": "回复风格，例如 professional"
}

任务类型定义：
- "research": 信息搜集、调查、搜索、了解某个主题
- "email": 邮件撰写、发送、通知
- "analysis": 数据统计、计算、评估
- "coordination": 需要多个代理协作的任务
- "general": 普通问答和其他任务

"executor" 必须是可用代理列表中的名称；不确定时输出 null。"#;

/// Keyword sets for the heuristic classifier. Matching order is research,
/// then email, then analysis; a description hitting several sets routes to
/// the earliest one.
const RESEARCH_KEYWORDS: &[&str] = &[
    "研究",
    "调查",
    "分析",
    "搜索",
    "查找",
    "了解",
    "research",
    "investigate",
    "analyze",
];

const EMAIL_KEYWORDS: &[&str] = &[
    "邮件", "发送", "写信", "通知", "email", "send", "write", "notify",
];

const ANALYSIS_KEYWORDS: &[&str] = &[
    "分析",
    "统计",
    "计算",
    "评估",
    "analyze",
    "calculate",
    "evaluate",
];

const URGENT_KEYWORDS: &[&str] = &["紧急", "立即", "马上", "urgent", "immediate", "asap"];
const HIGH_KEYWORDS: &[&str] = &["重要", "优先", "关键", "important", "priority", "critical"];
const LOW_KEYWORDS: &[&str] = &[
    "稍后",
    "有时间",
    "不急",
    "later",
    "when possible",
    "low priority",
];

/// What routing produced for one task. `decision` is present only when the
/// generative path succeeded; the heuristic leaves it unset and leaves the
/// executor to capability-based auto-assignment.
#[derive(Debug, Clone)]
pub struct RoutingOutcome {
    pub task_type: TaskType,
    pub priority: TaskPriority,
    pub executor: Option<String>,
    pub decision: Option<RoutingDecision>,
}

pub struct Router {
    model: Option<Arc<dyn ChatModel>>,
    timeout: Duration,
}

impl Router {
    pub fn new(model: Option<Arc<dyn ChatModel>>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Route a task description. `use_generative` gates the model call; the
    /// heuristic always runs when the generative path is off or fails.
    pub async fn route(
        &self,
        description: &str,
        roster: &[AgentProfile],
        use_generative: bool,
    ) -> RoutingOutcome {
        if use_generative {
            if let Some(ref model) = self.model {
                match self.generative_route(model.as_ref(), description, roster).await {
                    Ok(outcome) => {
                        debug!(
                            task_type = ?outcome.task_type,
                            executor = ?outcome.executor,
                            "Generative routing decision"
                        );
                        return outcome;
                    }
                    Err(e) => {
                        warn!(error = %e, "Generative routing failed, falling back to keyword routing");
                    }
                }
            }
        }

        Self::heuristic_route(description)
    }

    async fn generative_route(
        &self,
        model: &dyn ChatModel,
        description: &str,
        roster: &[AgentProfile],
    ) -> Result<RoutingOutcome> {
        let request = ChatRequest {
            system_prompt: Some(ROUTING_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(Self::build_prompt(description, roster))],
            temperature: Some(0.3),
            max_tokens: Some(512),
        };

        let reply = tokio::time::timeout(self.timeout, model.complete(request))
            .await
            .map_err(|_| {
                QuorumError::Routing(format!(
                    "Routing call timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })??;

        Self::parse_decision(&reply.content, roster)
    }

    fn build_prompt(description: &str, roster: &[AgentProfile]) -> String {
        let mut prompt = String::from("可用代理:\n");
        for profile in roster {
            let tags = profile
                .capabilities
                .iter()
                .map(|c| format!("{c:?}").to_lowercase())
                .collect::<Vec<_>>()
                .join(", ");
            prompt.push_str(&format!("- {} [{}]\n", profile.name, tags));
        }
        prompt.push_str(&format!("\n任务描述:\n{description}"));
        prompt
    }

    /// Parse the model reply into a validated outcome. An executor name the
    /// roster does not contain is discarded rather than trusted.
    fn parse_decision(response: &str, roster: &[AgentProfile]) -> Result<RoutingOutcome> {
        let json_str = extract_json_object(response).ok_or_else(|| {
            QuorumError::Routing(format!(
                "No JSON object in routing response: {}",
                response.chars().take(120).collect::<String>()
            ))
        })?;

        let parsed: serde_json::Value = serde_json::from_str(json_str)
            .map_err(|e| QuorumError::Routing(format!("Invalid routing JSON: {e}")))?;

        let task_type = match parsed.get("task_type").and_then(|v| v.as_str()) {
            Some("research") => TaskType::Research,
            Some("email") => TaskType::Email,
            Some("analysis") => TaskType::Analysis,
            Some("coordination") => TaskType::Coordination,
            Some("general") => TaskType::General,
            other => {
                return Err(QuorumError::Routing(format!(
                    "Invalid task_type in routing decision: {other:?}"
                )));
            }
        };

        let priority = match parsed.get("priority").and_then(|v| v.as_str()) {
            Some("low") => TaskPriority::Low,
            Some("high") => TaskPriority::High,
            Some("urgent") => TaskPriority::Urgent,
            _ => TaskPriority::Medium,
        };

        let executor = parsed
            .get("executor")
            .and_then(|v| v.as_str())
            .filter(|name| {
                let known = roster.iter().any(|p| p.name == *name);
                if !known {
                    warn!(executor = %name, "Routing decision names an unknown agent, ignoring");
                }
                known
            })
            .map(String::from);

        let reasoning = parsed
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let response_style = parsed
            .get("response_style")
            .and_then(|v| v.as_str())
            .unwrap_or("professional")
            .to_string();

        Ok(RoutingOutcome {
            task_type,
            priority,
            executor: executor.clone(),
            decision: Some(RoutingDecision {
                task_type,
                executor,
                priority,
                reasoning,
                response_style,
            }),
        })
    }

    /// Keyword classification. Research keywords take precedence over email
    /// keywords, which take precedence over analysis keywords.
    pub fn heuristic_route(description: &str) -> RoutingOutcome {
        let lower = description.to_lowercase();

        let task_type = if contains_any(&lower, RESEARCH_KEYWORDS) {
            TaskType::Research
        } else if contains_any(&lower, EMAIL_KEYWORDS) {
            TaskType::Email
        } else if contains_any(&lower, ANALYSIS_KEYWORDS) {
            TaskType::Analysis
        } else {
            TaskType::General
        };

        let priority = if contains_any(&lower, URGENT_KEYWORDS) {
            TaskPriority::Urgent
        } else if contains_any(&lower, HIGH_KEYWORDS) {
            TaskPriority::High
        } else if contains_any(&lower, LOW_KEYWORDS) {
            TaskPriority::Low
        } else {
            TaskPriority::Medium
        };

        RoutingOutcome {
            task_type,
            priority,
            executor: None,
            decision: None,
        }
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// Extract the first balanced JSON object from a string that may carry
/// surrounding prose.
fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0;
    let mut end = start;

    for (i, c) in s[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    if depth == 0 && end > start {
        Some(&s[start..end])
    } else {
        None
    }
}
