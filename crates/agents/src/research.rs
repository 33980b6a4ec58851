//! Research agent: web search plus model-written synthesis.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use quorum_common::{Agent, AgentMessage, Result};
use quorum_llm::{ChatMessage, ChatModel, ChatRequest};
use tracing::{info, warn};

use crate::search::{SearchClient, SearchResult};

const RESEARCH_SYSTEM_PROMPT: &str = "你是一个专业的AI研究代理。请基于提供的搜索结果进行多源交叉验证，\
给出结构化的研究结论，并标注信息来源。区分事实与观点，注明来源的可信度。";

const REALTIME_KEYWORDS: &[&str] = &[
    "今天", "现在", "当前", "最新", "实时", "新闻", "进展", "资讯", "today", "now", "current",
    "latest", "news", "update",
];

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
    "search",
    "find",
    "study",
];

const MAX_SOURCES: usize = 10;

pub struct ResearchAgent {
    name: String,
    model: Arc<dyn ChatModel>,
    search: Option<Arc<dyn SearchClient>>,
    cache: Mutex<HashMap<String, Vec<SearchResult>>>,
    searches_performed: AtomicU64,
    reports_generated: AtomicU64,
}

impl ResearchAgent {
    pub fn new(name: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            model,
            search: None,
            cache: Mutex::new(HashMap::new()),
            searches_performed: AtomicU64::new(0),
            reports_generated: AtomicU64::new(0),
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchClient>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn set_search(&mut self, search: Arc<dyn SearchClient>) {
        self.search = Some(search);
    }

    pub fn searches_performed(&self) -> u64 {
        self.searches_performed.load(Ordering::Relaxed)
    }

    pub fn reports_generated(&self) -> u64 {
        self.reports_generated.load(Ordering::Relaxed)
    }

    fn is_research_request(query: &str) -> bool {
        let lower = query.to_lowercase();
        REALTIME_KEYWORDS
            .iter()
            .chain(RESEARCH_KEYWORDS)
            .any(|k| lower.contains(k))
    }

    /// Gather sources for the query. A missing or failing search backend
    /// degrades to an empty source list so the report can still be written.
    async fn gather_sources(&self, query: &str) -> Vec<SearchResult> {
        let cache_key = query.trim().to_lowercase();
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&cache_key) {
                info!(agent = %self.name, "Using cached search results");
                return hit.clone();
            }
        }

        let Some(ref search) = self.search else {
            return Vec::new();
        };

        match search.search(query, MAX_SOURCES).await {
            Ok(results) => {
                self.searches_performed.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(cache_key, results.clone());
                }
                results
            }
            Err(e) => {
                warn!(agent = %self.name, error = %e, "Search failed, writing report without sources");
                Vec::new()
            }
        }
    }

    fn build_report_prompt(query: &str, sources: &[SearchResult]) -> String {
        let mut prompt = format!("研究主题: {query}\n\n");
        if sources.is_empty() {
            prompt.push_str("没有可用的搜索结果，请基于已有知识撰写研究报告，并注明缺少实时来源。");
        } else {
            prompt.push_str("搜索结果:\n");
            for (i, source) in sources.iter().enumerate() {
                prompt.push_str(&format!(
                    "{}. {} ({})\n   {}\n",
                    i + 1,
                    source.title,
                    source.url,
                    source.snippet
                ));
            }
            prompt.push_str("\n请基于以上来源撰写结构化研究报告，引用来源编号。");
        }
        prompt
    }

    async fn write_report(&self, query: &str, sources: &[SearchResult]) -> Result<String> {
        let request = ChatRequest {
            system_prompt: Some(RESEARCH_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(Self::build_report_prompt(query, sources))],
            temperature: Some(0.3),
            max_tokens: None,
        };
        let reply = self.model.complete(request).await?;
        self.reports_generated.fetch_add(1, Ordering::Relaxed);
        Ok(reply.content)
    }
}

#[async_trait]
impl Agent for ResearchAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> &'static str {
        "research"
    }

    async fn handle(&self, message: &AgentMessage) -> Result<AgentMessage> {
        let query = message.content.as_str();

        if Self::is_research_request(query) {
            info!(agent = %self.name, "Handling research request");
            let sources = self.gather_sources(query).await;
            let report = self.write_report(query, &sources).await?;
            return Ok(AgentMessage::from_agent(&self.name, report));
        }

        // Plain conversation falls through to the model directly.
        let request = ChatRequest {
            system_prompt: Some(RESEARCH_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(query)],
            temperature: Some(0.7),
            max_tokens: None,
        };
        let reply = self.model.complete(request).await?;
        Ok(AgentMessage::from_agent(&self.name, reply.content))
    }
}
