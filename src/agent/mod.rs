//! The analysis agent: request/response data model, the tool-calling loop,
//! and the caller-facing service wrapper.

pub mod assembler;
pub mod prompts;

mod agent_loop;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, SessionError};
use crate::llm::Usage;
use crate::session::{SessionHistory, SessionStore};

pub use agent_loop::{AnalysisAgent, FALLBACK_ANSWER};
pub use assembler::{AnswerContract, AssembledAnswer, GraphSpec, LineSeries, PlotSpec};

fn default_language() -> String {
    "en".to_string()
}

/// Description of a data file the agent could use. Carried for API
/// compatibility; the core logic does not read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: String,
    pub name: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One analysis request from the caller. Immutable input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Natural language question.
    pub query: String,
    /// Preferred language of the answer, e.g. "en" or "cs".
    #[serde(default = "default_language")]
    pub language: String,
    /// Optional override for the step budget; bounded by the configured
    /// ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    /// Existing session to continue, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileDescriptor>,
}

impl AnalysisRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: default_language(),
            max_steps: None,
            session_id: None,
            files: Vec::new(),
        }
    }
}

/// Kind of a trace step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    LlmCall,
    ToolCall,
    Final,
}

/// One entry of the execution trace returned to the caller. Never persisted
/// beyond the single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub label: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_args: Option<serde_json::Value>,
}

impl Step {
    pub fn llm_call(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: StepKind::LlmCall,
            label: label.into(),
            detail: detail.into(),
            tool_name: None,
            tool_args: None,
        }
    }

    pub fn tool_call(
        tool_name: impl Into<String>,
        detail: impl Into<String>,
        tool_args: serde_json::Value,
    ) -> Self {
        let tool_name = tool_name.into();
        Self {
            kind: StepKind::ToolCall,
            label: format!("Tool call: {tool_name}"),
            detail: detail.into(),
            tool_name: Some(tool_name),
            tool_args: Some(tool_args),
        }
    }

    pub fn final_answer(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: StepKind::Final,
            label: label.into(),
            detail: detail.into(),
            tool_name: None,
            tool_args: None,
        }
    }
}

/// Accumulated token counters across all gateway calls of one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, usage: &Usage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.total_tokens = self.input_tokens + self.output_tokens;
    }
}

/// The assembled result of one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub answer: String,
    pub steps: Vec<Step>,
    /// Loose chart descriptor (JSON-envelope contract).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<PlotSpec>,
    /// Typed chart (chart-block contract).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphSpec>,
    pub model: String,
    pub token_usage: TokenUsage,
    pub session_id: String,
}

/// Caller-facing operations: session resolution around the agent loop.
/// Transport (HTTP or otherwise) stays outside this crate.
pub struct AnalysisService {
    agent: AnalysisAgent,
    store: Arc<dyn SessionStore>,
}

impl AnalysisService {
    pub fn new(agent: AnalysisAgent, store: Arc<dyn SessionStore>) -> Self {
        Self { agent, store }
    }

    /// Run one analysis. A given session id must already exist; an absent id
    /// creates a fresh session.
    pub async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisResponse, Error> {
        if let Some(n) = request.max_steps {
            let ceiling = self.agent.config().max_steps_ceiling;
            if n == 0 || n > ceiling {
                return Err(Error::InvalidRequest {
                    reason: format!("max_steps must be between 1 and {ceiling}, got {n}"),
                });
            }
        }

        let (session_id, prior_messages) = match &request.session_id {
            Some(id) => {
                if !self.store.exists(id).await? {
                    return Err(SessionError::NotFound { id: id.clone() }.into());
                }
                (id.clone(), self.store.messages(id).await?)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                self.store.ensure(&id).await?;
                (id, Vec::new())
            }
        };

        self.agent.run(&request, &session_id, &prior_messages).await
    }

    /// Full message history of a session, or not-found.
    pub async fn history(&self, session_id: &str) -> Result<SessionHistory, Error> {
        if !self.store.exists(session_id).await? {
            return Err(SessionError::NotFound {
                id: session_id.to_string(),
            }
            .into());
        }
        Ok(SessionHistory {
            session_id: session_id.to_string(),
            messages: self.store.messages(session_id).await?,
        })
    }
}
