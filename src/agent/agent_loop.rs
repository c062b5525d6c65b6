//! The multi-step tool-calling agent loop.
//!
//! One request is a strictly sequential state machine over a bounded number
//! of gateway calls: each response either requests tool invocations (which
//! are executed in order and fed back) or carries the final answer. Every
//! event is appended to the session log and mirrored in the step trace.

use std::sync::Arc;

use serde_json::Value;

use crate::agent::{assembler, prompts, AnalysisRequest, AnalysisResponse, Step, TokenUsage};
use crate::config::AgentConfig;
use crate::error::Error;
use crate::llm::{InputItem, OutputItem, ResponsesProvider, ResponsesRequest};
use crate::session::{MessageKind, Role, SessionMessage, SessionStore};
use crate::tools::ToolRegistry;

/// Answer returned when the loop exhausts its step budget. A defined
/// terminal outcome, not an error.
pub const FALLBACK_ANSWER: &str =
    "Sorry, I could not produce a confident answer within the configured step limit.";

const MAX_SUMMARY_CHARS: usize = 200;

/// The agent: gateway, tool registry, and session log wired together.
pub struct AnalysisAgent {
    config: AgentConfig,
    gateway: Arc<dyn ResponsesProvider>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn SessionStore>,
}

impl AnalysisAgent {
    pub fn new(
        config: AgentConfig,
        gateway: Arc<dyn ResponsesProvider>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            gateway,
            tools,
            store,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the loop for one request against an existing session.
    ///
    /// Gateway failures propagate unretried; an unknown tool name aborts the
    /// request; malformed tool arguments degrade to an empty object.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        session_id: &str,
        prior_messages: &[SessionMessage],
    ) -> Result<AnalysisResponse, Error> {
        self.store.ensure(session_id).await?;

        let max_steps = request.max_steps.unwrap_or(self.config.default_max_steps);
        if max_steps == 0 || max_steps > self.config.max_steps_ceiling {
            return Err(Error::InvalidRequest {
                reason: format!(
                    "max_steps must be between 1 and {}, got {max_steps}",
                    self.config.max_steps_ceiling
                ),
            });
        }

        let mut steps: Vec<Step> = Vec::new();
        let mut token_usage = TokenUsage::default();
        let mut previous_response_id: Option<String> = None;

        let instructions = prompts::system_prompt(self.config.contract);
        let tool_schemas = self.tools.schemas();

        let mut inputs = seed_inputs(prior_messages);
        inputs.push(InputItem::user_text(format!(
            "Language: {}\n\nUser question:\n{}",
            request.language, request.query
        )));

        self.store
            .append(
                session_id,
                SessionMessage::new(Role::User, &request.query)
                    .with_kind(MessageKind::UserMessage),
            )
            .await?;

        for step_index in 0..max_steps {
            tracing::debug!(
                session_id,
                step = step_index + 1,
                max_steps,
                "Calling model gateway"
            );

            let response = self
                .gateway
                .create(ResponsesRequest {
                    instructions: instructions.clone(),
                    tools: tool_schemas.clone(),
                    input: std::mem::take(&mut inputs),
                    previous_response_id: previous_response_id.clone(),
                })
                .await?;

            previous_response_id = Some(response.id.clone());
            if let Some(usage) = &response.usage {
                token_usage.add(usage);
            }

            let function_calls: Vec<(String, String, String)> = response
                .output
                .iter()
                .filter_map(|item| match item {
                    OutputItem::FunctionCall {
                        name,
                        arguments,
                        call_id,
                    } => Some((name.clone(), arguments.clone(), call_id.clone())),
                    _ => None,
                })
                .collect();

            for text in response.message_texts() {
                self.store
                    .append(
                        session_id,
                        SessionMessage::new(Role::Assistant, text)
                            .with_kind(MessageKind::AssistantMessage),
                    )
                    .await?;
            }

            steps.push(Step::llm_call(
                format!("LLM call #{}", step_index + 1),
                if function_calls.is_empty() {
                    "Model produced a final answer."
                } else {
                    "Model decided to call tools."
                },
            ));

            if function_calls.is_empty() {
                let final_text = response
                    .output_text
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| response.concatenated_text());

                let assembled = assembler::assemble(&final_text, self.config.contract);

                steps.push(Step::final_answer(
                    "Final answer",
                    "Agent returned a final answer to the user.",
                ));

                self.store
                    .append(
                        session_id,
                        SessionMessage::new(Role::Assistant, &assembled.answer)
                            .with_kind(MessageKind::AssistantFinal),
                    )
                    .await?;

                return Ok(AnalysisResponse {
                    answer: assembled.answer,
                    steps,
                    plot: assembled.plot,
                    graph: assembled.graph,
                    model: self.gateway.model_name().to_string(),
                    token_usage,
                    session_id: session_id.to_string(),
                });
            }

            // Execute requested tools sequentially, in gateway order; later
            // calls may assume earlier ones' side effects.
            let mut next_inputs = Vec::with_capacity(function_calls.len());
            for (name, raw_args, call_id) in function_calls {
                let Some(tool) = self.tools.get(&name) else {
                    tracing::error!(session_id, tool = %name, "Model requested unknown tool");
                    return Err(Error::UnknownTool { name });
                };

                let args = parse_tool_args(&name, &raw_args);

                tracing::info!(session_id, tool = %name, "Executing tool");
                let result = tool.execute(args.clone()).await?;

                self.store
                    .append(
                        session_id,
                        SessionMessage::new(
                            Role::Assistant,
                            format!("[Tool call] {name} args: {args}"),
                        )
                        .with_kind(MessageKind::ToolCall)
                        .with_tool_name(&name),
                    )
                    .await?;

                steps.push(Step::tool_call(
                    &name,
                    summarize_tool_result(&name, &result),
                    args,
                ));

                let serialized = result.to_string();
                self.store
                    .append(
                        session_id,
                        SessionMessage::new(Role::Tool, &serialized)
                            .with_kind(MessageKind::ToolResult)
                            .with_tool_name(&name),
                    )
                    .await?;

                next_inputs.push(InputItem::function_call_output(call_id, serialized));
            }

            // The continuation token carries prior context; the next batch is
            // only the new function results.
            inputs = next_inputs;
        }

        tracing::warn!(
            session_id,
            max_steps,
            "Step budget exhausted without a final answer"
        );

        steps.push(Step::final_answer(
            "Max steps reached",
            "Agent reached the maximum number of steps without finalizing an answer. \
             This usually means the question is too broad or the tools misbehaved.",
        ));

        self.store
            .append(
                session_id,
                SessionMessage::new(Role::Assistant, FALLBACK_ANSWER)
                    .with_kind(MessageKind::AssistantFinal),
            )
            .await?;

        Ok(AnalysisResponse {
            answer: FALLBACK_ANSWER.to_string(),
            steps,
            plot: None,
            graph: None,
            model: self.gateway.model_name().to_string(),
            token_usage,
            session_id: session_id.to_string(),
        })
    }
}

/// Convert prior session messages into the gateway's input shape. Only user
/// and assistant messages with non-empty content carry over.
fn seed_inputs(messages: &[SessionMessage]) -> Vec<InputItem> {
    messages
        .iter()
        .filter(|msg| !msg.content.is_empty())
        .filter_map(|msg| match msg.role {
            Role::User => Some(InputItem::user_text(&msg.content)),
            Role::Assistant => Some(InputItem::assistant_text(&msg.content)),
            _ => None,
        })
        .collect()
}

/// Parse a function call's raw argument payload. Malformed payloads degrade
/// to an empty object rather than failing the call.
fn parse_tool_args(name: &str, raw: &str) -> Value {
    let raw = if raw.is_empty() { "{}" } else { raw };
    match serde_json::from_str(raw) {
        Ok(args) => args,
        Err(e) => {
            tracing::warn!(
                tool = %name,
                "Malformed tool arguments ({}), substituting empty object",
                e
            );
            Value::Object(Default::default())
        }
    }
}

/// Short human-readable summary of a tool result for the step trace.
fn summarize_tool_result(name: &str, result: &Value) -> String {
    if let Some(files) = result.get("files").and_then(Value::as_array) {
        let names: Vec<&str> = files
            .iter()
            .filter_map(|f| {
                f.get("name")
                    .or_else(|| f.get("id"))
                    .and_then(Value::as_str)
            })
            .take(3)
            .collect();
        format!(
            "{name} returned {} files: {}...",
            files.len(),
            names.join(", ")
        )
    } else {
        format!(
            "{name} returned: {}",
            truncate_chars(&result.to_string(), MAX_SUMMARY_CHARS)
        )
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seed_inputs_skips_empty_and_non_conversation_roles() {
        let messages = vec![
            SessionMessage::new(Role::User, "first question"),
            SessionMessage::new(Role::Assistant, ""),
            SessionMessage::new(Role::Tool, "{\"files\": []}"),
            SessionMessage::new(Role::Assistant, "an earlier answer"),
        ];
        let inputs = seed_inputs(&messages);
        assert_eq!(inputs.len(), 2);
        assert!(matches!(&inputs[0], InputItem::Message { role, .. }
            if *role == crate::llm::InputRole::User));
        assert!(matches!(&inputs[1], InputItem::Message { role, .. }
            if *role == crate::llm::InputRole::Assistant));
    }

    #[test]
    fn malformed_args_become_empty_object() {
        assert_eq!(parse_tool_args("t", "{\"a\": 1}"), json!({"a": 1}));
        assert_eq!(parse_tool_args("t", "not json"), json!({}));
        assert_eq!(parse_tool_args("t", ""), json!({}));
    }

    #[test]
    fn summary_lists_file_names() {
        let result = json!({"files": [
            {"id": "f1", "name": "Region A"},
            {"id": "f2"},
            {"id": "f3", "name": "Region C"},
            {"id": "f4", "name": "Region D"},
        ]});
        let summary = summarize_tool_result("load_files", &result);
        assert_eq!(
            summary,
            "load_files returned 4 files: Region A, f2, Region C..."
        );
    }

    #[test]
    fn summary_truncates_other_results() {
        let result = json!({"blob": "x".repeat(500)});
        let summary = summarize_tool_result("t", &result);
        assert!(summary.starts_with("t returned: "));
        assert!(summary.chars().count() <= MAX_SUMMARY_CHARS + "t returned: ".len());
    }
}
