//! Model gateway abstraction over the Responses API.
//!
//! The agent loop only depends on the [`ResponsesProvider`] trait; the
//! concrete HTTP client lives in [`openai_responses`] so tests can substitute
//! a scripted gateway.

pub mod openai_responses;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::tools::ToolSchema;

pub use openai_responses::OpenAiResponsesProvider;

/// Role of a conversation-shaped input item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputRole {
    User,
    Assistant,
}

/// One text-bearing content part of an input message.
#[derive(Debug, Clone, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentPart {
    pub fn input_text(text: impl Into<String>) -> Self {
        Self {
            kind: "input_text".to_string(),
            text: text.into(),
        }
    }

    pub fn output_text(text: impl Into<String>) -> Self {
        Self {
            kind: "output_text".to_string(),
            text: text.into(),
        }
    }
}

/// An item in the gateway's input batch.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InputItem {
    /// A conversation message (user or assistant).
    Message {
        role: InputRole,
        content: Vec<ContentPart>,
    },
    /// The serialized result of a previously requested function call, fed
    /// back so the model can continue reasoning.
    FunctionCallOutput {
        #[serde(rename = "type")]
        kind: String,
        call_id: String,
        output: String,
    },
}

impl InputItem {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::Message {
            role: InputRole::User,
            content: vec![ContentPart::input_text(text)],
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::Message {
            role: InputRole::Assistant,
            content: vec![ContentPart::output_text(text)],
        }
    }

    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput {
            kind: "function_call_output".to_string(),
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// One gateway call: instructions, tool schemas, input batch, and the
/// continuation token from the previous call (none on the first).
#[derive(Debug, Clone)]
pub struct ResponsesRequest {
    pub instructions: String,
    pub tools: Vec<ToolSchema>,
    pub input: Vec<InputItem>,
    pub previous_response_id: Option<String>,
}

/// Token counters reported by the gateway. Missing fields count as zero.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// A text-bearing content piece of a `message` output item.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl OutputContent {
    pub fn output_text(text: impl Into<String>) -> Self {
        Self {
            kind: "output_text".to_string(),
            text: text.into(),
        }
    }

    /// Whether this piece carries answer text.
    pub fn is_text(&self) -> bool {
        matches!(self.kind.as_str(), "output_text" | "input_text")
    }
}

/// An item of the gateway's output. Unknown item types are tolerated and
/// ignored by the loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    FunctionCall {
        name: String,
        #[serde(default)]
        arguments: String,
        call_id: String,
    },
    #[serde(other)]
    Other,
}

/// A full gateway response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesResponse {
    /// Continuation token for the next call.
    pub id: String,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    /// Pre-concatenated answer text, when the gateway supplies it.
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ResponsesResponse {
    /// All assistant text fragments, one per text-bearing content piece, in
    /// output order.
    pub fn message_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        for item in &self.output {
            if let OutputItem::Message { content } = item {
                for piece in content {
                    if piece.is_text() && !piece.text.is_empty() {
                        texts.push(piece.text.clone());
                    }
                }
            }
        }
        texts
    }

    /// Fallback final text: message fragments joined by blank lines.
    pub fn concatenated_text(&self) -> String {
        self.message_texts().join("\n\n")
    }
}

/// The single call primitive the agent loop depends on.
#[async_trait]
pub trait ResponsesProvider: Send + Sync {
    /// Identifier of the backing model, reported in `AnalysisResponse`.
    fn model_name(&self) -> &str;

    /// Execute one gateway call. Not retried by the agent loop; transient
    /// failures are the provider's business.
    async fn create(&self, request: ResponsesRequest) -> Result<ResponsesResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_items_serialize_to_wire_shape() {
        let user = serde_json::to_value(InputItem::user_text("hi")).unwrap();
        assert_eq!(
            user,
            serde_json::json!({
                "role": "user",
                "content": [{"type": "input_text", "text": "hi"}]
            })
        );

        let fco = serde_json::to_value(InputItem::function_call_output("call_1", "{}")).unwrap();
        assert_eq!(
            fco,
            serde_json::json!({
                "type": "function_call_output",
                "call_id": "call_1",
                "output": "{}"
            })
        );
    }

    #[test]
    fn response_deserializes_mixed_output() {
        let raw = serde_json::json!({
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "function_call", "name": "load_files", "arguments": "{\"limit\":3}", "call_id": "call_1"},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "Looking at the files."}
                ]}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 7}
        });

        let resp: ResponsesResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.id, "resp_1");
        assert_eq!(resp.output.len(), 3);
        assert!(matches!(resp.output[0], OutputItem::Other));
        assert!(matches!(resp.output[1], OutputItem::FunctionCall { .. }));
        assert_eq!(resp.message_texts(), vec!["Looking at the files."]);
        assert_eq!(resp.usage.unwrap().input_tokens, 12);
    }

    #[test]
    fn missing_usage_fields_default_to_zero() {
        let resp: ResponsesResponse =
            serde_json::from_value(serde_json::json!({"id": "r", "usage": {}})).unwrap();
        let usage = resp.usage.unwrap();
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.output_tokens, 0);
    }

    #[test]
    fn concatenated_text_joins_with_blank_lines() {
        let resp: ResponsesResponse = serde_json::from_value(serde_json::json!({
            "id": "r",
            "output": [
                {"type": "message", "content": [{"type": "output_text", "text": "First."}]},
                {"type": "message", "content": [{"type": "output_text", "text": "Second."}]}
            ]
        }))
        .unwrap();
        assert_eq!(resp.concatenated_text(), "First.\n\nSecond.");
    }
}
