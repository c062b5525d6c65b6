//! Test doubles shared by unit and integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{
    OutputContent, OutputItem, ResponsesProvider, ResponsesRequest, ResponsesResponse, Usage,
};

/// Gateway that replays a fixed script of responses, one per call.
///
/// Calls beyond the script fail, so a test that expects N gateway calls
/// scripts exactly N responses.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<ResponsesResponse>>,
    calls: AtomicU32,
    should_fail: AtomicBool,
    model: String,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<ResponsesResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            calls: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            model: "stub-model".to_string(),
        }
    }

    /// Number of `create` calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with a request error.
    pub fn fail_from_now_on(&self) {
        self.should_fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResponsesProvider for ScriptedGateway {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn create(&self, _request: ResponsesRequest) -> Result<ResponsesResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "simulated gateway failure".to_string(),
            });
        }

        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .ok_or_else(|| LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "script exhausted".to_string(),
            })
    }
}

/// Response whose single output item is a final text message.
pub fn text_response(id: &str, text: &str, usage: (u64, u64)) -> ResponsesResponse {
    ResponsesResponse {
        id: id.to_string(),
        output: vec![OutputItem::Message {
            content: vec![OutputContent::output_text(text)],
        }],
        output_text: Some(text.to_string()),
        usage: Some(Usage {
            input_tokens: usage.0,
            output_tokens: usage.1,
        }),
    }
}

/// Response requesting one or more function calls. Each entry is
/// `(name, arguments, call_id)`.
pub fn tool_call_response(
    id: &str,
    calls: &[(&str, &str, &str)],
    usage: (u64, u64),
) -> ResponsesResponse {
    ResponsesResponse {
        id: id.to_string(),
        output: calls
            .iter()
            .map(|(name, arguments, call_id)| OutputItem::FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
                call_id: call_id.to_string(),
            })
            .collect(),
        output_text: None,
        usage: Some(Usage {
            input_tokens: usage.0,
            output_tokens: usage.1,
        }),
    }
}
