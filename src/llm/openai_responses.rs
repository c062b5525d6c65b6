//! HTTP provider for the OpenAI Responses API.
//!
//! Works against both standard OpenAI-compatible hosts (Bearer auth) and
//! Azure OpenAI resources (`api-key` header + `api-version` query parameter);
//! the distinction is resolved once at configuration time.
//!
//! Transient failures (connection errors, 408/429/5xx) are retried here with
//! exponential backoff. The agent loop never retries; callers see either a
//! parsed response or an [`LlmError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::{AuthStyle, LlmConfig};
use crate::error::LlmError;
use crate::llm::{InputItem, ResponsesProvider, ResponsesRequest, ResponsesResponse};
use crate::tools::ToolSchema;

const PROVIDER: &str = "openai_responses";
const DEFAULT_MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

/// Reqwest-based [`ResponsesProvider`] over `POST {base}/responses`.
pub struct OpenAiResponsesProvider {
    client: Client,
    config: LlmConfig,
    max_retries: u32,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    tools: &'a [ToolSchema],
    input: &'a [InputItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<&'a str>,
}

impl OpenAiResponsesProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            config,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, url: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let req = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);

        match &self.config.auth {
            AuthStyle::Bearer => req.bearer_auth(self.config.api_key.expose_secret()),
            AuthStyle::AzureApiKey { api_version } => req
                .header("api-key", self.config.api_key.expose_secret())
                .query(&[("api-version", api_version.as_str())]),
        }
    }

    async fn send_request(
        &self,
        body: &serde_json::Value,
    ) -> Result<ResponsesResponse, LlmError> {
        let url = self.api_url();

        for attempt in 0..=self.max_retries {
            tracing::debug!("Sending request to {} (attempt {})", url, attempt + 1);

            let response = match self.build_request(&url, body).send().await {
                Ok(r) => r,
                Err(e) => {
                    if attempt < self.max_retries {
                        let delay = retry_backoff_delay(attempt);
                        tracing::warn!(
                            "Responses request error (attempt {}/{}), retrying in {:?}: {}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay,
                            e,
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(LlmError::RequestFailed {
                        provider: PROVIDER.to_string(),
                        reason: e.to_string(),
                    });
                }
            };

            let status = response.status();
            if response.content_length().unwrap_or(0) > MAX_RESPONSE_BYTES {
                return Err(LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("Response too large (max {MAX_RESPONSE_BYTES} bytes)"),
                });
            }
            let response_text = response.text().await.unwrap_or_default();
            if response_text.len() as u64 > MAX_RESPONSE_BYTES {
                return Err(LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("Response too large (max {MAX_RESPONSE_BYTES} bytes)"),
                });
            }

            if !status.is_success() {
                let status_code = status.as_u16();

                if status_code == 401 {
                    return Err(LlmError::AuthFailed {
                        provider: PROVIDER.to_string(),
                    });
                }

                if is_retryable_status(status_code) && attempt < self.max_retries {
                    let delay = retry_backoff_delay(attempt);
                    tracing::warn!(
                        "Responses endpoint returned HTTP {} (attempt {}/{}), retrying in {:?}",
                        status_code,
                        attempt + 1,
                        self.max_retries + 1,
                        delay,
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                if status_code == 429 {
                    return Err(LlmError::RateLimited {
                        provider: PROVIDER.to_string(),
                    });
                }

                return Err(LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("HTTP {}: {}", status, truncate_body(&response_text, 2000)),
                });
            }

            return serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: format!("JSON parse error: {}. Raw: {}", e, truncate_body(&response_text, 2000)),
            });
        }

        Err(LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: "retry loop exited unexpectedly".to_string(),
        })
    }
}

#[async_trait]
impl ResponsesProvider for OpenAiResponsesProvider {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn create(&self, request: ResponsesRequest) -> Result<ResponsesResponse, LlmError> {
        let body = serde_json::to_value(ApiRequest {
            model: &self.config.model,
            instructions: &request.instructions,
            tools: &request.tools,
            input: &request.input,
            previous_response_id: request.previous_response_id.as_deref(),
        })
        .map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to serialize request: {e}"),
        })?;

        self.send_request(&body).await
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

fn retry_backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(500 * 2u64.saturating_pow(attempt))
}

/// Cut an error/debug body to a byte-length prefix on a char boundary,
/// noting the original size. Distinct from the plain char-count cut used
/// for step summaries.
fn truncate_body(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &s[..cut], s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config(base_url: &str, auth: AuthStyle) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            api_key: SecretString::from("test-key"),
            model: "gpt-4.1-mini".to_string(),
            auth,
        }
    }

    #[test]
    fn api_url_appends_responses() {
        let provider =
            OpenAiResponsesProvider::new(config("https://api.openai.com/v1", AuthStyle::Bearer))
                .unwrap();
        assert_eq!(provider.api_url(), "https://api.openai.com/v1/responses");
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
    }

    #[test]
    fn backoff_grows_exponentially() {
        assert_eq!(retry_backoff_delay(0), Duration::from_millis(500));
        assert_eq!(retry_backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(retry_backoff_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn request_body_omits_absent_continuation_token() {
        let body = serde_json::to_value(ApiRequest {
            model: "m",
            instructions: "i",
            tools: &[],
            input: &[],
            previous_response_id: None,
        })
        .unwrap();
        assert!(body.get("previous_response_id").is_none());
    }

    #[test]
    fn truncate_body_is_char_safe() {
        let s = "héllo wörld";
        let t = truncate_body(s, 3);
        assert!(t.starts_with("hé") || t.starts_with("h"));
    }
}
