//! Environment-driven configuration.
//!
//! All settings come from the process environment (with `.env` support via
//! `dotenvy` in the binary). The gateway endpoint is normalized here so the
//! provider never has to care whether it talks to Azure OpenAI or a standard
//! OpenAI-compatible host.

use std::path::PathBuf;

use secrecy::SecretString;
use url::Url;

use crate::agent::AnswerContract;
use crate::error::ConfigError;

/// Hard ceiling on the per-request step budget. Requests asking for more are
/// rejected before the loop starts.
pub const MAX_STEPS_CEILING: u32 = 20;

const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_API_VERSION: &str = "2024-09-01-preview";
const DEFAULT_MAX_STEPS: u32 = 10;

/// How the provider authenticates against the endpoint.
#[derive(Debug, Clone)]
pub enum AuthStyle {
    /// Standard `Authorization: Bearer` header.
    Bearer,
    /// Azure OpenAI: `api-key` header plus an `api-version` query parameter.
    AzureApiKey { api_version: String },
}

/// Gateway connection settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Normalized base URL, ending in the API version segment (e.g. `/v1`).
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    pub auth: AuthStyle,
}

/// Agent loop settings.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Step budget used when a request does not override it.
    pub default_max_steps: u32,
    /// Upper bound on any per-request override.
    pub max_steps_ceiling: u32,
    /// Which final-answer contract the model is instructed to follow.
    pub contract: AnswerContract,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_max_steps: DEFAULT_MAX_STEPS,
            max_steps_ceiling: MAX_STEPS_CEILING,
            contract: AnswerContract::default(),
        }
    }
}

/// Full resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    /// When set, sessions persist to this JSON file; otherwise in-memory.
    pub session_store_path: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = required_env("AZURE_OPENAI_ENDPOINT")?;
        let api_key = required_env("AZURE_OPENAI_API_KEY")?;
        let model = optional_env("AZURE_OPENAI_MODEL")?.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_version = optional_env("AZURE_OPENAI_API_VERSION")?
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let (base_url, auth) = normalize_endpoint(&endpoint, &api_version)?;

        let default_max_steps = optional_env("AGENT_MAX_STEPS")?
            .map(|s| s.parse::<u32>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "AGENT_MAX_STEPS".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?
            .unwrap_or(DEFAULT_MAX_STEPS);
        if default_max_steps == 0 || default_max_steps > MAX_STEPS_CEILING {
            return Err(ConfigError::InvalidValue {
                key: "AGENT_MAX_STEPS".to_string(),
                message: format!("must be between 1 and {MAX_STEPS_CEILING}"),
            });
        }

        let contract = optional_env("AGENT_ANSWER_CONTRACT")?
            .map(|s| s.parse::<AnswerContract>())
            .transpose()
            .map_err(|message| ConfigError::InvalidValue {
                key: "AGENT_ANSWER_CONTRACT".to_string(),
                message,
            })?
            .unwrap_or_default();

        let session_store_path = optional_env("SESSION_STORE_PATH")?.map(PathBuf::from);

        Ok(Self {
            llm: LlmConfig {
                base_url,
                api_key: SecretString::from(api_key),
                model,
                auth,
            },
            agent: AgentConfig {
                default_max_steps,
                max_steps_ceiling: MAX_STEPS_CEILING,
                contract,
            },
            session_store_path,
        })
    }
}

/// Normalize an endpoint URL into a versioned base URL plus an auth style.
///
/// Azure resources (`*.openai.azure.com`) expect the key in an `api-key`
/// header and an `api-version` query parameter; everything else gets a
/// Bearer token and a base ending in `/v1`.
pub(crate) fn normalize_endpoint(
    endpoint: &str,
    api_version: &str,
) -> Result<(String, AuthStyle), ConfigError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::MissingKey {
            key: "AZURE_OPENAI_ENDPOINT".to_string(),
        });
    }

    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        key: "AZURE_OPENAI_ENDPOINT".to_string(),
        message: format!("not a valid URL: {e}"),
    })?;
    let host = url.host_str().unwrap_or("");

    if host.ends_with("openai.azure.com") {
        let resource = strip_known_suffixes(trimmed);
        Ok((
            format!("{resource}/openai/v1"),
            AuthStyle::AzureApiKey {
                api_version: api_version.to_string(),
            },
        ))
    } else if host == "api.openai.com" {
        Ok(("https://api.openai.com/v1".to_string(), AuthStyle::Bearer))
    } else {
        let base = if let Some(prefix) = trimmed.strip_suffix("/openai/v1") {
            format!("{prefix}/v1")
        } else if let Some(prefix) = trimmed.strip_suffix("/openai") {
            format!("{prefix}/v1")
        } else if trimmed.ends_with("/v1") {
            trimmed.to_string()
        } else {
            format!("{trimmed}/v1")
        };
        Ok((base, AuthStyle::Bearer))
    }
}

/// Repeatedly strip any trailing `/openai/v1`, `/openai`, or `/v1` segment.
fn strip_known_suffixes(url: &str) -> String {
    let mut value = url.trim_end_matches('/').to_string();
    loop {
        let mut changed = false;
        for suffix in ["/openai/v1", "/openai", "/v1"] {
            if let Some(prefix) = value.strip_suffix(suffix) {
                value = prefix.trim_end_matches('/').to_string();
                changed = true;
            }
        }
        if !changed {
            return value;
        }
    }
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    optional_env(key)?.ok_or_else(|| ConfigError::MissingKey {
        key: key.to_string(),
    })
}

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value is not valid UTF-8".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(endpoint: &str) -> String {
        normalize_endpoint(endpoint, "2024-09-01-preview").unwrap().0
    }

    #[test]
    fn azure_endpoint_gets_api_key_auth() {
        let (base, auth) =
            normalize_endpoint("https://myres.openai.azure.com/openai/v1/", "preview").unwrap();
        assert_eq!(base, "https://myres.openai.azure.com/openai/v1");
        match auth {
            AuthStyle::AzureApiKey { api_version } => assert_eq!(api_version, "preview"),
            AuthStyle::Bearer => panic!("expected Azure auth"),
        }
    }

    #[test]
    fn azure_endpoint_without_suffix() {
        assert_eq!(
            base("https://myres.openai.azure.com"),
            "https://myres.openai.azure.com/openai/v1"
        );
    }

    #[test]
    fn standard_openai_host_uses_default_base() {
        let (base, auth) = normalize_endpoint("https://api.openai.com/weird/path", "v").unwrap();
        assert_eq!(base, "https://api.openai.com/v1");
        assert!(matches!(auth, AuthStyle::Bearer));
    }

    #[test]
    fn compatible_host_gains_v1_suffix() {
        assert_eq!(base("http://localhost:8080"), "http://localhost:8080/v1");
        assert_eq!(base("http://localhost:8080/v1"), "http://localhost:8080/v1");
        assert_eq!(base("http://localhost:8080/openai"), "http://localhost:8080/v1");
        assert_eq!(
            base("http://localhost:8080/openai/v1"),
            "http://localhost:8080/v1"
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = normalize_endpoint("not a url", "v").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
