//! LLM assessment infrastructure.
//!
//! [`ModelClient`] is the seam between the analyzer and whatever model serves
//! a model group. [`HttpModelClient`] talks to Ollama, Anthropic or OpenAI
//! endpoints configured under `[model_groups.<name>]`.

pub mod response;

pub use response::{parse_response, Sections};

use crate::config::{LlmConfig, LlmProvider};
use crate::personality::PersonalityResult;
use crate::prompt::Prompt;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// One model call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// Name of the configured model group
    pub model_group: &'a str,
    pub prompt: &'a str,
    /// Upper bound on response tokens
    pub max_tokens: u32,
}

/// LLM completion interface for personality assessment.
pub trait ModelClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

/// Send `prompt` to the model and validate its answer.
///
/// Exactly one call is made; there is no retry.
pub fn assess_with_client(
    client: &dyn ModelClient,
    model_group: &str,
    max_tokens: u32,
    prompt: &Prompt,
    sections: Sections,
) -> Result<PersonalityResult> {
    tracing::info!(
        model_group,
        prompt_tokens = prompt.estimated_tokens,
        sample_lines = prompt.sample_lines,
        "Requesting personality assessment"
    );

    let raw = client.complete(&CompletionRequest {
        model_group,
        prompt: &prompt.text,
        max_tokens,
    })?;

    let mut result = parse_response(&raw, sections).inspect_err(|e| {
        tracing::warn!(error = %e, response_len = raw.len(), "Model response rejected");
    })?;
    result.prompt_hash = Some(prompt.hash.clone());
    Ok(result)
}

/// HTTP-backed client over the configured model groups.
pub struct HttpModelClient {
    groups: HashMap<String, LlmConfig>,
    runtime: tokio::runtime::Runtime,
    http: reqwest::Client,
}

impl HttpModelClient {
    pub fn new(groups: HashMap<String, LlmConfig>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Llm(format!("failed to build tokio runtime: {e}")))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            groups,
            runtime,
            http,
        })
    }

    fn group(&self, name: &str) -> Result<&LlmConfig> {
        self.groups.get(name).ok_or_else(|| {
            Error::Config(format!(
                "model group '{}' is not defined under [model_groups]",
                name
            ))
        })
    }
}

/// Resolve the API key for a group, falling back to the provider's env var.
fn api_key(config: &LlmConfig) -> Result<Option<String>> {
    let key = match config.provider {
        LlmProvider::Ollama => return Ok(None),
        LlmProvider::Claude => config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok()),
        LlmProvider::OpenAI => config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
    };
    key.map(Some).ok_or_else(|| {
        Error::Config("model group api_key (or provider env var) is required".to_string())
    })
}

impl ModelClient for HttpModelClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let config = self.group(request.model_group)?;
        let api_key = api_key(config)?;
        let endpoint = config
            .endpoint
            .as_deref()
            .unwrap_or_else(|| config.provider.default_endpoint())
            .trim_end_matches('/')
            .to_string();
        let timeout = Duration::from_secs(config.timeout_secs.max(1));

        tracing::debug!(
            provider = ?config.provider,
            model = %config.model,
            endpoint = %endpoint,
            "Calling model"
        );

        self.runtime.block_on(async {
            match config.provider {
                LlmProvider::Ollama => {
                    let body = self
                        .post(
                            "ollama",
                            format!("{endpoint}/api/generate"),
                            HeaderMap::new(),
                            json!({
                                "model": config.model,
                                "prompt": request.prompt,
                                "stream": false,
                                "format": "json",
                                "options": {
                                    "temperature": config.temperature,
                                    "num_predict": request.max_tokens,
                                },
                            }),
                            timeout,
                        )
                        .await?;
                    body.get("response")
                        .and_then(|v| v.as_str())
                        .map(ToString::to_string)
                        .ok_or_else(|| {
                            Error::Llm(
                                "ollama response missing string field `response`".to_string(),
                            )
                        })
                }
                LlmProvider::Claude => {
                    let mut headers = HeaderMap::new();
                    headers.insert(
                        "x-api-key",
                        HeaderValue::from_str(api_key.as_deref().unwrap_or_default()).map_err(
                            |e| Error::Llm(format!("invalid claude api key header: {e}")),
                        )?,
                    );
                    headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));

                    let body = self
                        .post(
                            "claude",
                            format!("{endpoint}/v1/messages"),
                            headers,
                            json!({
                                "model": config.model,
                                "max_tokens": request.max_tokens,
                                "temperature": config.temperature,
                                "messages": [{ "role": "user", "content": request.prompt }],
                            }),
                            timeout,
                        )
                        .await?;
                    body.get("content")
                        .and_then(|v| v.as_array())
                        .and_then(|arr| arr.first())
                        .and_then(|v| v.get("text"))
                        .and_then(|v| v.as_str())
                        .map(ToString::to_string)
                        .ok_or_else(|| {
                            Error::Llm("claude response missing content[0].text".to_string())
                        })
                }
                LlmProvider::OpenAI => {
                    let mut headers = HeaderMap::new();
                    headers.insert(
                        AUTHORIZATION,
                        HeaderValue::from_str(&format!(
                            "Bearer {}",
                            api_key.as_deref().unwrap_or_default()
                        ))
                        .map_err(|e| Error::Llm(format!("invalid auth header: {e}")))?,
                    );

                    let body = self
                        .post(
                            "openai",
                            format!("{endpoint}/v1/chat/completions"),
                            headers,
                            json!({
                                "model": config.model,
                                "temperature": config.temperature,
                                "max_tokens": request.max_tokens,
                                "messages": [{ "role": "user", "content": request.prompt }],
                            }),
                            timeout,
                        )
                        .await?;
                    body.get("choices")
                        .and_then(|v| v.as_array())
                        .and_then(|arr| arr.first())
                        .and_then(|v| v.get("message"))
                        .and_then(|v| v.get("content"))
                        .and_then(|v| v.as_str())
                        .map(ToString::to_string)
                        .ok_or_else(|| {
                            Error::Llm(
                                "openai response missing choices[0].message.content".to_string(),
                            )
                        })
                }
            }
        })
    }
}

impl HttpModelClient {
    async fn post(
        &self,
        provider: &str,
        url: String,
        mut headers: HeaderMap,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("{provider} request failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Llm(format!("{provider} read body failed: {e}")))?;
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "{provider} returned {}: {}",
                status.as_u16(),
                body
            )));
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("{provider} returned invalid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MockClient {
        response: String,
        seen: Mutex<Vec<(String, u32)>>,
    }

    impl ModelClient for MockClient {
        fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((request.model_group.to_string(), request.max_tokens));
            Ok(self.response.clone())
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            text: "analyze this".to_string(),
            hash: "abc123".to_string(),
            sample_lines: 1,
            estimated_tokens: 3,
        }
    }

    #[test]
    fn assess_with_client_passes_group_and_budget() {
        let client = MockClient {
            response: r#"{"big_five":{"openness":70,"conscientiousness":60,"extraversion":40,"agreeableness":75,"neuroticism":30}}"#.to_string(),
            seen: Mutex::new(Vec::new()),
        };
        let sections = Sections {
            big_five: true,
            mbti: false,
            behavior_tags: false,
        };

        let result = assess_with_client(&client, "fast", 1024, &prompt(), sections)
            .expect("assessment should parse");
        assert_eq!(result.prompt_hash.as_deref(), Some("abc123"));
        assert_eq!(result.big_five.map(|b| b.openness), Some(70));
        assert_eq!(
            client.seen.lock().unwrap().as_slice(),
            &[("fast".to_string(), 1024)]
        );
    }

    #[test]
    fn unknown_group_is_configuration_error() {
        let client = HttpModelClient::new(HashMap::new()).unwrap();
        let err = client
            .complete(&CompletionRequest {
                model_group: "missing",
                prompt: "hi",
                max_tokens: 10,
            })
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn hosted_provider_needs_api_key() {
        let config = LlmConfig {
            provider: LlmProvider::OpenAI,
            model: "gpt-test".to_string(),
            endpoint: None,
            api_key: Some("sk-test".to_string()),
            timeout_secs: 30,
            temperature: 0.3,
        };
        assert_eq!(api_key(&config).unwrap().as_deref(), Some("sk-test"));

        let local = LlmConfig {
            provider: LlmProvider::Ollama,
            api_key: None,
            ..config
        };
        assert_eq!(api_key(&local).unwrap(), None);
    }
}
