//! Anthropic legacy text-completion client.
//!
//! Talks to the `/v1/complete` endpoint, which takes one flat prompt made of
//! alternating `Human:` / `Assistant:` turns instead of a message list.
//!
//! Features:
//! - `X-API-Key` header authentication
//! - `Client` header identifying the caller
//! - Stop sequences on both turn prefixes
//! - API-level `exception` field surfaced as a rejection

use async_trait::async_trait;
use missionclaw_core::completion::{CompletionRequest, CompletionResponse, StopReason, Usage};
use missionclaw_core::error::CompletionError;
use missionclaw_core::AgentConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 300;

/// HTTP client for the legacy completion API.
pub struct AnthropicCompletionClient {
    name: String,
    api_url: String,
    api_key: String,
    client_id: String,
    client: reqwest::Client,
}

impl AnthropicCompletionClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: &AgentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            name: "anthropic".into(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            client_id: config.client_id.clone(),
            client,
        }
    }

    /// Override the endpoint (e.g., for testing or proxies).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn to_api_request(request: &CompletionRequest) -> ApiRequest<'_> {
        ApiRequest {
            model: &request.model,
            prompt: &request.prompt,
            stop_sequences: &request.stop_sequences,
            temperature: request.temperature,
            max_tokens_to_sample: request.max_tokens,
        }
    }

    /// Convert the API reply to a completion chunk.
    fn to_completion_response(resp: ApiResponse) -> std::result::Result<CompletionResponse, CompletionError> {
        if let Some(exception) = resp.exception.filter(|e| !e.is_empty()) {
            return Err(CompletionError::Rejected(exception));
        }

        let text = resp.completion.ok_or_else(|| {
            CompletionError::InvalidResponse("response has neither completion nor exception".into())
        })?;

        let stop_reason = resp
            .stop_reason
            .as_deref()
            .map(StopReason::parse)
            .unwrap_or(StopReason::StopSequence);

        let usage = match (resp.prompt_tokens, resp.completion_tokens) {
            (None, None) => None,
            (prompt, completion) => Some(Usage {
                prompt_tokens: prompt.unwrap_or(0),
                completion_tokens: completion.unwrap_or(0),
            }),
        };

        Ok(CompletionResponse {
            text,
            stop_reason,
            usage,
        })
    }
}

#[async_trait]
impl missionclaw_core::CompletionClient for AnthropicCompletionClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, CompletionError> {
        let body = Self::to_api_request(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            temperature = request.temperature,
            prompt_len = request.prompt.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Client", &self.client_id)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(e.to_string())
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(CompletionError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(CompletionError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(CompletionError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: ApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(format!("Failed to parse Anthropic response: {e}")))?;

        Self::to_completion_response(api_resp)
    }
}

// --- API types ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stop_sequences: &'a [String],
    temperature: f32,
    max_tokens_to_sample: u32,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    completion: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    exception: Option<String>,
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}
