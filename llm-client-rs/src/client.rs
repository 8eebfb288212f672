// llm-client-rs/src/client.rs
//
// HTTP Client for interacting with LLM providers (OpenAI-compatible API)
//
// This module provides:
// - Real HTTP calls to chat-completions endpoints via reqwest
// - Function-calling (tool) request and response plumbing
// - Exponential backoff retry mechanism for resilient operation
// - Proper error handling with classification of retryable vs. non-retryable errors
// - Configuration via environment variables
//
// Configuration (.env file):
// - GEMINI_API_KEY / LLM_API_KEY: API key for the model provider
// - LLM_API_URL: chat-completions endpoint URL (defaults to the Gemini
//   OpenAI-compatibility endpoint)
// - LLM_MODEL: model to use (default: "gemini-2.5-flash")
// - LLM_REQUEST_TIMEOUT_SECS: per-request HTTP timeout (default: 60)
// - LLM_MAX_RETRIES: maximum number of retry attempts (default: 3)
// - LLM_INITIAL_RETRY_DELAY_MS: initial delay between retries in ms (default: 1000)
// - LLM_MAX_RETRY_DELAY_MS: maximum delay between retries in ms (default: 30000)

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One message in a chat exchange. Assistant messages may carry tool-call
/// requests instead of (or alongside) text content; tool messages carry the
/// observation for one executed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Observation message answering one tool call.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Tool calls requested by an assistant message, empty when none.
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, exactly as the model produced it
    pub arguments: String,
}

/// Schema advertised to the model for one callable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the parameters
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSchema>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// The first choice's message; responses without choices are rejected
    /// during parsing, so this is always present on a returned response.
    pub fn message(&self) -> &ChatMessage {
        &self.choices[0].message
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub total_tokens: u32,
}

// Custom error type for model client operations
// This enum distinguishes between different types of errors to help with retry decisions
#[derive(Debug, Error)]
pub enum LlmError {
    // Non-retryable errors - these require intervention
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),
    #[error("Parse error: {0}")]
    ParseError(String),

    // Retryable errors - these are automatically retried with exponential backoff
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl LlmError {
    /// Whether the retry mechanism should attempt another request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ServerError(_)
                | LlmError::NetworkError(_)
                | LlmError::Timeout(_)
                | LlmError::RateLimitExceeded(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_retries: u32,
    initial_retry_delay_ms: u64,
    max_retry_delay_ms: u64,
}

/// Builder for [`LlmClient`], used directly in tests and by `from_env`.
#[derive(Debug, Default)]
pub struct LlmClientBuilder {
    api_key: Option<String>,
    api_url: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    initial_retry_delay_ms: Option<u64>,
    max_retry_delay_ms: Option<u64>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn initial_retry_delay_ms(mut self, delay: u64) -> Self {
        self.initial_retry_delay_ms = Some(delay);
        self
    }

    pub fn max_retry_delay_ms(mut self, delay: u64) -> Self {
        self.max_retry_delay_ms = Some(delay);
        self
    }

    pub fn build(self) -> Result<LlmClient, LlmError> {
        let client = Client::builder()
            .timeout(self.timeout.unwrap_or_else(config_rs::get_llm_request_timeout))
            .build()
            .map_err(|e| LlmError::UnknownError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(LlmClient {
            client,
            api_key: self.api_key.unwrap_or_default(),
            api_url: self.api_url.unwrap_or_else(config_rs::get_llm_api_url),
            model: self.model.unwrap_or_else(config_rs::get_llm_model),
            max_retries: self
                .max_retries
                .unwrap_or_else(config_rs::get_llm_max_retries),
            initial_retry_delay_ms: self
                .initial_retry_delay_ms
                .unwrap_or_else(config_rs::get_llm_initial_retry_delay_ms),
            max_retry_delay_ms: self
                .max_retry_delay_ms
                .unwrap_or_else(config_rs::get_llm_max_retry_delay_ms),
        })
    }
}

impl LlmClient {
    /// Creates a client configured entirely from environment variables.
    ///
    /// A missing API key is logged but does not fail construction; requests
    /// will then fail with `InvalidRequest`, which the pipeline absorbs.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = match config_rs::get_llm_api_key() {
            Some(key) => key,
            None => {
                log::warn!("No model API key configured (GEMINI_API_KEY / LLM_API_KEY). API calls will fail.");
                String::new()
            }
        };

        LlmClientBuilder::new().api_key(api_key).build()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if the client has an API key to send.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Creates an exponential backoff policy with jitter
    ///
    /// 1. Start with the initial delay
    /// 2. After each failed attempt, multiply the delay by the multiplier (2.0)
    /// 3. Add randomized jitter to prevent "thundering herd" problems
    /// 4. Cap the maximum delay at max_retry_delay_ms
    /// 5. Cap the total elapsed retry time at 2 minutes
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_retry_delay_ms))
            .with_max_interval(Duration::from_millis(self.max_retry_delay_ms))
            .with_multiplier(2.0)
            .with_max_elapsed_time(Some(Duration::from_secs(120)))
            .with_randomization_factor(0.5)
            .build()
    }

    /// Send one chat-completion request with exponential backoff retry.
    ///
    /// # Returns
    /// * `Ok(ChatCompletionResponse)` - at least one choice is guaranteed
    /// * `Err(LlmError)` - categorized error after retries are exhausted
    pub async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let mut backoff = self.create_backoff();
        let mut attempt = 0;

        log::debug!(
            "Preparing chat completion to {} (model: {}, {} messages)",
            self.api_url,
            request.model,
            request.messages.len()
        );

        loop {
            attempt += 1;

            if attempt > 1 {
                log::info!("Retry attempt {} for chat completion", attempt);
            }

            match self.execute_request(&request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    // Stop retrying if the error is not retryable or we've
                    // exhausted the attempt budget
                    if !err.is_retryable() || attempt > self.max_retries {
                        log::error!("Chat completion failed after {} attempt(s): {}", attempt, err);
                        return Err(err);
                    }

                    if let Some(backoff_duration) = backoff.next_backoff() {
                        log::warn!("Retryable error: {}. Retrying in {:?}", err, backoff_duration);

                        // Small random jitter so concurrent clients don't retry in lockstep
                        let jitter = rand::thread_rng().gen_range(0..=200);
                        let jittered_duration = backoff_duration + Duration::from_millis(jitter);

                        tokio::time::sleep(jittered_duration).await;
                    } else {
                        log::error!("Exceeded maximum backoff time: {}", err);
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Convenience wrapper filling in the configured model name.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolSchema>>,
        temperature: f32,
    ) -> Result<ChatCompletionResponse, LlmError> {
        self.chat_completion(ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(temperature),
            max_tokens: Some(2048),
            tools,
        })
        .await
    }

    // Execute a single request attempt
    async fn execute_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::InvalidRequest("API key is not set".to_string()));
        }

        let response = match self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                // Categorize network errors
                if err.is_timeout() {
                    return Err(LlmError::Timeout(format!("Request timed out: {}", err)));
                } else if err.is_connect() {
                    return Err(LlmError::NetworkError(format!("Connection failed: {}", err)));
                } else {
                    return Err(LlmError::NetworkError(format!("Network error: {}", err)));
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            return match status.as_u16() {
                400 => Err(LlmError::InvalidRequest(format!("Bad request: {}", text))),
                401 => Err(LlmError::InvalidRequest(format!("Unauthorized: {}", text))),
                403 => Err(LlmError::InvalidRequest(format!("Forbidden: {}", text))),
                404 => Err(LlmError::ModelNotAvailable(format!("Not found: {}", text))),
                429 => Err(LlmError::RateLimitExceeded(format!(
                    "Rate limit exceeded: {}",
                    text
                ))),
                // Server errors - retryable
                500 | 502 | 503 | 504 => Err(LlmError::ServerError(format!(
                    "Server error ({}): {}",
                    status, text
                ))),
                _ => Err(LlmError::UnknownError(format!(
                    "Unknown error ({}): {}",
                    status, text
                ))),
            };
        }

        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::ParseError(format!("Failed to parse response: {}", err)))?;

        if data.choices.is_empty() {
            return Err(LlmError::ParseError(
                "No choices returned in response".to_string(),
            ));
        }

        if let Some(usage) = &data.usage {
            log::debug!("Chat completion used {} tokens", usage.total_tokens);
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> LlmClient {
        LlmClientBuilder::new()
            .api_key("test-key")
            .api_url(format!("{}/chat/completions", server.uri()))
            .model("gemini-2.5-flash")
            .timeout(Duration::from_secs(5))
            .max_retries(0)
            .initial_retry_delay_ms(1)
            .build()
            .unwrap()
    }

    fn text_response(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                {
                    "message": { "role": "assistant", "content": content },
                    "finish_reason": "stop"
                }
            ],
            "usage": { "total_tokens": 42 }
        })
    }

    #[tokio::test]
    async fn test_chat_completion_returns_message_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("{\"ok\":true}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let response = client
            .chat(vec![ChatMessage::user("diagnose")], None, 0.1)
            .await
            .unwrap();

        assert_eq!(response.message().text(), "{\"ok\":true}");
        assert!(response.message().requested_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn test_chat_completion_parses_tool_calls() {
        let server = MockServer::start().await;

        let body = json!({
            "choices": [
                {
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [
                            {
                                "id": "call_1",
                                "type": "function",
                                "function": {
                                    "name": "consultar_saude_componentes",
                                    "arguments": "{\"veiculo_id\": 1}"
                                }
                            }
                        ]
                    },
                    "finish_reason": "tool_calls"
                }
            ]
        });

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let tools = vec![ToolSchema::function(
            "consultar_saude_componentes",
            "Saúde dos componentes de um veículo",
            json!({
                "type": "object",
                "properties": { "veiculo_id": { "type": "integer" } },
                "required": ["veiculo_id"]
            }),
        )];

        let response = client
            .chat(vec![ChatMessage::user("avalie o veículo 1")], Some(tools), 0.2)
            .await
            .unwrap();

        let calls = response.message().requested_tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "consultar_saude_componentes");
        assert_eq!(calls[0].function.arguments, "{\"veiculo_id\": 1}");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClientBuilder::new()
            .api_key("test-key")
            .api_url(format!("{}/chat/completions", server.uri()))
            .model("gemini-2.5-flash")
            .max_retries(3)
            .initial_retry_delay_ms(1)
            .build()
            .unwrap();

        let err = client
            .chat(vec![ChatMessage::user("oi")], None, 0.1)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::InvalidRequest(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_budget_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(3)
            .mount(&server)
            .await;

        let client = LlmClientBuilder::new()
            .api_key("test-key")
            .api_url(format!("{}/chat/completions", server.uri()))
            .model("gemini-2.5-flash")
            .max_retries(2)
            .initial_retry_delay_ms(1)
            .max_retry_delay_ms(2)
            .build()
            .unwrap();

        let err = client
            .chat(vec![ChatMessage::user("oi")], None, 0.1)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::ServerError(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_retryable_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .chat(vec![ChatMessage::user("oi")], None, 0.1)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::RateLimitExceeded(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let client = LlmClientBuilder::new()
            .api_url("http://127.0.0.1:9/chat/completions")
            .model("gemini-2.5-flash")
            .build()
            .unwrap();

        assert!(!client.is_configured());
        let err = client
            .chat(vec![ChatMessage::user("oi")], None, 0.1)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }
}
