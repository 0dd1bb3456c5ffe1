//! Client for servers that speak the OpenAI completions and
//! chat-completions APIs: a local vLLM deployment, OpenAI or SiliconFlow.
//!
//! Raw generation uses `POST {base}/completions`; chat uses
//! `POST {base}/chat/completions`.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::time::Duration;

use crate::backend::{ChatBackend, Generator, with_retry};
use crate::error::{LlmError, RateLimitInfo, Result};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, FinishReason, Generation, SamplingParams, Usage,
};

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const VLLM_BASE: &str = "http://localhost:8000/v1";
const SILICONFLOW_BASE: &str = "https://api.siliconflow.cn/v1";

/// Long reasoning rounds can take minutes on a local server.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for an OpenAI-compatible server.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Sent as a bearer token when set. Local servers usually need none.
    pub api_key: Option<String>,
    pub base_url: String,
    /// When set, replaces the model named in each request.
    pub model: Option<String>,
    pub timeout: Duration,
    /// Retries for network failures and rate limits only.
    pub max_retries: u32,
    /// First retry delay; doubles on each attempt.
    pub retry_backoff: Duration,
    /// Label used in logs.
    pub name: String,
}

impl OpenAiConfig {
    fn preset(name: &str, base_url: &str, api_key: Option<String>, max_retries: u32) -> Self {
        Self {
            api_key,
            base_url: base_url.to_string(),
            model: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries,
            retry_backoff: Duration::from_millis(500),
            name: name.to_string(),
        }
    }

    fn key_from_env(var: &str) -> Result<String> {
        std::env::var(var)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::Config(format!("{var} is not set")))
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::preset("openai", OPENAI_BASE, Some(api_key.into()), 3)
    }

    /// A local vLLM server. Retries are off so a failed generation ends the
    /// run.
    pub fn vllm() -> Self {
        Self::preset("vllm", VLLM_BASE, None, 0)
    }

    pub fn siliconflow(api_key: impl Into<String>) -> Self {
        Self::preset("siliconflow", SILICONFLOW_BASE, Some(api_key.into()), 3)
            .with_model("Qwen/Qwen3-30B-A3B-Instruct-2507")
    }

    /// [`Self::openai`] with the key from `OPENAI_API_KEY`.
    pub fn openai_from_env() -> Result<Self> {
        Self::key_from_env("OPENAI_API_KEY").map(|key| Self::openai(key))
    }

    /// [`Self::siliconflow`] with the key from `SILICONFLOW_API_KEY`.
    pub fn siliconflow_from_env() -> Result<Self> {
        Self::key_from_env("SILICONFLOW_API_KEY").map(|key| Self::siliconflow(key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────────────────

/// [`Generator`] and [`ChatBackend`] over HTTP.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a backend pointing at a local vLLM server.
    pub fn vllm() -> Result<Self> {
        Self::new(OpenAiConfig::vllm())
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn chat_completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Resolve the model name for a request.
    fn model_for(&self, requested: &str) -> Result<String> {
        match (&self.config.model, requested.is_empty()) {
            (Some(model), _) => Ok(model.clone()),
            (None, false) => Ok(requested.to_string()),
            (None, true) => Err(LlmError::Config(format!(
                "no model configured for backend '{}'",
                self.config.name
            ))),
        }
    }

    fn to_completion_request(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<CompletionApiRequest> {
        Ok(CompletionApiRequest {
            model: self.model_for("")?,
            prompt: prompt.to_string(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stop: if params.stop.is_empty() {
                None
            } else {
                Some(params.stop.clone())
            },
            skip_special_tokens: params.skip_special_tokens,
        })
    }

    fn to_chat_request(&self, request: &ChatRequest) -> Result<ChatApiRequest> {
        Ok(ChatApiRequest {
            model: self.model_for(&request.model)?,
            messages: request.messages.iter().map(ApiMessage::from).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        })
    }

    /// Turn a non-success response into a typed error.
    async fn handle_error_response(response: Response) -> LlmError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        match status.as_u16() {
            401 | 403 => LlmError::Auth(message),
            429 => {
                LlmError::RateLimit(RateLimitInfo::from_header(message, retry_after.as_deref()))
            }
            400..=499 => LlmError::InvalidRequest(message),
            _ => LlmError::Backend(message),
        }
    }

    async fn post_json<B, R>(&self, url: String, body: &B) -> Result<R>
    where
        B: serde::Serialize + Sync,
        R: serde::de::DeserializeOwned + Send,
    {
        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            &self.config.name,
            || async {
                let response = self
                    .authorize(self.client.post(&url))
                    .json(body)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(Self::handle_error_response(response).await);
                }

                let text = response.text().await?;
                serde_json::from_str::<R>(&text).map_err(LlmError::from)
            },
        )
        .await
    }
}

#[async_trait]
impl Generator for OpenAiBackend {
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<Generation> {
        let request = self.to_completion_request(prompt, params)?;

        tracing::debug!(
            backend = %self.config.name,
            model = %request.model,
            prompt_chars = prompt.len(),
            max_tokens = params.max_tokens,
            stop = ?params.stop,
            "Sending completion request"
        );

        let response: CompletionApiResponse =
            self.post_json(self.completions_url(), &request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Backend("completion response has no choices".to_string()))?;

        Ok(Generation {
            prompt: prompt.to_string(),
            text: choice.text,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            usage: response.usage.map(Usage::from),
        })
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let api_request = self.to_chat_request(&request)?;

        tracing::debug!(
            backend = %self.config.name,
            model = %api_request.model,
            messages = api_request.messages.len(),
            "Sending chat request"
        );

        let response: ChatApiResponse = self
            .post_json(self.chat_completions_url(), &api_request)
            .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Backend("chat response has no choices".to_string()))?;

        Ok(ChatResponse {
            model: response.model.unwrap_or(api_request.model),
            content: choice.message.content.unwrap_or_default(),
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            usage: response.usage.map(Usage::from),
        })
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI API Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct CompletionApiRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    /// vLLM extension; other servers ignore it.
    skip_special_tokens: bool,
}

#[derive(Debug, serde::Deserialize)]
struct CompletionApiResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, serde::Deserialize)]
struct CompletionChoice {
    text: String,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct ChatApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, serde::Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for ApiMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ChatApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, serde::Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(usage: ApiUsage) -> Self {
        Usage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, serde::Deserialize)]
struct ApiError {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(config: OpenAiConfig) -> OpenAiBackend {
        OpenAiBackend::new(config).unwrap()
    }

    #[test]
    fn test_presets() {
        let vllm = OpenAiConfig::vllm();
        assert_eq!(vllm.base_url, "http://localhost:8000/v1");
        assert!(vllm.api_key.is_none());
        assert_eq!(vllm.max_retries, 0);

        let sf = OpenAiConfig::siliconflow("key");
        assert_eq!(sf.base_url, "https://api.siliconflow.cn/v1");
        assert_eq!(sf.api_key.as_deref(), Some("key"));
        assert!(sf.model.is_some());
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let b = backend(OpenAiConfig::vllm().with_base_url("http://gpu:9000/v1/"));
        assert_eq!(b.completions_url(), "http://gpu:9000/v1/completions");
        assert_eq!(b.chat_completions_url(), "http://gpu:9000/v1/chat/completions");
    }

    #[test]
    fn test_completion_request_body() {
        let b = backend(OpenAiConfig::vllm().with_model("/model/Qwen3-14B"));
        let params = SamplingParams::new(100)
            .with_stop("</think>")
            .keep_special_tokens();

        let request = b.to_completion_request("<prompt>", &params).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "/model/Qwen3-14B");
        assert_eq!(json["prompt"], "<prompt>");
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["stop"][0], "</think>");
        assert_eq!(json["skip_special_tokens"], false);
    }

    #[test]
    fn test_completion_request_omits_empty_stop() {
        let b = backend(OpenAiConfig::vllm().with_model("m"));
        let request = b
            .to_completion_request("p", &SamplingParams::new(4))
            .unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn test_completion_request_requires_model() {
        let b = backend(OpenAiConfig::vllm());
        let result = b.to_completion_request("p", &SamplingParams::new(4));
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    fn test_chat_request_model_resolution() {
        let b = backend(OpenAiConfig::openai("k"));
        let request = ChatRequest::new(
            "gpt-4o-mini",
            vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
        );
        let api = b.to_chat_request(&request).unwrap();
        assert_eq!(api.model, "gpt-4o-mini");
        assert_eq!(api.messages[0].role, "system");
        assert_eq!(api.messages[1].content, "hi");

        let b = backend(OpenAiConfig::openai("k").with_model("override"));
        assert_eq!(b.to_chat_request(&request).unwrap().model, "override");
    }

    #[test]
    fn test_parse_completion_response() {
        let body = r#"{
            "id": "cmpl-1",
            "choices": [{"index": 0, "text": "<think>\nhmm", "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let parsed: CompletionApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].text, "<think>\nhmm");
        assert_eq!(parsed.usage.unwrap().completion_tokens, 3);
    }

    #[test]
    fn test_parse_chat_response_null_content() {
        let body = r#"{
            "model": "qwen",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": null}, "finish_reason": "length"}]
        }"#;
        let parsed: ChatApiResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert_eq!(parsed.choices[0].finish_reason.as_deref(), Some("length"));
    }

    #[tokio::test]
    async fn test_generate_connection_refused_is_network_error() {
        let b = backend(
            OpenAiConfig::vllm()
                .with_base_url("http://127.0.0.1:9/v1")
                .with_model("m")
                .with_timeout(Duration::from_secs(2)),
        );
        let result = b.generate("hi", &SamplingParams::new(1)).await;
        assert!(matches!(result, Err(LlmError::Network(_))));
    }

    // ─────────────────────────────────────────────────────────────────────
    // HTTP status mapping
    // ─────────────────────────────────────────────────────────────────────

    fn error_body(message: &str) -> serde_json::Value {
        serde_json::json!({"error": {"message": message, "type": "error"}})
    }

    fn stub_backend(server: &MockServer, max_retries: u32) -> OpenAiBackend {
        let mut config = OpenAiConfig::vllm()
            .with_base_url(format!("{}/v1", server.uri()))
            .with_model("m")
            .with_max_retries(max_retries);
        config.retry_backoff = Duration::from_millis(1);
        backend(config)
    }

    async fn generate_with_status(template: ResponseTemplate, max_retries: u32) -> LlmError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(template)
            .mount(&server)
            .await;

        stub_backend(&server, max_retries)
            .generate("hi", &SamplingParams::new(1))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth() {
        let err = generate_with_status(
            ResponseTemplate::new(401).set_body_json(error_body("Invalid API key")),
            0,
        )
        .await;
        assert!(matches!(&err, LlmError::Auth(msg) if msg == "Invalid API key"));

        let err = generate_with_status(ResponseTemplate::new(403), 0).await;
        assert!(matches!(err, LlmError::Auth(_)));
    }

    #[tokio::test]
    async fn test_too_many_requests_maps_to_rate_limit() {
        let err = generate_with_status(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "2")
                .set_body_json(error_body("slow down")),
            0,
        )
        .await;
        assert!(matches!(&err, LlmError::RateLimit(info) if info.message == "slow down"));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_bad_request_maps_to_invalid_request() {
        let err = generate_with_status(
            ResponseTemplate::new(400).set_body_json(error_body("max_tokens must be at least 1")),
            0,
        )
        .await;
        assert!(
            matches!(&err, LlmError::InvalidRequest(msg) if msg == "max_tokens must be at least 1")
        );
    }

    #[tokio::test]
    async fn test_server_error_maps_to_backend() {
        let err = generate_with_status(
            ResponseTemplate::new(500).set_body_string("CUDA out of memory"),
            0,
        )
        .await;
        match err {
            LlmError::Backend(msg) => {
                assert!(msg.contains("500"), "{msg}");
                assert!(msg.contains("CUDA out of memory"), "{msg}");
            }
            other => panic!("expected Backend, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(error_body("boom")))
            .expect(1)
            .mount(&server)
            .await;

        let err = stub_backend(&server, 3)
            .generate("hi", &SamplingParams::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Backend(_)));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "0")
                    .set_body_json(error_body("slow down")),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "m",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "ok"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")]);
        let response = stub_backend(&server, 2).chat(request).await.unwrap();
        assert_eq!(response.content, "ok");
        server.verify().await;
    }
}
