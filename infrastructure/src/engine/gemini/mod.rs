//! Gemini decision engine
//!
//! Calls the Gemini `generateContent` REST endpoint with the full history
//! on every invocation (the API is stateless) and the catalog as function
//! declarations. Only API-key authentication is supported.

mod types;

use super::EngineConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use toolrelay_application::{DecisionEngine, EngineError, FragmentStream};
use toolrelay_domain::{Message, ToolDescriptor};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GeminiEngine {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    system_instruction: String,
    name: String,
    /// Source of ids for function calls the API leaves unnamed
    call_counter: AtomicU64,
}

impl GeminiEngine {
    /// Build the engine from resolved configuration.
    ///
    /// Fails with [`EngineError::Configuration`] when Vertex AI mode is
    /// requested or no API key was resolved.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if config.use_vertexai {
            return Err(EngineError::Configuration(
                "Vertex AI mode is not supported; set engine.use_vertexai = false".to_string(),
            ));
        }
        let api_key = config.api_key.ok_or_else(|| {
            EngineError::Configuration(
                "no Gemini API key (set engine.api_key or the engine.api_key_env variable)"
                    .to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EngineError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            name: format!("gemini:{}", config.model),
            model: config.model,
            system_instruction: config.system_instruction,
            call_counter: AtomicU64::new(0),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl DecisionEngine for GeminiEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<FragmentStream, EngineError> {
        let body = types::build_request(history, tools, &self.system_instruction);

        debug!(
            model = %self.model,
            messages = history.len(),
            tools = tools.len(),
            "Calling Gemini generateContent"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::RequestFailed(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await.map_err(|e| {
            EngineError::InvalidResponse(format!("Gemini response is not JSON: {}", e))
        })?;

        if !status.is_success() {
            let message = types::error_message(&payload).unwrap_or("unknown error");
            return Err(EngineError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let fragments = types::parse_response(&payload, || {
            let n = self.call_counter.fetch_add(1, Ordering::Relaxed) + 1;
            format!("gemini-{}", n)
        })?;
        debug!(fragments = fragments.len(), "Gemini response parsed");

        Ok(FragmentStream::from_fragments(fragments))
    }
}
