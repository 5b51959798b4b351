//! Reasoning advisory providers
//!
//! The advisory call is a side channel: its text is shown to the operator and
//! written to the report, nothing more. Providers implement [`Advisor`] so the
//! language model behind it can be swapped or faked.

use crate::error::GatewayError;
use crate::services::Advisor;
use crate::transport::{ServiceClient, TransportPolicy};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Gemini API root
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Context handed to the advisor for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryContext {
    /// Stage name
    pub step: String,
    /// Structured stage result
    pub result: serde_json::Value,
    /// The most recent reasoning text, if any
    #[serde(default)]
    pub previous_reasoning: Option<String>,
}

impl AdvisoryContext {
    /// Context without prior reasoning
    #[must_use]
    pub fn new(step: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            step: step.into(),
            result,
            previous_reasoning: None,
        }
    }

    /// With the previous reasoning entry
    #[must_use]
    pub fn with_previous(mut self, previous: Option<String>) -> Self {
        self.previous_reasoning = previous;
        self
    }
}

/// Render the analysis prompt for a context
#[must_use]
pub fn render_prompt(context: &AdvisoryContext) -> String {
    let state = serde_json::json!({
        "step": context.step,
        "result": context.result,
    });
    let state = serde_json::to_string_pretty(&state).unwrap_or_else(|_| state.to_string());
    let previous = context.previous_reasoning.as_deref().unwrap_or("Initial state");

    format!(
        "Analyze the following migration context and provide reasoning for the next steps:\n\
         Current State: {state}\n\
         Previous Reasoning: {previous}\n\
         \n\
         Please provide:\n\
         1. Analysis of the current state\n\
         2. Potential risks and challenges\n\
         3. Recommended next steps\n\
         4. Reasoning for the recommendations\n"
    )
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Header carrying the Gemini API key
pub const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini advisory provider (`models/{model}:generateContent`)
///
/// The API key travels in a sensitive header, never in the request URL.
#[derive(Debug, Clone)]
pub struct GeminiAdvisor {
    client: ServiceClient,
    model: String,
}

impl GeminiAdvisor {
    /// Create a provider against the public Gemini API
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        policy: TransportPolicy,
    ) -> Result<Self, GatewayError> {
        Self::with_base_url(api_key, model, GEMINI_BASE_URL, policy)
    }

    /// Create with a custom base URL (for testing or proxies)
    ///
    /// # Errors
    /// Propagates client construction failures.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        policy: TransportPolicy,
    ) -> Result<Self, GatewayError> {
        let mut key = HeaderValue::try_from(api_key.into()).map_err(|_| GatewayError::Config {
            service: "advisor".to_string(),
            message: "API key is not a valid header value".to_string(),
        })?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(GEMINI_KEY_HEADER, key);

        Ok(Self {
            client: ServiceClient::with_headers("advisor", base_url, headers, policy)?,
            model: model.into(),
        })
    }

    /// Configured model
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Advisor for GeminiAdvisor {
    async fn advise(&self, context: &AdvisoryContext) -> Result<String, GatewayError> {
        let request = GenerateRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(render_prompt(context)),
                }],
            }],
        };
        let path = format!("/models/{}:generateContent", self.model);

        debug!(model = %self.model, step = %context.step, "requesting advisory reasoning");
        let response: GenerateResponse = self.client.post_json(&path, &request).await?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| GatewayError::Decode {
            service: self.client.service().to_string(),
            message: "no candidates in response".to_string(),
        })?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            return Err(GatewayError::Decode {
                service: self.client.service().to_string(),
                message: "empty candidate text".to_string(),
            });
        }
        Ok(text)
    }
}

/// Advisor used when no model is configured
///
/// Produces a short deterministic summary so the report still shows one
/// reasoning block per stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAdvisor;

#[async_trait]
impl Advisor for OfflineAdvisor {
    async fn advise(&self, context: &AdvisoryContext) -> Result<String, GatewayError> {
        let status = match context.result.get("success").and_then(serde_json::Value::as_bool) {
            Some(true) => "succeeded",
            Some(false) => "reported failures",
            None => "completed",
        };
        Ok(format!(
            "{} {status}. No reasoning model is configured; review the structured result before proceeding.",
            context.step
        ))
    }
}
