use crate::config::Settings;
use crate::llm::error::ProviderError;
use crate::llm::{EndpointConnector, GenerateRequest, TextModel};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Shared HTTP state for every Gemini model bound through it.
#[derive(Clone)]
pub struct GeminiConnector {
    http: reqwest::Client,
    api_key: Arc<str>,
    base_url: Arc<str>,
}

impl std::fmt::Debug for GeminiConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConnector")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiConnector {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(api_key, base_url, Duration::from_secs(timeout_secs))
    }

    pub fn new(api_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini http client")?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }
}

impl EndpointConnector for GeminiConnector {
    fn connect(&self, model_id: &str) -> Result<Arc<dyn TextModel>, ProviderError> {
        let model = model_id.trim().trim_start_matches("models/");
        if model.is_empty() {
            return Err(ProviderError::stage("connect", "empty model identifier"));
        }
        Ok(Arc::new(GeminiModel {
            connector: self.clone(),
            model: model.to_string(),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct GeminiModel {
    connector: GeminiConnector,
    model: String,
}

impl GeminiModel {
    fn url(&self) -> String {
        generate_content_url(&self.connector.base_url, &self.model)
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.connector.api_key)
            .map_err(|_| ProviderError::stage("request", "API key is not a valid header value"))?;
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl TextModel for GeminiModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_text(&self, req: GenerateRequest) -> Result<String, ProviderError> {
        let body = GenerateContentRequest::from(&req);

        let res = self
            .connector
            .http
            .post(self.url())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                let stage = if err.is_timeout() { "timeout" } else { "transport" };
                ProviderError::stage(stage, err.without_url().to_string())
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|err| {
            ProviderError::stage("read", format!("failed to read Gemini response body: {err}"))
        })?;

        if !status.is_success() {
            return Err(http_error(status, &text));
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&text).map_err(|err| {
            ProviderError::stage("decode", format!("unexpected Gemini response shape: {err}"))
        })?;
        response_text(&parsed)
    }
}

fn generate_content_url(base_url: &str, model: &str) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}

fn http_error(status: StatusCode, body: &str) -> ProviderError {
    let raw_response_json = serde_json::from_str::<serde_json::Value>(body).ok();
    let parsed = raw_response_json
        .clone()
        .and_then(|v| serde_json::from_value::<ErrorEnvelope>(v).ok());

    let (provider_status, detail) = match parsed {
        Some(envelope) => (envelope.error.status, envelope.error.message),
        None => (None, body.trim().to_string()),
    };
    let detail = if detail.is_empty() {
        format!("status={status}")
    } else {
        detail
    };

    ProviderError {
        stage: "http",
        status: Some(status.as_u16()),
        provider_status,
        detail,
        raw_response_json,
    }
}

fn response_text(res: &GenerateContentResponse) -> Result<String, ProviderError> {
    let Some(candidate) = res.candidates.first() else {
        let reason = res
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
            .unwrap_or("no candidates returned");
        return Err(ProviderError::stage(
            "empty",
            format!("Gemini returned no candidates ({reason})"),
        ));
    };

    let mut out = String::new();
    if let Some(content) = &candidate.content {
        for part in &content.parts {
            if let Some(text) = &part.text {
                out.push_str(text);
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl From<&GenerateRequest> for GenerateContentRequest {
    fn from(req: &GenerateRequest) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(req.prompt.clone()),
                }],
            }],
            generation_config: req.max_output_tokens.map(|max_output_tokens| GenerationConfig {
                max_output_tokens,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}
