use crate::config::Settings;
use crate::llm::error::{ProviderError, RejectedCandidate, ResolutionFailure};
use crate::llm::gemini::GeminiConnector;
use crate::llm::{EndpointConnector, GenerateRequest, TextModel};
use std::fmt;
use std::sync::Arc;

pub const PROBE_PROMPT: &str = "ping";
pub const PROBE_MAX_OUTPUT_TOKENS: u32 = 1;

/// A model that accepted the liveness probe. Cheap to clone; all clones share
/// the same bound client.
#[derive(Clone)]
pub struct ResolvedEndpoint {
    model: Arc<dyn TextModel>,
}

impl ResolvedEndpoint {
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.model.generate_text(GenerateRequest::new(prompt)).await
    }
}

impl fmt::Debug for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEndpoint")
            .field("model_id", &self.model_id())
            .finish()
    }
}

/// Tries candidates in order and binds the first one whose probe succeeds.
/// Each candidate gets exactly one probe; later candidates are never touched once
/// one succeeds.
pub async fn resolve(
    candidates: &[String],
    connector: &dyn EndpointConnector,
) -> Result<ResolvedEndpoint, ResolutionFailure> {
    let mut attempts = Vec::new();

    for model_id in candidates {
        tracing::info!(model = %model_id, "probing model endpoint");

        let bound = match connector.connect(model_id) {
            Ok(model) => match probe(model.as_ref()).await {
                Ok(()) => Ok(model),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        match bound {
            Ok(model) => {
                tracing::info!(model = %model_id, rejected = attempts.len(), "model endpoint bound");
                return Ok(ResolvedEndpoint { model });
            }
            Err(err) => {
                tracing::warn!(model = %model_id, error = %err, "model endpoint rejected probe");
                attempts.push(RejectedCandidate {
                    model_id: model_id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    tracing::error!(
        candidates = candidates.len(),
        "no model endpoint accepted the probe"
    );
    Err(ResolutionFailure::AllEndpointsRejected { attempts })
}

async fn probe(model: &dyn TextModel) -> Result<(), ProviderError> {
    let req = GenerateRequest::new(PROBE_PROMPT).with_max_output_tokens(PROBE_MAX_OUTPUT_TOKENS);
    model.generate_text(req).await.map(|_| ())
}

/// Candidate list plus the connector used to bind them. A resolver without a
/// connector has no credential and fails before any network call.
#[derive(Clone)]
pub struct EndpointResolver {
    candidates: Vec<String>,
    connector: Option<Arc<dyn EndpointConnector>>,
}

impl EndpointResolver {
    pub fn new(candidates: Vec<String>, connector: Arc<dyn EndpointConnector>) -> Self {
        Self {
            candidates,
            connector: Some(connector),
        }
    }

    pub fn without_credential(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            connector: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let candidates = settings.gemini_models.clone();
        if settings.require_gemini_api_key().is_err() {
            tracing::warn!("GEMINI_API_KEY missing; model resolution will fail");
            return Ok(Self::without_credential(candidates));
        }
        let connector = GeminiConnector::from_settings(settings)?;
        Ok(Self::new(candidates, Arc::new(connector)))
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub async fn resolve(&self) -> Result<ResolvedEndpoint, ResolutionFailure> {
        let Some(connector) = self.connector.as_deref() else {
            tracing::error!("cannot resolve model endpoint without a credential");
            return Err(ResolutionFailure::MissingCredential);
        };
        resolve(&self.candidates, connector).await
    }
}

impl fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointResolver")
            .field("candidates", &self.candidates)
            .field("has_credential", &self.connector.is_some())
            .finish()
    }
}
