//! One user-triggered briefing: resolve the model endpoint (once per process),
//! gather quotes, generate, and map any failure to a fixed user-facing message.

use crate::config::Settings;
use crate::llm::cache::EndpointCache;
use crate::llm::error::{GenerationFailure, ResolutionFailure};
use crate::llm::resolver::EndpointResolver;
use crate::quote::yahoo::YahooQuoteClient;
use crate::quote::QuoteLookup;
use crate::report::{ReportGenerator, ReportRequest, ReportText};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BriefingError {
    Resolution(ResolutionFailure),
    Generation(GenerationFailure),
}

impl BriefingError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Resolution(f) => f.user_message().to_string(),
            Self::Generation(f) => f.user_message(),
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Resolution(ResolutionFailure::MissingCredential) => "missing_credential",
            Self::Resolution(ResolutionFailure::AllEndpointsRejected { .. }) => {
                "all_endpoints_rejected"
            }
            Self::Generation(GenerationFailure::RateLimited) => "rate_limited",
            Self::Generation(GenerationFailure::AuthFailure) => "auth_failure",
            Self::Generation(GenerationFailure::EndpointUnavailable) => "endpoint_unavailable",
            Self::Generation(GenerationFailure::UnknownFailure(_)) => "unknown_failure",
        }
    }
}

impl fmt::Display for BriefingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution(inner) => write!(f, "model resolution failed: {inner}"),
            Self::Generation(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for BriefingError {}

impl From<ResolutionFailure> for BriefingError {
    fn from(value: ResolutionFailure) -> Self {
        Self::Resolution(value)
    }
}

impl From<GenerationFailure> for BriefingError {
    fn from(value: GenerationFailure) -> Self {
        Self::Generation(value)
    }
}

pub struct BriefingService {
    endpoints: EndpointCache,
    generator: ReportGenerator,
    quotes: Arc<dyn QuoteLookup>,
}

impl BriefingService {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let resolver = EndpointResolver::from_settings(settings)?;
        let quotes: Arc<dyn QuoteLookup> = Arc::new(YahooQuoteClient::from_settings(settings)?);
        Ok(Self::new(resolver, quotes))
    }

    pub fn new(resolver: EndpointResolver, quotes: Arc<dyn QuoteLookup>) -> Self {
        Self {
            endpoints: EndpointCache::new(resolver),
            generator: ReportGenerator::new(quotes.clone()),
            quotes,
        }
    }

    pub fn endpoints(&self) -> &EndpointCache {
        &self.endpoints
    }

    pub fn quotes(&self) -> &Arc<dyn QuoteLookup> {
        &self.quotes
    }

    pub fn generator(&self) -> &ReportGenerator {
        &self.generator
    }

    pub async fn run(&self, request: &ReportRequest) -> Result<ReportText, BriefingError> {
        let endpoint = self.endpoints.endpoint().await?;
        let report = self.generator.generate(&endpoint, request).await?;
        Ok(report)
    }
}
