use crate::llm::error::GenerationFailure;
use crate::llm::resolver::ResolvedEndpoint;
use crate::quote::{lookup_all, QuoteLookup};
use crate::report::{prompt, ReportRequest, ReportText};
use crate::time::kr_market::MarketClock;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

pub struct ReportGenerator {
    quotes: Arc<dyn QuoteLookup>,
    timeout: Duration,
}

impl ReportGenerator {
    pub fn new(quotes: Arc<dyn QuoteLookup>) -> Self {
        Self {
            quotes,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Looks up quotes for the requested symbols and renders the full prompt.
    pub async fn compose_prompt(&self, request: &ReportRequest, clock: &MarketClock) -> String {
        let quotes = if request.symbols.is_empty() {
            Vec::new()
        } else {
            lookup_all(self.quotes.clone(), &request.symbols).await
        };

        let available = quotes.iter().filter(|(_, o)| o.quote().is_some()).count();
        tracing::debug!(
            requested = request.symbols.len(),
            available,
            "quote context assembled"
        );

        prompt::compose(request.category, clock, &quotes)
    }

    pub async fn generate(
        &self,
        endpoint: &ResolvedEndpoint,
        request: &ReportRequest,
    ) -> Result<ReportText, GenerationFailure> {
        let clock = MarketClock::now()
            .map_err(|err| GenerationFailure::UnknownFailure(err.to_string()))?;
        self.generate_at(endpoint, request, &clock).await
    }

    /// One generation call, no retries. Failures are classified by provider status.
    pub async fn generate_at(
        &self,
        endpoint: &ResolvedEndpoint,
        request: &ReportRequest,
        clock: &MarketClock,
    ) -> Result<ReportText, GenerationFailure> {
        let prompt = self.compose_prompt(request, clock).await;

        tracing::info!(
            model = endpoint.model_id(),
            category = request.category.slug(),
            symbols = request.symbols.len(),
            prompt_chars = prompt.chars().count(),
            "requesting briefing"
        );

        let res = tokio::time::timeout(self.timeout, endpoint.generate(&prompt)).await;

        match res {
            Ok(Ok(text)) => {
                tracing::info!(
                    model = endpoint.model_id(),
                    response_chars = text.chars().count(),
                    "briefing generated"
                );
                Ok(ReportText {
                    model: endpoint.model_id().to_string(),
                    category: request.category,
                    text,
                })
            }
            Ok(Err(err)) => {
                let failure = GenerationFailure::classify(&err);
                tracing::warn!(
                    model = endpoint.model_id(),
                    error = %err,
                    classified = %failure,
                    "briefing generation failed"
                );
                Err(failure)
            }
            Err(_) => {
                tracing::warn!(
                    model = endpoint.model_id(),
                    timeout_secs = self.timeout.as_secs(),
                    "briefing generation timed out"
                );
                Err(GenerationFailure::UnknownFailure(format!(
                    "no response from {} within {}s",
                    endpoint.model_id(),
                    self.timeout.as_secs()
                )))
            }
        }
    }
}
