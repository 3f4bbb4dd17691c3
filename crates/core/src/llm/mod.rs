use crate::llm::error::ProviderError;
use std::sync::Arc;

pub mod cache;
pub mod error;
pub mod gemini;
pub mod resolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub max_output_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens: None,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// A client bound to one backing model identifier.
#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate_text(&self, req: GenerateRequest) -> Result<String, ProviderError>;
}

/// Binds model identifiers to clients. Binding does no network I/O.
pub trait EndpointConnector: Send + Sync {
    fn connect(&self, model_id: &str) -> Result<Arc<dyn TextModel>, ProviderError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-process connector whose models answer from a fixed table.
    /// Identifiers missing from the table are rejected with a 404.
    #[derive(Default)]
    pub struct FakeConnector {
        outcomes: HashMap<String, Result<String, ProviderError>>,
        calls: Arc<Mutex<Vec<(String, GenerateRequest)>>>,
    }

    impl FakeConnector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn answering(mut self, model_id: &str, text: &str) -> Self {
            self.outcomes
                .insert(model_id.to_string(), Ok(text.to_string()));
            self
        }

        pub fn failing(mut self, model_id: &str, err: ProviderError) -> Self {
            self.outcomes.insert(model_id.to_string(), Err(err));
            self
        }

        /// Every request issued through any bound model, in order.
        pub fn calls(&self) -> Vec<(String, GenerateRequest)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn called_models(&self) -> Vec<String> {
            self.calls().into_iter().map(|(m, _)| m).collect()
        }
    }

    impl EndpointConnector for FakeConnector {
        fn connect(&self, model_id: &str) -> Result<Arc<dyn TextModel>, ProviderError> {
            let outcome = self
                .outcomes
                .get(model_id)
                .cloned()
                .unwrap_or_else(|| Err(ProviderError::http(404, None, "model not found")));
            Ok(Arc::new(FakeModel {
                model_id: model_id.to_string(),
                outcome,
                calls: self.calls.clone(),
            }))
        }
    }

    pub struct FakeModel {
        model_id: String,
        outcome: Result<String, ProviderError>,
        calls: Arc<Mutex<Vec<(String, GenerateRequest)>>>,
    }

    #[async_trait::async_trait]
    impl TextModel for FakeModel {
        fn model_id(&self) -> &str {
            &self.model_id
        }

        async fn generate_text(&self, req: GenerateRequest) -> Result<String, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((self.model_id.clone(), req));
            self.outcome.clone()
        }
    }
}
