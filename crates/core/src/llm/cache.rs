use crate::llm::error::ResolutionFailure;
use crate::llm::resolver::{EndpointResolver, ResolvedEndpoint};
use tokio::sync::OnceCell;

/// Process-lifetime resolution result. Written once by whichever caller gets
/// there first; concurrent callers wait on the same in-flight resolution. Failures
/// are kept too, so a rejected setup stays rejected until restart.
#[derive(Debug)]
pub struct EndpointCache {
    resolver: EndpointResolver,
    cell: OnceCell<Result<ResolvedEndpoint, ResolutionFailure>>,
}

impl EndpointCache {
    pub fn new(resolver: EndpointResolver) -> Self {
        Self {
            resolver,
            cell: OnceCell::new(),
        }
    }

    pub async fn endpoint(&self) -> Result<ResolvedEndpoint, ResolutionFailure> {
        self.cell
            .get_or_init(|| self.resolver.resolve())
            .await
            .clone()
    }

    /// The cached result, if resolution already ran.
    pub fn peek(&self) -> Option<&Result<ResolvedEndpoint, ResolutionFailure>> {
        self.cell.get()
    }

    pub fn candidates(&self) -> &[String] {
        self.resolver.candidates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::error::ProviderError;
    use crate::llm::testing::FakeConnector;
    use std::sync::Arc;

    #[tokio::test]
    async fn resolves_once_and_reuses_binding() {
        let connector = Arc::new(
            FakeConnector::new()
                .failing("a", ProviderError::http(404, None, "gone"))
                .answering("b", "pong"),
        );
        let cache = EndpointCache::new(EndpointResolver::new(
            vec!["a".to_string(), "b".to_string()],
            connector.clone(),
        ));
        assert!(cache.peek().is_none());

        let first = cache.endpoint().await.unwrap();
        let second = cache.endpoint().await.unwrap();

        assert_eq!(first.model_id(), "b");
        assert_eq!(second.model_id(), "b");
        assert_eq!(connector.called_models(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failure_is_terminal() {
        let connector = Arc::new(FakeConnector::new());
        let cache = EndpointCache::new(EndpointResolver::new(
            vec!["a".to_string()],
            connector.clone(),
        ));

        assert!(cache.endpoint().await.is_err());
        assert!(cache.endpoint().await.is_err());
        assert_eq!(connector.called_models(), vec!["a"]);
        assert!(matches!(cache.peek(), Some(Err(_))));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_resolution() {
        let connector = Arc::new(FakeConnector::new().answering("a", "pong"));
        let cache = Arc::new(EndpointCache::new(EndpointResolver::new(
            vec!["a".to_string()],
            connector.clone(),
        )));

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let cache = cache.clone();
            set.spawn(async move { cache.endpoint().await.map(|e| e.model_id().to_string()) });
        }
        while let Some(res) = set.join_next().await {
            assert_eq!(res.unwrap().unwrap(), "a");
        }
        assert_eq!(connector.calls().len(), 1);
    }
}
