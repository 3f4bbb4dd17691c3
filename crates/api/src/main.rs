use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use golden_bell_core::briefing::{BriefingError, BriefingService};
use golden_bell_core::quote::{InstrumentSymbol, QuoteLookup, QuoteOutcome};
use golden_bell_core::report::{Category, ReportRequest, MAX_SYMBOLS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = golden_bell_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let service = BriefingService::from_settings(&settings)?;
    tracing::info!(
        candidates = ?service.endpoints().candidates(),
        "briefing service ready; model resolves on first request"
    );

    let state = AppState {
        service: Arc::new(service),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/categories", get(list_categories))
        .route("/quotes/:symbol", get(get_quote))
        .route("/briefings", post(create_briefing))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    service: Arc<BriefingService>,
}

#[derive(Debug, Serialize)]
struct ApiStatus {
    candidates: Vec<String>,
    resolution: &'static str,
    model: Option<String>,
    message: Option<String>,
}

async fn status(State(state): State<AppState>) -> Json<ApiStatus> {
    let endpoints = state.service.endpoints();
    let (resolution, model, message) = match endpoints.peek() {
        None => ("pending", None, None),
        Some(Ok(endpoint)) => ("bound", Some(endpoint.model_id().to_string()), None),
        Some(Err(failure)) => ("failed", None, Some(failure.user_message().to_string())),
    };

    Json(ApiStatus {
        candidates: endpoints.candidates().to_vec(),
        resolution,
        model,
        message,
    })
}

#[derive(Debug, Serialize)]
struct ApiCategory {
    slug: &'static str,
    label: &'static str,
}

async fn list_categories() -> Json<Vec<ApiCategory>> {
    Json(
        Category::ALL
            .iter()
            .map(|c| ApiCategory {
                slug: c.slug(),
                label: c.label(),
            })
            .collect(),
    )
}

#[derive(Debug, Serialize)]
struct ApiQuote {
    symbol: String,
    last_price: f64,
    previous_close: f64,
    change_pct: f64,
    formatted: String,
}

async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiQuote>, ApiError> {
    let symbol = InstrumentSymbol::parse(&symbol).map_err(ApiError::bad_request)?;

    match state.service.quotes().lookup(&symbol).await {
        QuoteOutcome::Available(q) => Ok(Json(ApiQuote {
            symbol: q.symbol.to_string(),
            last_price: q.last_price,
            previous_close: q.previous_close,
            change_pct: q.change_pct(),
            formatted: q.formatted(),
        })),
        QuoteOutcome::Unavailable => Err(ApiError {
            status: StatusCode::NOT_FOUND,
            code: "quote_unavailable",
            message: format!("{symbol} 시세를 조회할 수 없습니다."),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct CreateBriefing {
    category: String,
    #[serde(default)]
    symbols: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ApiBriefing {
    briefing_id: Uuid,
    model: String,
    category: Category,
    generated_at: DateTime<Utc>,
    report: String,
}

async fn create_briefing(
    State(state): State<AppState>,
    Json(body): Json<CreateBriefing>,
) -> Result<Json<ApiBriefing>, ApiError> {
    let category: Category = body.category.parse().map_err(ApiError::bad_request)?;
    let symbols = parse_symbols(&body.symbols).map_err(ApiError::bad_request)?;

    let request = ReportRequest::new(category).with_symbols(symbols);
    let briefing_id = Uuid::new_v4();
    tracing::info!(%briefing_id, category = category.slug(), "briefing requested");

    let report = state.service.run(&request).await.map_err(|err| {
        tracing::warn!(%briefing_id, error = %err, "briefing failed");
        ApiError::from(err)
    })?;

    Ok(Json(ApiBriefing {
        briefing_id,
        model: report.model,
        category: report.category,
        generated_at: Utc::now(),
        report: report.text,
    }))
}

fn parse_symbols(raw: &[String]) -> anyhow::Result<Vec<InstrumentSymbol>> {
    anyhow::ensure!(
        raw.len() <= MAX_SYMBOLS,
        "too many symbols: {} (max {MAX_SYMBOLS})",
        raw.len()
    );
    raw.iter().map(|s| InstrumentSymbol::parse(s)).collect()
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: err.to_string(),
        }
    }
}

impl From<BriefingError> for ApiError {
    fn from(err: BriefingError) -> Self {
        use golden_bell_core::llm::error::GenerationFailure;

        let status = match &err {
            BriefingError::Resolution(_) => StatusCode::SERVICE_UNAVAILABLE,
            BriefingError::Generation(GenerationFailure::RateLimited) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            BriefingError::Generation(GenerationFailure::UnknownFailure(_)) => {
                // Only unclassified failures are worth an alert.
                sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
                StatusCode::BAD_GATEWAY
            }
            BriefingError::Generation(_) => StatusCode::BAD_GATEWAY,
        };

        Self {
            status,
            code: err.code(),
            message: err.user_message(),
        }
    }
}

#[derive(Serialize)]
struct ApiErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &golden_bell_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use golden_bell_core::llm::error::{GenerationFailure, ResolutionFailure};

    #[test]
    fn maps_failures_to_statuses() {
        let cases = [
            (
                BriefingError::Resolution(ResolutionFailure::MissingCredential),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                BriefingError::Generation(GenerationFailure::RateLimited),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                BriefingError::Generation(GenerationFailure::AuthFailure),
                StatusCode::BAD_GATEWAY,
            ),
            (
                BriefingError::Generation(GenerationFailure::EndpointUnavailable),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            let code = err.code();
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.code, code);
        }
    }

    #[test]
    fn bad_category_is_a_client_error() {
        let err = "weather"
            .parse::<Category>()
            .map_err(ApiError::bad_request)
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn symbol_count_is_capped() {
        let at_cap: Vec<String> = (0..MAX_SYMBOLS).map(|i| format!("{:06}", i)).collect();
        assert_eq!(parse_symbols(&at_cap).unwrap().len(), MAX_SYMBOLS);

        let over: Vec<String> = (0..=MAX_SYMBOLS).map(|i| format!("{:06}", i)).collect();
        let err = parse_symbols(&over).map_err(ApiError::bad_request).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("too many symbols"));
    }
}
