use crate::config::Settings;
use crate::quote::{InstrumentSymbol, Quote, QuoteLookup, QuoteOutcome};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
// KOSPI listings. KOSDAQ codes would need ".KQ"; only one suffix is tried.
const DEFAULT_DOMESTIC_SUFFIX: &str = ".KS";

/// Chart-endpoint quote provider.
#[derive(Debug, Clone)]
pub struct YahooQuoteClient {
    http: reqwest::Client,
    base_url: String,
    domestic_suffix: String,
}

impl YahooQuoteClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .quote_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let domestic_suffix = settings
            .quote_domestic_suffix
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DOMESTIC_SUFFIX.to_string());

        let timeout_secs = std::env::var("QUOTE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0")
            .build()
            .context("failed to build quote provider http client")?;

        Ok(Self {
            http,
            base_url,
            domestic_suffix,
        })
    }

    pub fn query_symbol(&self, symbol: &InstrumentSymbol) -> String {
        symbol.query_symbol(&self.domestic_suffix)
    }

    fn url(&self, query_symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            query_symbol
        )
    }

    async fn fetch_once(&self, symbol: &InstrumentSymbol) -> Result<Quote> {
        let query_symbol = self.query_symbol(symbol);

        let res = self
            .http
            .get(self.url(&query_symbol))
            .query(&[("interval", "1d"), ("range", "5d")])
            .send()
            .await
            .context("quote provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read quote provider response")?;

        if !status.is_success() {
            anyhow::bail!("quote provider HTTP {status} for {query_symbol}");
        }

        let parsed = serde_json::from_str::<ChartResponse>(&text)
            .with_context(|| format!("quote provider response is not chart JSON: {text}"))?;
        parse_quote(symbol, parsed)
    }
}

#[async_trait::async_trait]
impl QuoteLookup for YahooQuoteClient {
    async fn lookup(&self, symbol: &InstrumentSymbol) -> QuoteOutcome {
        match self.fetch_once(symbol).await {
            Ok(quote) => {
                tracing::debug!(symbol = %symbol, price = quote.last_price, "quote fetched");
                QuoteOutcome::Available(quote)
            }
            Err(err) => {
                tracing::warn!(
                    symbol = %symbol,
                    query = %self.query_symbol(symbol),
                    error = %err,
                    "quote lookup failed; omitting symbol"
                );
                QuoteOutcome::Unavailable
            }
        }
    }
}

fn parse_quote(symbol: &InstrumentSymbol, res: ChartResponse) -> Result<Quote> {
    if let Some(err) = res.chart.error {
        anyhow::bail!("quote provider error: {err}");
    }

    let meta = res
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .map(|r| r.meta)
        .context("quote provider returned no chart result")?;

    let last_price = meta
        .regular_market_price
        .context("missing regularMarketPrice")?;
    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .context("missing previous close")?;

    anyhow::ensure!(
        last_price.is_finite() && previous_close.is_finite() && previous_close > 0.0,
        "unusable prices (last={last_price}, previous_close={previous_close})"
    );

    Ok(Quote {
        symbol: symbol.clone(),
        last_price,
        previous_close,
        currency: meta.currency,
    })
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: &str) -> YahooQuoteClient {
        let settings = Settings {
            gemini_api_key: None,
            gemini_models: vec![],
            sentry_dsn: None,
            quote_base_url: Some(base_url.to_string()),
            quote_domestic_suffix: None,
        };
        YahooQuoteClient::from_settings(&settings).unwrap()
    }

    fn sym(s: &str) -> InstrumentSymbol {
        InstrumentSymbol::parse(s).unwrap()
    }

    #[test]
    fn domestic_code_is_queried_with_suffix() {
        let c = client("https://quotes.test/");
        assert_eq!(c.query_symbol(&sym("005930")), "005930.KS");
        assert_eq!(
            c.url(&c.query_symbol(&sym("005930"))),
            "https://quotes.test/v8/finance/chart/005930.KS"
        );
        assert_eq!(c.query_symbol(&sym("AAPL")), "AAPL");
    }

    #[test]
    fn parses_chart_meta() {
        let res: ChartResponse = serde_json::from_value(json!({
            "chart": {
                "result": [{
                    "meta": {
                        "currency": "KRW",
                        "symbol": "005930.KS",
                        "regularMarketPrice": 75000.0,
                        "chartPreviousClose": 73000.0,
                        "previousClose": 74000.0
                    }
                }],
                "error": null
            }
        }))
        .unwrap();

        let q = parse_quote(&sym("005930"), res).unwrap();
        assert_eq!(q.last_price, 75000.0);
        assert_eq!(q.previous_close, 74000.0);
        assert_eq!(q.currency.as_deref(), Some("KRW"));
    }

    #[test]
    fn falls_back_to_chart_previous_close() {
        let res: ChartResponse = serde_json::from_value(json!({
            "chart": {"result": [{"meta": {"regularMarketPrice": 10.0, "chartPreviousClose": 8.0}}]}
        }))
        .unwrap();
        let q = parse_quote(&sym("AAPL"), res).unwrap();
        assert_eq!(q.previous_close, 8.0);
    }

    #[test]
    fn delisted_symbol_is_an_error() {
        let res: ChartResponse = serde_json::from_value(json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}
        }))
        .unwrap();
        assert!(parse_quote(&sym("999999"), res).is_err());
    }

    #[test]
    fn zero_previous_close_is_rejected() {
        let res: ChartResponse = serde_json::from_value(json!({
            "chart": {"result": [{"meta": {"regularMarketPrice": 10.0, "previousClose": 0.0}}]}
        }))
        .unwrap();
        assert!(parse_quote(&sym("AAPL"), res).is_err());
    }

    /// Accepts one connection, records the request line's path, and hangs up
    /// without answering.
    async fn hang_up_server() -> (String, tokio::sync::oneshot::Receiver<String>) {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let head = String::from_utf8_lossy(&buf);
            let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
            let _ = tx.send(path);
        });

        (format!("http://{addr}"), rx)
    }

    #[tokio::test]
    async fn failed_provider_request_degrades_to_unavailable() {
        let (base_url, path) = hang_up_server().await;
        let c = client(&base_url);

        assert_eq!(c.lookup(&sym("005930")).await, QuoteOutcome::Unavailable);
        assert_eq!(
            path.await.unwrap(),
            "/v8/finance/chart/005930.KS?interval=1d&range=5d"
        );
    }
}
