use std::sync::Arc;

pub mod symbol;
pub mod yahoo;

pub use symbol::{InstrumentSymbol, SymbolKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: InstrumentSymbol,
    pub last_price: f64,
    pub previous_close: f64,
    pub currency: Option<String>,
}

impl Quote {
    pub fn change_pct(&self) -> f64 {
        (self.last_price / self.previous_close - 1.0) * 100.0
    }

    /// `"75,000원 (+1.23%)"` for domestic listings, `"189.84 USD (-0.52%)"` otherwise.
    pub fn formatted(&self) -> String {
        let price = if self.symbol.is_domestic() {
            format!("{}원", group_thousands(self.last_price.round() as i64))
        } else {
            match self.currency.as_deref() {
                Some(currency) => format!("{:.2} {currency}", self.last_price),
                None => format!("{:.2}", self.last_price),
            }
        };
        format!("{price} ({:+.2}%)", self.change_pct())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Available(Quote),
    Unavailable,
}

impl QuoteOutcome {
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Available(q) => Some(q),
            Self::Unavailable => None,
        }
    }
}

/// Never fails: provider errors degrade to `Unavailable`.
#[async_trait::async_trait]
pub trait QuoteLookup: Send + Sync {
    async fn lookup(&self, symbol: &InstrumentSymbol) -> QuoteOutcome;
}

/// Looks up every symbol concurrently. Results come back in input order; a
/// failed or panicked lookup only affects its own symbol.
pub async fn lookup_all(
    quotes: Arc<dyn QuoteLookup>,
    symbols: &[InstrumentSymbol],
) -> Vec<(InstrumentSymbol, QuoteOutcome)> {
    let mut out: Vec<(InstrumentSymbol, QuoteOutcome)> = symbols
        .iter()
        .map(|s| (s.clone(), QuoteOutcome::Unavailable))
        .collect();

    let mut set = tokio::task::JoinSet::new();
    for (idx, symbol) in symbols.iter().cloned().enumerate() {
        let quotes = quotes.clone();
        set.spawn(async move {
            let outcome = quotes.lookup(&symbol).await;
            (idx, outcome)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, outcome)) => out[idx].1 = outcome,
            Err(err) => tracing::warn!(error = %err, "quote lookup task failed"),
        }
    }

    out
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx != 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
