use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_SYMBOL_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Six-digit KRX listing code.
    Domestic,
    Ticker,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentSymbol {
    code: String,
    kind: SymbolKind,
}

impl InstrumentSymbol {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let code = raw.trim();
        anyhow::ensure!(!code.is_empty(), "instrument symbol must be non-empty");
        anyhow::ensure!(
            code.len() <= MAX_SYMBOL_LEN,
            "instrument symbol too long: {code}"
        );
        anyhow::ensure!(
            code.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')),
            "instrument symbol has unexpected characters: {code}"
        );

        let kind = if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
            SymbolKind::Domestic
        } else {
            SymbolKind::Ticker
        };

        Ok(Self {
            code: code.to_ascii_uppercase(),
            kind,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn is_domestic(&self) -> bool {
        self.kind == SymbolKind::Domestic
    }

    /// Symbol as sent to the quote provider: domestic codes get the exchange
    /// suffix, tickers pass through unchanged.
    pub fn query_symbol(&self, domestic_suffix: &str) -> String {
        match self.kind {
            SymbolKind::Domestic => format!("{}{}", self.code, domestic_suffix),
            SymbolKind::Ticker => self.code.clone(),
        }
    }
}

impl fmt::Display for InstrumentSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl FromStr for InstrumentSymbol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InstrumentSymbol {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InstrumentSymbol> for String {
    fn from(value: InstrumentSymbol) -> Self {
        value.code
    }
}
