use crate::quote::InstrumentSymbol;

pub mod category;
pub mod generator;
pub mod prompt;

pub use category::Category;
pub use generator::ReportGenerator;

/// Upper bound on quoted symbols per report; each one is a provider request.
pub const MAX_SYMBOLS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub category: Category,
    pub symbols: Vec<InstrumentSymbol>,
}

impl ReportRequest {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            symbols: Vec::new(),
        }
    }

    pub fn with_symbols(mut self, symbols: Vec<InstrumentSymbol>) -> Self {
        self.symbols = symbols;
        self
    }
}

/// Model output exactly as returned; never parsed or rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportText {
    pub model: String,
    pub category: Category,
    pub text: String,
}
