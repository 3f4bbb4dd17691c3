pub mod briefing;
pub mod llm;
pub mod quote;
pub mod report;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_GEMINI_MODELS: [&str; 3] = [
        "gemini-2.0-flash-lite-preview-02-05",
        "gemini-2.0-flash",
        "gemini-1.5-flash",
    ];

    #[derive(Clone)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub gemini_models: Vec<String>,
        pub sentry_dsn: Option<String>,
        pub quote_base_url: Option<String>,
        pub quote_domestic_suffix: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
                gemini_models: parse_model_list(std::env::var("GEMINI_MODELS").ok().as_deref()),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                quote_base_url: std::env::var("QUOTE_BASE_URL").ok(),
                quote_domestic_suffix: std::env::var("QUOTE_DOMESTIC_SUFFIX").ok(),
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .context("GEMINI_API_KEY is required")
        }
    }

    // The API key must never reach log output.
    impl std::fmt::Debug for Settings {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Settings")
                .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
                .field("gemini_models", &self.gemini_models)
                .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "<redacted>"))
                .field("quote_base_url", &self.quote_base_url)
                .field("quote_domestic_suffix", &self.quote_domestic_suffix)
                .finish()
        }
    }

    /// Parses a comma-separated candidate list, keeping order and the first
    /// occurrence of each identifier. Falls back to the built-in list when unset.
    pub fn parse_model_list(raw: Option<&str>) -> Vec<String> {
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return DEFAULT_GEMINI_MODELS.iter().map(|s| s.to_string()).collect();
        };

        let mut out: Vec<String> = Vec::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() || out.iter().any(|m| m == part) {
                continue;
            }
            out.push(part.to_string());
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn model_list_defaults_when_unset() {
            assert_eq!(parse_model_list(None), DEFAULT_GEMINI_MODELS.to_vec());
            assert_eq!(parse_model_list(Some("  ")), DEFAULT_GEMINI_MODELS.to_vec());
        }

        #[test]
        fn model_list_keeps_order_and_drops_duplicates() {
            let models = parse_model_list(Some("b, a,,b , c"));
            assert_eq!(models, vec!["b", "a", "c"]);
        }

        #[test]
        fn blank_api_key_is_missing() {
            let settings = Settings {
                gemini_api_key: Some("   ".to_string()),
                gemini_models: vec![],
                sentry_dsn: None,
                quote_base_url: None,
                quote_domestic_suffix: None,
            };
            assert!(settings.require_gemini_api_key().is_err());
        }

        #[test]
        fn debug_output_redacts_api_key() {
            let settings = Settings {
                gemini_api_key: Some("secret-key".to_string()),
                gemini_models: vec!["m".to_string()],
                sentry_dsn: None,
                quote_base_url: None,
                quote_domestic_suffix: None,
            };
            assert!(!format!("{settings:?}").contains("secret-key"));
        }
    }
}
