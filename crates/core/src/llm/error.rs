use serde_json::Value;
use std::fmt;

/// A failed call to the generation provider, as reported by the transport or the
/// provider's error body.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub stage: &'static str,
    pub status: Option<u16>,
    pub provider_status: Option<String>,
    pub detail: String,
    pub raw_response_json: Option<Value>,
}

impl ProviderError {
    pub fn http(status: u16, provider_status: Option<&str>, detail: impl Into<String>) -> Self {
        Self {
            stage: "http",
            status: Some(status),
            provider_status: provider_status.map(str::to_string),
            detail: detail.into(),
            raw_response_json: None,
        }
    }

    pub fn stage(stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: None,
            provider_status: None,
            detail: detail.into(),
            raw_response_json: None,
        }
    }

    /// Reported HTTP status, or a bare status code found in the message text
    /// of a transport-level error. Decode errors carry serde positions
    /// ("column 404") and are never scanned.
    pub fn effective_status(&self) -> Option<u16> {
        self.status.or_else(|| {
            TEXT_STATUS_STAGES
                .contains(&self.stage)
                .then(|| status_in_text(&self.detail))
                .flatten()
        })
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "Gemini error (stage={}, status={status}): {}",
                self.stage, self.detail
            ),
            None => write!(f, "Gemini error (stage={}): {}", self.stage, self.detail),
        }
    }
}

impl std::error::Error for ProviderError {}

const TEXT_STATUS_STAGES: [&str; 2] = ["transport", "timeout"];

fn status_in_text(text: &str) -> Option<u16> {
    const KNOWN: [u16; 5] = [429, 400, 401, 403, 404];
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|tok| tok.len() == 3)
        .filter_map(|tok| tok.parse::<u16>().ok())
        .find(|code| KNOWN.contains(code))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    pub model_id: String,
    pub reason: String,
}

/// Terminal for the process: once resolution fails, no generation is attempted
/// until restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    MissingCredential,
    AllEndpointsRejected { attempts: Vec<RejectedCandidate> },
}

impl ResolutionFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCredential => {
                "API 키가 설정되지 않았습니다. 환경 설정에 GEMINI_API_KEY를 등록해주세요."
            }
            Self::AllEndpointsRejected { .. } => {
                "사용 가능한 AI 모델을 찾지 못했습니다. API 키 권한과 모델 설정을 확인한 뒤 앱을 다시 시작해주세요."
            }
        }
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "no generation credential configured"),
            Self::AllEndpointsRejected { attempts } if attempts.is_empty() => {
                write!(f, "no candidate models configured")
            }
            Self::AllEndpointsRejected { attempts } => {
                write!(f, "every candidate model rejected the probe: ")?;
                for (idx, attempt) in attempts.iter().enumerate() {
                    if idx != 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{} ({})", attempt.model_id, attempt.reason)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ResolutionFailure {}

/// Per-request and non-fatal. Retrying is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    RateLimited,
    AuthFailure,
    EndpointUnavailable,
    UnknownFailure(String),
}

impl GenerationFailure {
    pub fn classify(err: &ProviderError) -> Self {
        let provider_status = err.provider_status.as_deref().unwrap_or_default();
        let lower = err.detail.to_ascii_lowercase();

        if err.effective_status() == Some(429)
            || provider_status == "RESOURCE_EXHAUSTED"
            || lower.contains("quota")
        {
            return Self::RateLimited;
        }

        match err.effective_status() {
            Some(404) => Self::EndpointUnavailable,
            Some(400) | Some(401) | Some(403) => Self::AuthFailure,
            _ if matches!(provider_status, "UNAUTHENTICATED" | "PERMISSION_DENIED") => {
                Self::AuthFailure
            }
            _ if provider_status == "NOT_FOUND" => Self::EndpointUnavailable,
            _ => Self::UnknownFailure(err.detail.clone()),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => {
                "요청 한도를 초과했습니다. 약 1분 후 다시 시도해주세요.".to_string()
            }
            Self::AuthFailure => {
                "API 키가 유효하지 않습니다. 설정된 GEMINI_API_KEY를 확인해주세요.".to_string()
            }
            Self::EndpointUnavailable => {
                "AI 모델을 사용할 수 없습니다. 모델 설정을 확인해주세요.".to_string()
            }
            Self::UnknownFailure(message) => format!("오류 발생: {message}"),
        }
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "provider quota exceeded"),
            Self::AuthFailure => write!(f, "provider rejected the credential"),
            Self::EndpointUnavailable => write!(f, "model endpoint unavailable"),
            Self::UnknownFailure(message) => write!(f, "generation failed: {message}"),
        }
    }
}

impl std::error::Error for GenerationFailure {}
