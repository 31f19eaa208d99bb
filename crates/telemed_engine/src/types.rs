use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub type RequestId = u64;
pub type ImageId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

/// One call against the service, already validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Chat { message: String, language: String },
    AnalyzeText { text: String, context: Option<String> },
    AnalyzeImage(ImageFile),
    ExtractText(ImageFile),
    Research { query: String, num_results: u8 },
}

impl ApiCall {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiCall::Chat { .. } => "api/chat",
            ApiCall::AnalyzeText { .. } => "api/analyze-text",
            ApiCall::AnalyzeImage(_) => "api/analyze-image",
            ApiCall::ExtractText(_) => "api/analyze-image-text",
            ApiCall::Research { .. } => "api/research",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    Chat(String),
    Analysis(AnalysisBody),
    ExtractedText(String),
    Research(ResearchBody),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisBody {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub disclaimer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchBody {
    pub summary: String,
    #[serde(default)]
    pub results: Vec<ResearchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchHit {
    pub title: String,
    #[serde(alias = "content")]
    pub excerpt: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "score")]
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    ErrorNotice,
    SuccessNotice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    HealthChecked(Result<String, ApiError>),
    RequestCompleted {
        request_id: RequestId,
        result: Result<ApiReply, ApiError>,
    },
    TimerFired {
        key: TimerKey,
        generation: u64,
    },
    PreviewReady {
        image_id: ImageId,
        data_uri: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidRequest,
    Network,
    HttpStatus(u16),
    Timeout,
    Protocol,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Protocol => write!(f, "malformed response"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
