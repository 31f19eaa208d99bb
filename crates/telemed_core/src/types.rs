use std::fmt;
use std::sync::Arc;

pub type RequestId = u64;
pub type ImageId = u64;

/// One independent asynchronous action the user can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKind {
    Chat,
    TextAnalysis,
    ImageAnalysis,
    TextExtraction,
    Research,
}

impl SlotKind {
    pub const ALL: [SlotKind; 5] = [
        SlotKind::Chat,
        SlotKind::TextAnalysis,
        SlotKind::ImageAnalysis,
        SlotKind::TextExtraction,
        SlotKind::Research,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SlotKind::Chat => "chat",
            SlotKind::TextAnalysis => "text-analysis",
            SlotKind::ImageAnalysis => "image-analysis",
            SlotKind::TextExtraction => "text-extraction",
            SlotKind::Research => "research",
        }
    }

    pub(crate) fn validation_message(self) -> &'static str {
        match self {
            SlotKind::Chat => "Please enter a message",
            SlotKind::TextAnalysis => "Please enter text to analyze",
            SlotKind::ImageAnalysis => "Please select an image to analyze",
            SlotKind::TextExtraction => "Please select an image first",
            SlotKind::Research => "Please enter a research query",
        }
    }

    pub(crate) fn success_message(self) -> &'static str {
        match self {
            SlotKind::Chat => "Response received!",
            SlotKind::TextAnalysis => "Analysis complete!",
            SlotKind::ImageAnalysis => "Image analysis complete!",
            SlotKind::TextExtraction => "Text extracted successfully!",
            SlotKind::Research => "Research complete!",
        }
    }

    pub(crate) fn failure_message(self) -> &'static str {
        match self {
            SlotKind::Chat => "Failed to send message. Please try again.",
            SlotKind::TextAnalysis => "Failed to analyze text. Please try again.",
            SlotKind::ImageAnalysis => "Failed to analyze image. Please try again.",
            SlotKind::TextExtraction => "Failed to extract text. Please try again.",
            SlotKind::Research => "Failed to perform research. Please try again.",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Chat reply language understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Fr,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "fr" => Some(Language::Fr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Structured analysis of a medical report, from either text or an image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisResult {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
    pub disclaimer: Option<String>,
}

impl AnalysisResult {
    /// Plain-text rendering placed on the clipboard by the copy action.
    pub fn clipboard_text(&self) -> String {
        format!(
            "Summary: {}\nKey Findings: {}\nRecommendations: {}\nNext Steps: {}",
            self.summary,
            self.key_findings.join(", "),
            self.recommendations.join(", "),
            self.next_steps.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResearchResult {
    pub summary: String,
    pub results: Vec<ResearchItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchItem {
    pub title: String,
    pub excerpt: String,
    pub url: Option<String>,
    /// Within `0.0..=1.0` when present.
    pub relevance_score: Option<f64>,
}

/// Bytes of a user-chosen image as handed over by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub id: ImageId,
    pub upload: ImageUpload,
    /// Absent until the preview for this exact `id` has been derived.
    pub preview_data_uri: Option<String>,
}

/// Why a request did not produce a usable reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Transport,
    HttpStatus(u16),
    Timeout,
    Protocol,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport => write!(f, "transport failure"),
            FailureReason::HttpStatus(code) => write!(f, "http status {code}"),
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::Protocol => write!(f, "unexpected response body"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApiHealth {
    #[default]
    Unknown,
    Healthy,
    Unreachable {
        message: String,
    },
}

/// Outcome of the one-shot health probe as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthReport {
    /// The service answered with this `status` field.
    Status(String),
    /// The probe never got an answer.
    Unreachable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub generation: u64,
}
