use std::sync::Arc;

use crate::{
    AnalysisResult, FailureReason, HealthReport, ImageId, Language, NoticeKind, RequestId,
    ResearchResult, SlotKind,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Session context created; triggers the one-shot health probe.
    SessionStarted,
    /// Health probe finished.
    HealthReported(HealthReport),
    /// User edited the chat draft.
    ChatInputChanged(String),
    /// User picked the chat reply language.
    ChatLanguageSelected(Language),
    /// User sent the chat draft.
    SendChatClicked,
    /// User edited the report text to analyze.
    AnalysisTextChanged(String),
    /// User edited the optional analysis context.
    AnalysisContextChanged(String),
    AnalyzeTextClicked,
    /// Platform finished reading a local image file.
    ImageChosen {
        name: String,
        media_type: String,
        bytes: Arc<[u8]>,
    },
    /// Preview for a staged image is ready.
    PreviewDerived { image_id: ImageId, data_uri: String },
    AnalyzeImageClicked,
    ExtractTextClicked,
    /// User asked to copy the current analysis to the clipboard.
    CopyResultsClicked,
    /// User cleared all analysis inputs and results.
    AnalysisCleared,
    ResearchQueryChanged(String),
    /// Requested number of research results; clamped into range.
    ResearchCountChanged(u32),
    ResearchClicked,
    /// User aborted the in-flight request of a slot.
    CancelRequested(SlotKind),
    /// Engine completion for a request.
    RequestCompleted {
        request_id: RequestId,
        outcome: Result<Reply, FailureReason>,
    },
    /// Expiry timer of a notice fired.
    NoticeExpired { kind: NoticeKind, generation: u64 },
    /// User dismissed a notice by hand.
    NoticeDismissed(NoticeKind),
    /// Fallback for placeholder wiring.
    NoOp,
}

/// Successful body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Chat(String),
    Analysis(AnalysisResult),
    ExtractedText(String),
    Research(ResearchResult),
}
