use std::sync::Arc;
use std::time::Duration;

use crate::{ImageId, ImageUpload, Language, NoticeKind, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ProbeHealth,
    SendRequest {
        request_id: RequestId,
        request: Request,
    },
    CancelRequest {
        request_id: RequestId,
    },
    /// Start the expiry timer of a notice, superseding any running timer of that kind.
    ArmNoticeTimer {
        kind: NoticeKind,
        generation: u64,
        after: Duration,
    },
    DisarmNoticeTimer {
        kind: NoticeKind,
    },
    DerivePreview {
        image_id: ImageId,
        media_type: String,
        bytes: Arc<[u8]>,
    },
    CopyToClipboard {
        text: String,
    },
}

/// Validated payload for one of the service endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Chat {
        message: String,
        language: Language,
    },
    AnalyzeText {
        text: String,
        context: Option<String>,
    },
    AnalyzeImage {
        image: ImageUpload,
    },
    ExtractText {
        image: ImageUpload,
    },
    Research {
        query: String,
        num_results: u8,
    },
}
