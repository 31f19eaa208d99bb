use std::sync::Arc;
use std::time::Duration;

use telemed_logging::{telemed_debug, telemed_info, telemed_warn};

use crate::notice::{NoticeChannel, NOTICE_TTL};
use crate::slot::{OperationSlot, Slots};
use crate::store::ResultStore;
use crate::view_model::{AppViewModel, SlotView, StagedImageView};
use crate::{
    AnalysisResult, ApiHealth, ChatTurn, Effect, FailureReason, HealthReport, ImageId,
    ImageUpload, Language, NoticeKind, Reply, Request, RequestId, ResearchResult, SlotKind,
    StagedImage,
};

pub const MIN_RESEARCH_RESULTS: u8 = 1;
pub const MAX_RESEARCH_RESULTS: u8 = 10;
pub const DEFAULT_RESEARCH_RESULTS: u8 = 5;

/// Per-session knobs supplied by the platform at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub notice_ttl: Duration,
    pub language: Language,
    pub research_results: u8,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            notice_ttl: NOTICE_TTL,
            language: Language::En,
            research_results: DEFAULT_RESEARCH_RESULTS,
        }
    }
}

pub fn clamp_research_results(requested: u32) -> u8 {
    requested.clamp(
        u32::from(MIN_RESEARCH_RESULTS),
        u32::from(MAX_RESEARCH_RESULTS),
    ) as u8
}

/// Everything the client knows during one session.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    dirty: bool,
    next_request_id: RequestId,
    next_image_id: ImageId,
    health: ApiHealth,
    health_probe_sent: bool,
    notices: NoticeChannel,
    slots: Slots,
    chat_draft: String,
    chat_language: Language,
    transcript: Vec<ChatTurn>,
    analysis_text: String,
    analysis_context: String,
    analysis: ResultStore<AnalysisResult>,
    staged_image: Option<StagedImage>,
    extracted_text: ResultStore<String>,
    research_query: String,
    research_count: u8,
    research: ResultStore<ResearchResult>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(SessionSettings::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        Self {
            dirty: false,
            next_request_id: 1,
            next_image_id: 1,
            health: ApiHealth::Unknown,
            health_probe_sent: false,
            notices: NoticeChannel::new(settings.notice_ttl),
            slots: Slots::default(),
            chat_draft: String::new(),
            chat_language: settings.language,
            transcript: Vec::new(),
            analysis_text: String::new(),
            analysis_context: String::new(),
            analysis: ResultStore::default(),
            staged_image: None,
            extracted_text: ResultStore::default(),
            research_query: String::new(),
            research_count: clamp_research_results(u32::from(settings.research_results)),
            research: ResultStore::default(),
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            health: self.health.clone(),
            chat_draft: self.chat_draft.clone(),
            chat_language: self.chat_language,
            transcript: self.transcript.clone(),
            analysis_text: self.analysis_text.clone(),
            analysis_context: self.analysis_context.clone(),
            analysis: self.analysis.current().cloned(),
            staged_image: self.staged_image.as_ref().map(|image| StagedImageView {
                image_id: image.id,
                name: image.upload.name.clone(),
                media_type: image.upload.media_type.clone(),
                byte_len: image.upload.bytes.len(),
                preview_data_uri: image.preview_data_uri.clone(),
            }),
            extracted_text: self.extracted_text.current().cloned(),
            research_query: self.research_query.clone(),
            research_count: self.research_count,
            research: self.research.current().cloned(),
            slots: self
                .slots
                .iter()
                .map(|slot| SlotView {
                    kind: slot.kind(),
                    loading: slot.is_loading(),
                    last_error: slot.last_error(),
                })
                .collect(),
            error_notice: self.notices.get(NoticeKind::Error).cloned(),
            success_notice: self.notices.get(NoticeKind::Success).cloned(),
            dirty: self.dirty,
        }
    }

    pub fn slot(&self, kind: SlotKind) -> &OperationSlot {
        self.slots.get(kind)
    }

    pub fn is_loading(&self, kind: SlotKind) -> bool {
        self.slots.get(kind).is_loading()
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Returns whether anything visible changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn allocate_request_id(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    // --- inputs -----------------------------------------------------------

    pub(crate) fn set_chat_draft(&mut self, text: String) {
        self.chat_draft = text;
        self.mark_dirty();
    }

    pub(crate) fn set_chat_language(&mut self, language: Language) {
        self.chat_language = language;
        self.mark_dirty();
    }

    pub(crate) fn set_analysis_text(&mut self, text: String) {
        self.analysis_text = text;
        self.mark_dirty();
    }

    pub(crate) fn set_analysis_context(&mut self, text: String) {
        self.analysis_context = text;
        self.mark_dirty();
    }

    pub(crate) fn set_research_query(&mut self, text: String) {
        self.research_query = text;
        self.mark_dirty();
    }

    pub(crate) fn set_research_count(&mut self, requested: u32) {
        self.research_count = clamp_research_results(requested);
        self.mark_dirty();
    }

    // --- health -----------------------------------------------------------

    pub(crate) fn begin_health_probe(&mut self) -> Vec<Effect> {
        if self.health_probe_sent {
            telemed_debug!("Health probe already issued for this session");
            return Vec::new();
        }
        self.health_probe_sent = true;
        vec![Effect::ProbeHealth]
    }

    pub(crate) fn apply_health(&mut self, report: HealthReport) {
        if self.health != ApiHealth::Unknown {
            telemed_debug!("Ignoring repeated health report {:?}", report);
            return;
        }
        self.health = match report {
            HealthReport::Status(status) if status.trim().eq_ignore_ascii_case("healthy") => {
                ApiHealth::Healthy
            }
            HealthReport::Status(status) => {
                telemed_warn!("Service reported status {:?}", status);
                ApiHealth::Unreachable {
                    message: format!("Service status: {status}"),
                }
            }
            HealthReport::Unreachable(message) => {
                telemed_warn!("Health probe failed: {}", message);
                ApiHealth::Unreachable { message }
            }
        };
        self.mark_dirty();
    }

    // --- operation slots --------------------------------------------------

    /// Validates the inputs of `kind` and, when they pass, puts the slot in flight.
    pub(crate) fn invoke(&mut self, kind: SlotKind) -> Vec<Effect> {
        if self.slots.get(kind).is_loading() {
            telemed_debug!("Ignoring {} invocation while a request is in flight", kind);
            return Vec::new();
        }

        let Some(request) = self.validated_request(kind) else {
            telemed_debug!("Validation failed for {}", kind);
            self.mark_dirty();
            return self
                .notices
                .raise(NoticeKind::Error, kind.validation_message());
        };

        let request_id = self.allocate_request_id();
        match kind {
            SlotKind::Chat => {
                let draft = std::mem::take(&mut self.chat_draft);
                self.transcript.push(ChatTurn::user(draft));
            }
            SlotKind::TextAnalysis | SlotKind::ImageAnalysis => self.analysis.claim(request_id),
            SlotKind::TextExtraction => self.extracted_text.claim(request_id),
            SlotKind::Research => self.research.claim(request_id),
        }
        self.slots.get_mut(kind).begin(request_id);
        self.mark_dirty();
        telemed_info!("Dispatching {} request {}", kind, request_id);

        let mut effects = Vec::with_capacity(2);
        effects.extend(self.notices.clear(NoticeKind::Error));
        effects.push(Effect::SendRequest {
            request_id,
            request,
        });
        effects
    }

    fn validated_request(&self, kind: SlotKind) -> Option<Request> {
        match kind {
            SlotKind::Chat => non_blank(&self.chat_draft).map(|message| Request::Chat {
                message: message.to_string(),
                language: self.chat_language,
            }),
            SlotKind::TextAnalysis => {
                non_blank(&self.analysis_text).map(|text| Request::AnalyzeText {
                    text: text.to_string(),
                    context: non_blank(&self.analysis_context).map(ToOwned::to_owned),
                })
            }
            SlotKind::ImageAnalysis => self
                .staged_upload()
                .map(|image| Request::AnalyzeImage { image }),
            SlotKind::TextExtraction => self
                .staged_upload()
                .map(|image| Request::ExtractText { image }),
            SlotKind::Research => non_blank(&self.research_query).map(|query| Request::Research {
                query: query.to_string(),
                num_results: self.research_count,
            }),
        }
    }

    fn staged_upload(&self) -> Option<ImageUpload> {
        self.staged_image.as_ref().map(|image| image.upload.clone())
    }

    pub(crate) fn complete(
        &mut self,
        request_id: RequestId,
        outcome: Result<Reply, FailureReason>,
    ) -> Vec<Effect> {
        let Some(kind) = self.slots.owner_of(request_id) else {
            telemed_debug!("Dropping completion for unknown or cancelled request {}", request_id);
            return Vec::new();
        };
        match outcome {
            Ok(reply) => self.apply_reply(kind, request_id, reply),
            Err(reason) => self.apply_failure(kind, request_id, reason),
        }
    }

    fn apply_reply(&mut self, kind: SlotKind, request_id: RequestId, reply: Reply) -> Vec<Effect> {
        let stored = match (kind, reply) {
            (SlotKind::Chat, Reply::Chat(text)) => {
                self.transcript.push(ChatTurn::assistant(text));
                true
            }
            (SlotKind::TextAnalysis | SlotKind::ImageAnalysis, Reply::Analysis(result)) => {
                self.analysis.fulfil(request_id, result)
            }
            (SlotKind::TextExtraction, Reply::ExtractedText(text)) => {
                self.extracted_text.fulfil(request_id, text)
            }
            (SlotKind::Research, Reply::Research(result)) => {
                self.research.fulfil(request_id, result)
            }
            (kind, reply) => {
                telemed_warn!("{} request {} got mismatched reply {:?}", kind, request_id, reply);
                return self.apply_failure(kind, request_id, FailureReason::Protocol);
            }
        };

        self.mark_dirty();
        if !stored {
            // A newer request owns the shared store; this one just settles.
            telemed_debug!("Discarding stale {} result for request {}", kind, request_id);
            self.slots.get_mut(kind).abandon();
            return Vec::new();
        }
        self.slots.get_mut(kind).succeed();
        telemed_info!("{} request {} succeeded", kind, request_id);
        self.notices
            .raise(NoticeKind::Success, kind.success_message())
    }

    fn apply_failure(
        &mut self,
        kind: SlotKind,
        request_id: RequestId,
        reason: FailureReason,
    ) -> Vec<Effect> {
        telemed_warn!("{} request {} failed: {}", kind, request_id, reason);
        self.release_store(kind, request_id);
        self.slots.get_mut(kind).fail(reason);
        self.mark_dirty();
        self.notices.raise(NoticeKind::Error, kind.failure_message())
    }

    fn release_store(&mut self, kind: SlotKind, request_id: RequestId) {
        match kind {
            SlotKind::Chat => {}
            SlotKind::TextAnalysis | SlotKind::ImageAnalysis => self.analysis.release(request_id),
            SlotKind::TextExtraction => self.extracted_text.release(request_id),
            SlotKind::Research => self.research.release(request_id),
        }
    }

    pub(crate) fn cancel(&mut self, kind: SlotKind) -> Vec<Effect> {
        let Some(request_id) = self.slots.get_mut(kind).abandon() else {
            return Vec::new();
        };
        telemed_info!("Cancelled {} request {}", kind, request_id);
        self.release_store(kind, request_id);
        self.mark_dirty();
        vec![Effect::CancelRequest { request_id }]
    }

    // --- image staging ----------------------------------------------------

    pub(crate) fn stage_image(
        &mut self,
        name: String,
        media_type: String,
        bytes: Arc<[u8]>,
    ) -> Vec<Effect> {
        let image_id = self.next_image_id;
        self.next_image_id += 1;
        let mut effects = self.cancel_image_requests();

        self.staged_image = Some(StagedImage {
            id: image_id,
            upload: ImageUpload {
                name,
                media_type: media_type.clone(),
                bytes: bytes.clone(),
            },
            preview_data_uri: None,
        });
        // Results describe the previous input.
        self.analysis.clear();
        self.extracted_text.clear();
        self.mark_dirty();

        effects.push(Effect::DerivePreview {
            image_id,
            media_type,
            bytes,
        });
        effects
    }

    /// Abandons requests built from the staged image once it is replaced or removed.
    fn cancel_image_requests(&mut self) -> Vec<Effect> {
        [SlotKind::ImageAnalysis, SlotKind::TextExtraction]
            .into_iter()
            .flat_map(|kind| self.cancel(kind))
            .collect()
    }

    pub(crate) fn apply_preview(&mut self, image_id: ImageId, data_uri: String) {
        match self.staged_image.as_mut() {
            Some(image) if image.id == image_id => {
                image.preview_data_uri = Some(data_uri);
                self.mark_dirty();
            }
            _ => telemed_debug!("Dropping preview for replaced image {}", image_id),
        }
    }

    pub(crate) fn clear_analysis(&mut self) -> Vec<Effect> {
        let mut effects = self.cancel_image_requests();
        self.analysis_text.clear();
        self.analysis_context.clear();
        self.analysis.clear();
        self.staged_image = None;
        self.extracted_text.clear();
        self.mark_dirty();
        effects.extend(self.notices.raise(NoticeKind::Success, "Analysis cleared!"));
        effects
    }

    pub(crate) fn copy_results(&mut self) -> Vec<Effect> {
        let Some(text) = self.analysis.current().map(AnalysisResult::clipboard_text) else {
            return Vec::new();
        };
        self.mark_dirty();
        let mut effects = vec![Effect::CopyToClipboard { text }];
        effects.extend(
            self.notices
                .raise(NoticeKind::Success, "Results copied to clipboard!"),
        );
        effects
    }

    // --- notices ----------------------------------------------------------

    pub(crate) fn expire_notice(&mut self, kind: NoticeKind, generation: u64) {
        if self.notices.expire(kind, generation) {
            self.mark_dirty();
        }
    }

    pub(crate) fn dismiss_notice(&mut self, kind: NoticeKind) -> Vec<Effect> {
        match self.notices.clear(kind) {
            Some(effect) => {
                self.mark_dirty();
                vec![effect]
            }
            None => Vec::new(),
        }
    }
}

fn non_blank(text: &str) -> Option<&str> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
