use crate::{
    AnalysisResult, ApiHealth, ChatTurn, FailureReason, ImageId, Language, Notice,
    ResearchResult, SlotKind,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub health: ApiHealth,
    pub chat_draft: String,
    pub chat_language: Language,
    pub transcript: Vec<ChatTurn>,
    pub analysis_text: String,
    pub analysis_context: String,
    pub analysis: Option<AnalysisResult>,
    pub staged_image: Option<StagedImageView>,
    pub extracted_text: Option<String>,
    pub research_query: String,
    pub research_count: u8,
    pub research: Option<ResearchResult>,
    pub slots: Vec<SlotView>,
    pub error_notice: Option<Notice>,
    pub success_notice: Option<Notice>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn slot(&self, kind: SlotKind) -> Option<&SlotView> {
        self.slots.iter().find(|slot| slot.kind == kind)
    }

    pub fn is_loading(&self, kind: SlotKind) -> bool {
        self.slot(kind).is_some_and(|slot| slot.loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotView {
    pub kind: SlotKind,
    pub loading: bool,
    pub last_error: Option<FailureReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImageView {
    pub image_id: ImageId,
    pub name: String,
    pub media_type: String,
    pub byte_len: usize,
    pub preview_data_uri: Option<String>,
}
