//! TeleMed core: pure session state machine and view-model helpers.
mod effect;
mod msg;
mod notice;
mod slot;
mod state;
mod store;
mod types;
mod update;
mod view_model;

pub use effect::{Effect, Request};
pub use msg::{Msg, Reply};
pub use notice::NOTICE_TTL;
pub use slot::{OperationSlot, SlotPhase};
pub use state::{
    clamp_research_results, AppState, SessionSettings, DEFAULT_RESEARCH_RESULTS,
    MAX_RESEARCH_RESULTS, MIN_RESEARCH_RESULTS,
};
pub use types::{
    AnalysisResult, ApiHealth, ChatTurn, FailureReason, HealthReport, ImageId, ImageUpload,
    Language, Notice, NoticeKind, RequestId, ResearchItem, ResearchResult, Role, SlotKind,
    StagedImage,
};
pub use update::update;
pub use view_model::{AppViewModel, SlotView, StagedImageView};
