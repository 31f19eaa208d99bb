//! TeleMed engine: HTTP calls, timers and other effect execution.
mod client;
mod engine;
mod preview;
mod types;

pub use client::{ApiClient, ApiSettings, ReqwestApiClient, DEFAULT_BASE_URL};
pub use engine::{EngineError, EngineHandle};
pub use preview::{data_uri, media_type_for_path};
pub use types::{
    AnalysisBody, ApiCall, ApiError, ApiReply, EngineEvent, FailureKind, ImageFile, ImageId,
    RequestId, ResearchBody, ResearchHit, TimerKey,
};
