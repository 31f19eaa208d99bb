use std::io::{self, Write};
use std::sync::mpsc;
use std::thread;

use telemed_core::{
    AnalysisResult, Effect, FailureReason, HealthReport, ImageUpload, Msg, NoticeKind, Reply,
    Request, ResearchItem, ResearchResult,
};
use telemed_engine::{
    AnalysisBody, ApiCall, ApiReply, EngineEvent, EngineHandle, FailureKind, ImageFile,
    ResearchBody, TimerKey,
};
use telemed_logging::{telemed_debug, telemed_info, telemed_warn};

use super::app::Input;
use super::render::Renderer;

const UNREACHABLE_MESSAGE: &str = "Cannot connect to API";

/// Executes core effects against the engine and the local clipboard.
pub struct EffectRunner {
    engine: EngineHandle,
    clipboard: Option<arboard::Clipboard>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        events: mpsc::Receiver<EngineEvent>,
        input_tx: mpsc::Sender<Input>,
    ) -> Self {
        spawn_event_loop(events, input_tx);
        Self {
            engine,
            clipboard: None,
        }
    }

    /// Executes `effects` in order. Text that cannot reach the clipboard is
    /// printed through `renderer` instead.
    pub fn run<W: Write>(
        &mut self,
        effects: Vec<Effect>,
        renderer: &mut Renderer<W>,
    ) -> io::Result<()> {
        for effect in effects {
            match effect {
                Effect::ProbeHealth => self.engine.probe_health(),
                Effect::SendRequest {
                    request_id,
                    request,
                } => {
                    let call = api_call(request);
                    telemed_info!("Submitting request {} to {}", request_id, call.endpoint());
                    self.engine.submit(request_id, call);
                }
                Effect::CancelRequest { request_id } => self.engine.cancel(request_id),
                Effect::ArmNoticeTimer {
                    kind,
                    generation,
                    after,
                } => self.engine.arm_timer(timer_key(kind), generation, after),
                Effect::DisarmNoticeTimer { kind } => self.engine.disarm_timer(timer_key(kind)),
                Effect::DerivePreview {
                    image_id,
                    media_type,
                    bytes,
                } => self.engine.derive_preview(image_id, media_type, bytes),
                Effect::CopyToClipboard { text } => {
                    copy_or_print(self.clipboard(), &text, renderer)?;
                }
            }
        }
        Ok(())
    }

    fn clipboard(&mut self) -> Option<&mut arboard::Clipboard> {
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(err) => telemed_warn!("Clipboard unavailable: {}", err),
            }
        }
        self.clipboard.as_mut()
    }
}

fn copy_or_print<W: Write>(
    clipboard: Option<&mut arboard::Clipboard>,
    text: &str,
    renderer: &mut Renderer<W>,
) -> io::Result<()> {
    if let Some(clipboard) = clipboard {
        match clipboard.set_text(text) {
            Ok(()) => {
                telemed_debug!("Copied {} bytes to clipboard", text.len());
                return Ok(());
            }
            Err(err) => telemed_warn!("Clipboard write failed: {}", err),
        }
    }
    // Headless sessions still get the text.
    renderer.line(text)
}

fn spawn_event_loop(events: mpsc::Receiver<EngineEvent>, input_tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        while let Ok(event) = events.recv() {
            if input_tx.send(Input::Core(event_msg(event))).is_err() {
                break;
            }
        }
        telemed_debug!("Engine event channel closed");
    });
}

fn event_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::HealthChecked(Ok(status)) => Msg::HealthReported(HealthReport::Status(status)),
        EngineEvent::HealthChecked(Err(err)) => {
            telemed_warn!("Health check failed: {}", err);
            Msg::HealthReported(HealthReport::Unreachable(UNREACHABLE_MESSAGE.to_string()))
        }
        EngineEvent::RequestCompleted { request_id, result } => Msg::RequestCompleted {
            request_id,
            outcome: match result {
                Ok(reply) => Ok(core_reply(reply)),
                Err(err) => {
                    telemed_debug!("Request {} failed: {}", request_id, err);
                    Err(failure_reason(err.kind))
                }
            },
        },
        EngineEvent::TimerFired { key, generation } => Msg::NoticeExpired {
            kind: notice_kind(key),
            generation,
        },
        EngineEvent::PreviewReady { image_id, data_uri } => {
            Msg::PreviewDerived { image_id, data_uri }
        }
    }
}

fn api_call(request: Request) -> ApiCall {
    match request {
        Request::Chat { message, language } => ApiCall::Chat {
            message,
            language: language.code().to_string(),
        },
        Request::AnalyzeText { text, context } => ApiCall::AnalyzeText { text, context },
        Request::AnalyzeImage { image } => ApiCall::AnalyzeImage(image_file(image)),
        Request::ExtractText { image } => ApiCall::ExtractText(image_file(image)),
        Request::Research { query, num_results } => ApiCall::Research { query, num_results },
    }
}

fn image_file(upload: ImageUpload) -> ImageFile {
    ImageFile {
        name: upload.name,
        media_type: upload.media_type,
        bytes: upload.bytes,
    }
}

fn core_reply(reply: ApiReply) -> Reply {
    match reply {
        ApiReply::Chat(text) => Reply::Chat(text),
        ApiReply::Analysis(body) => Reply::Analysis(analysis_result(body)),
        ApiReply::ExtractedText(text) => Reply::ExtractedText(text),
        ApiReply::Research(body) => Reply::Research(research_result(body)),
    }
}

fn analysis_result(body: AnalysisBody) -> AnalysisResult {
    AnalysisResult {
        summary: body.summary,
        key_findings: body.key_findings,
        recommendations: body.recommendations,
        next_steps: body.next_steps,
        disclaimer: body.disclaimer,
    }
}

fn research_result(body: ResearchBody) -> ResearchResult {
    ResearchResult {
        summary: body.summary,
        results: body
            .results
            .into_iter()
            .map(|hit| ResearchItem {
                title: hit.title,
                excerpt: hit.excerpt,
                url: hit.url,
                relevance_score: hit.relevance_score,
            })
            .collect(),
    }
}

fn failure_reason(kind: FailureKind) -> FailureReason {
    match kind {
        FailureKind::HttpStatus(code) => FailureReason::HttpStatus(code),
        FailureKind::Timeout => FailureReason::Timeout,
        FailureKind::Protocol => FailureReason::Protocol,
        FailureKind::Network | FailureKind::InvalidRequest | FailureKind::Cancelled => {
            FailureReason::Transport
        }
    }
}

fn timer_key(kind: NoticeKind) -> TimerKey {
    match kind {
        NoticeKind::Error => TimerKey::ErrorNotice,
        NoticeKind::Success => TimerKey::SuccessNotice,
    }
}

fn notice_kind(key: TimerKey) -> NoticeKind {
    match key {
        TimerKey::ErrorNotice => NoticeKind::Error,
        TimerKey::SuccessNotice => NoticeKind::Success,
    }
}
