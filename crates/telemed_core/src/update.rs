use crate::{AppState, Effect, Msg, SlotKind};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionStarted => state.begin_health_probe(),
        Msg::HealthReported(report) => {
            state.apply_health(report);
            Vec::new()
        }
        Msg::ChatInputChanged(text) => {
            state.set_chat_draft(text);
            Vec::new()
        }
        Msg::ChatLanguageSelected(language) => {
            state.set_chat_language(language);
            Vec::new()
        }
        Msg::SendChatClicked => state.invoke(SlotKind::Chat),
        Msg::AnalysisTextChanged(text) => {
            state.set_analysis_text(text);
            Vec::new()
        }
        Msg::AnalysisContextChanged(text) => {
            state.set_analysis_context(text);
            Vec::new()
        }
        Msg::AnalyzeTextClicked => state.invoke(SlotKind::TextAnalysis),
        Msg::ImageChosen {
            name,
            media_type,
            bytes,
        } => state.stage_image(name, media_type, bytes),
        Msg::PreviewDerived { image_id, data_uri } => {
            state.apply_preview(image_id, data_uri);
            Vec::new()
        }
        Msg::AnalyzeImageClicked => state.invoke(SlotKind::ImageAnalysis),
        Msg::ExtractTextClicked => state.invoke(SlotKind::TextExtraction),
        Msg::CopyResultsClicked => state.copy_results(),
        Msg::AnalysisCleared => state.clear_analysis(),
        Msg::ResearchQueryChanged(text) => {
            state.set_research_query(text);
            Vec::new()
        }
        Msg::ResearchCountChanged(count) => {
            state.set_research_count(count);
            Vec::new()
        }
        Msg::ResearchClicked => state.invoke(SlotKind::Research),
        Msg::CancelRequested(kind) => state.cancel(kind),
        Msg::RequestCompleted {
            request_id,
            outcome,
        } => state.complete(request_id, outcome),
        Msg::NoticeExpired { kind, generation } => {
            state.expire_notice(kind, generation);
            Vec::new()
        }
        Msg::NoticeDismissed(kind) => state.dismiss_notice(kind),
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
