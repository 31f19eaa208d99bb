mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use telemed_core::{
    update, AnalysisResult, AppState, ChatTurn, Effect, FailureReason, Language, Msg, NoticeKind,
    Reply, Request, ResearchItem, ResearchResult, SlotKind, SlotPhase, NOTICE_TTL,
};

use common::{apply, init_logging, sent_requests, single_request_id};

fn analysis(summary: &str) -> AnalysisResult {
    AnalysisResult {
        summary: summary.to_string(),
        key_findings: vec!["elevated temperature".to_string()],
        recommendations: vec!["hydrate".to_string()],
        next_steps: vec!["follow up in 48h".to_string()],
        disclaimer: Some("informational only".to_string()),
    }
}

fn choose_image(name: &str) -> Msg {
    Msg::ImageChosen {
        name: name.to_string(),
        media_type: "image/png".to_string(),
        bytes: Arc::from(name.as_bytes()),
    }
}

fn error_text(state: &AppState) -> Option<String> {
    state.view().error_notice.map(|notice| notice.text)
}

fn success_text(state: &AppState) -> Option<String> {
    state.view().success_notice.map(|notice| notice.text)
}

#[test]
fn invalid_input_never_reaches_the_network() {
    init_logging();
    let cases = [
        (Msg::SendChatClicked, SlotKind::Chat, "Please enter a message"),
        (
            Msg::AnalyzeTextClicked,
            SlotKind::TextAnalysis,
            "Please enter text to analyze",
        ),
        (
            Msg::AnalyzeImageClicked,
            SlotKind::ImageAnalysis,
            "Please select an image to analyze",
        ),
        (
            Msg::ExtractTextClicked,
            SlotKind::TextExtraction,
            "Please select an image first",
        ),
        (
            Msg::ResearchClicked,
            SlotKind::Research,
            "Please enter a research query",
        ),
    ];

    for (msg, kind, wording) in cases {
        let state = AppState::new();
        let (state, _) = apply(
            state,
            vec![
                Msg::ChatInputChanged("   ".to_string()),
                Msg::AnalysisTextChanged("\n\t".to_string()),
                Msg::ResearchQueryChanged(String::new()),
            ],
        );

        let (next, effects) = update(state, msg);

        assert!(sent_requests(&effects).is_empty(), "{kind} sent a request");
        assert!(!next.is_loading(kind));
        assert_eq!(next.slot(kind).phase(), SlotPhase::Idle);
        assert_eq!(error_text(&next).as_deref(), Some(wording));
        assert_eq!(
            effects,
            vec![Effect::ArmNoticeTimer {
                kind: NoticeKind::Error,
                generation: 1,
                after: NOTICE_TTL,
            }]
        );
    }
}

#[test]
fn loading_spans_invoke_to_completion() {
    init_logging();
    let state = AppState::new();
    assert!(!state.is_loading(SlotKind::Research));

    let (state, effects) = apply(
        state,
        vec![
            Msg::ResearchQueryChanged("diabetes treatment".to_string()),
            Msg::ResearchClicked,
        ],
    );
    let request_id = single_request_id(&effects);
    assert!(state.is_loading(SlotKind::Research));
    assert!(state.view().is_loading(SlotKind::Research));

    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id,
            outcome: Err(FailureReason::Transport),
        },
    );
    assert!(!state.is_loading(SlotKind::Research));
    assert_eq!(
        state.slot(SlotKind::Research).phase(),
        SlotPhase::Failed {
            reason: FailureReason::Transport
        }
    );
}

#[test]
fn chat_success_appends_user_then_assistant_turn() {
    init_logging();
    let state = AppState::new();
    let (state, effects) = apply(
        state,
        vec![
            Msg::ChatInputChanged("What is fever?".to_string()),
            Msg::SendChatClicked,
        ],
    );

    assert_eq!(
        sent_requests(&effects),
        vec![(
            1,
            Request::Chat {
                message: "What is fever?".to_string(),
                language: Language::En,
            }
        )]
    );
    // User turn is recorded before the reply arrives and the draft is emptied.
    assert_eq!(state.transcript(), &[ChatTurn::user("What is fever?")]);
    assert_eq!(state.view().chat_draft, "");

    let (state, effects) = update(
        state,
        Msg::RequestCompleted {
            request_id: 1,
            outcome: Ok(Reply::Chat("A fever is...".to_string())),
        },
    );

    assert_eq!(
        state.transcript(),
        &[
            ChatTurn::user("What is fever?"),
            ChatTurn::assistant("A fever is..."),
        ]
    );
    assert!(!state.is_loading(SlotKind::Chat));
    assert_eq!(success_text(&state).as_deref(), Some("Response received!"));
    assert!(effects.contains(&Effect::ArmNoticeTimer {
        kind: NoticeKind::Success,
        generation: 1,
        after: NOTICE_TTL,
    }));
}

#[test]
fn chat_uses_selected_language() {
    init_logging();
    let (_state, effects) = apply(
        AppState::new(),
        vec![
            Msg::ChatLanguageSelected(Language::Fr),
            Msg::ChatInputChanged("Qu'est-ce que la fièvre ?".to_string()),
            Msg::SendChatClicked,
        ],
    );

    assert_eq!(
        sent_requests(&effects)[0].1,
        Request::Chat {
            message: "Qu'est-ce que la fièvre ?".to_string(),
            language: Language::Fr,
        }
    );
}

#[test]
fn transcript_grows_by_one_per_failure_and_two_per_success() {
    init_logging();
    let outcomes = [true, false, true, false, false];
    let mut state = AppState::new();

    for (index, succeed) in outcomes.iter().enumerate() {
        let (next, effects) = apply(
            state,
            vec![
                Msg::ChatInputChanged(format!("question {index}")),
                Msg::SendChatClicked,
            ],
        );
        let request_id = single_request_id(&effects);
        let outcome = if *succeed {
            Ok(Reply::Chat(format!("answer {index}")))
        } else {
            Err(FailureReason::HttpStatus(502))
        };
        let (next, _) = update(
            next,
            Msg::RequestCompleted {
                request_id,
                outcome,
            },
        );
        state = next;
    }

    let n = outcomes.len();
    let m = outcomes.iter().filter(|ok| **ok).count();
    assert_eq!(state.transcript().len(), n * 2 - (n - m));
    assert_eq!(
        error_text(&state).as_deref(),
        Some("Failed to send message. Please try again.")
    );
}

#[test]
fn empty_text_analysis_keeps_prior_result() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        vec![
            Msg::AnalysisTextChanged("Patient reports headache".to_string()),
            Msg::AnalyzeTextClicked,
        ],
    );
    let request_id = single_request_id(&effects);
    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id,
            outcome: Ok(Reply::Analysis(analysis("first"))),
        },
    );
    assert_eq!(success_text(&state).as_deref(), Some("Analysis complete!"));

    let (state, effects) = apply(
        state,
        vec![
            Msg::AnalysisTextChanged("   ".to_string()),
            Msg::AnalyzeTextClicked,
        ],
    );

    assert!(sent_requests(&effects).is_empty());
    assert_eq!(
        error_text(&state).as_deref(),
        Some("Please enter text to analyze")
    );
    assert_eq!(state.view().analysis, Some(analysis("first")));
}

#[test]
fn text_analysis_sends_context_only_when_present() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        vec![
            Msg::AnalysisTextChanged("CBC: WBC 12k".to_string()),
            Msg::AnalysisContextChanged("  ".to_string()),
            Msg::AnalyzeTextClicked,
        ],
    );
    assert_eq!(
        sent_requests(&effects)[0].1,
        Request::AnalyzeText {
            text: "CBC: WBC 12k".to_string(),
            context: None,
        }
    );

    let (state, _) = update(state, Msg::CancelRequested(SlotKind::TextAnalysis));
    let (_state, effects) = apply(
        state,
        vec![
            Msg::AnalysisContextChanged("post-op day 2".to_string()),
            Msg::AnalyzeTextClicked,
        ],
    );
    assert_eq!(
        sent_requests(&effects)[0].1,
        Request::AnalyzeText {
            text: "CBC: WBC 12k".to_string(),
            context: Some("post-op day 2".to_string()),
        }
    );
}

#[test]
fn result_is_hidden_while_loading_and_restored_on_http_error() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        vec![choose_image("scan.png"), Msg::AnalyzeImageClicked],
    );
    let first = single_request_id(&effects);
    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id: first,
            outcome: Ok(Reply::Analysis(analysis("previous"))),
        },
    );
    assert_eq!(
        success_text(&state).as_deref(),
        Some("Image analysis complete!")
    );

    let (state, effects) = update(state, Msg::AnalyzeImageClicked);
    let second = single_request_id(&effects);
    assert!(state.is_loading(SlotKind::ImageAnalysis));
    assert_eq!(state.view().analysis, None);

    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id: second,
            outcome: Err(FailureReason::HttpStatus(500)),
        },
    );

    assert!(!state.is_loading(SlotKind::ImageAnalysis));
    assert_eq!(
        error_text(&state).as_deref(),
        Some("Failed to analyze image. Please try again.")
    );
    assert_eq!(state.view().success_notice, None);
    assert_eq!(state.view().analysis, Some(analysis("previous")));
}

#[test]
fn research_result_replaces_previous_summary() {
    init_logging();
    let items = |n: usize| -> Vec<ResearchItem> {
        (0..n)
            .map(|i| ResearchItem {
                title: format!("Study {i}"),
                excerpt: "Metformin remains first-line".to_string(),
                url: Some(format!("https://example.org/{i}")),
                relevance_score: Some(0.9),
            })
            .collect()
    };

    let (state, effects) = apply(
        AppState::new(),
        vec![
            Msg::ResearchQueryChanged("diabetes treatment".to_string()),
            Msg::ResearchCountChanged(5),
            Msg::ResearchClicked,
        ],
    );
    assert_eq!(
        sent_requests(&effects),
        vec![(
            1,
            Request::Research {
                query: "diabetes treatment".to_string(),
                num_results: 5,
            }
        )]
    );
    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id: 1,
            outcome: Ok(Reply::Research(ResearchResult {
                summary: "old summary".to_string(),
                results: items(1),
            })),
        },
    );

    let (state, effects) = update(state, Msg::ResearchClicked);
    let request_id = single_request_id(&effects);
    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id,
            outcome: Ok(Reply::Research(ResearchResult {
                summary: "new summary".to_string(),
                results: items(3),
            })),
        },
    );

    let research = state.view().research.expect("research stored");
    assert_eq!(research.summary, "new summary");
    assert_eq!(research.results, items(3));
    assert_eq!(success_text(&state).as_deref(), Some("Research complete!"));
}

#[test]
fn research_count_is_clamped() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::ResearchCountChanged(0));
    assert_eq!(state.view().research_count, 1);
    let (state, _) = update(state, Msg::ResearchCountChanged(42));
    assert_eq!(state.view().research_count, 10);
}

#[test]
fn second_invoke_while_in_flight_is_ignored() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        vec![
            Msg::ChatInputChanged("first".to_string()),
            Msg::SendChatClicked,
            Msg::ChatInputChanged("second".to_string()),
            Msg::SendChatClicked,
        ],
    );

    assert_eq!(sent_requests(&effects).len(), 1);
    assert_eq!(state.transcript(), &[ChatTurn::user("first")]);
    assert_eq!(state.view().chat_draft, "second");
}

#[test]
fn cancel_returns_slot_to_idle_and_drops_late_reply() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        vec![
            Msg::ResearchQueryChanged("asthma".to_string()),
            Msg::ResearchClicked,
        ],
    );
    let request_id = single_request_id(&effects);

    let (state, effects) = update(state, Msg::CancelRequested(SlotKind::Research));
    assert_eq!(effects, vec![Effect::CancelRequest { request_id }]);
    assert!(!state.is_loading(SlotKind::Research));

    let (mut state, effects) = update(
        state,
        Msg::RequestCompleted {
            request_id,
            outcome: Ok(Reply::Research(ResearchResult::default())),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().research, None);
    assert_eq!(state.slot(SlotKind::Research).phase(), SlotPhase::Idle);

    state.consume_dirty();
    let (mut state, effects) = update(state, Msg::CancelRequested(SlotKind::Research));
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
}

#[test]
fn failure_in_one_slot_leaves_others_untouched() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        vec![
            Msg::ChatInputChanged("hello".to_string()),
            Msg::SendChatClicked,
            Msg::ResearchQueryChanged("influenza".to_string()),
            Msg::ResearchClicked,
        ],
    );
    let ids: Vec<_> = sent_requests(&effects).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![1, 2]);

    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id: 2,
            outcome: Err(FailureReason::Timeout),
        },
    );

    assert!(state.is_loading(SlotKind::Chat));
    assert_eq!(state.slot(SlotKind::Chat).last_error(), None);
    assert_eq!(
        state.slot(SlotKind::Research).last_error(),
        Some(FailureReason::Timeout)
    );

    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id: 1,
            outcome: Ok(Reply::Chat("hi".to_string())),
        },
    );
    assert_eq!(state.transcript().len(), 2);
    assert_eq!(
        state.slot(SlotKind::Research).last_error(),
        Some(FailureReason::Timeout)
    );
}

#[test]
fn new_invoke_clears_the_previous_error_notice() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::SendChatClicked);
    assert!(error_text(&state).is_some());

    let (state, effects) = apply(
        state,
        vec![
            Msg::ChatInputChanged("retry".to_string()),
            Msg::SendChatClicked,
        ],
    );

    assert_eq!(error_text(&state), None);
    assert_eq!(
        effects[0],
        Effect::DisarmNoticeTimer {
            kind: NoticeKind::Error
        }
    );
    assert_eq!(sent_requests(&effects).len(), 1);
}

#[test]
fn mismatched_reply_is_a_protocol_failure() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        vec![
            Msg::ResearchQueryChanged("gout".to_string()),
            Msg::ResearchClicked,
        ],
    );
    let request_id = single_request_id(&effects);

    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id,
            outcome: Ok(Reply::Chat("not research".to_string())),
        },
    );

    assert_eq!(
        state.slot(SlotKind::Research).last_error(),
        Some(FailureReason::Protocol)
    );
    assert_eq!(state.view().research, None);
}

#[test]
fn stale_analysis_write_is_rejected() {
    init_logging();
    let (state, effects) = apply(
        AppState::new(),
        vec![
            Msg::AnalysisTextChanged("report".to_string()),
            Msg::AnalyzeTextClicked,
            choose_image("xray.png"),
            Msg::AnalyzeImageClicked,
        ],
    );
    let ids: Vec<_> = sent_requests(&effects).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![1, 2]);

    let (state, effects) = update(
        state,
        Msg::RequestCompleted {
            request_id: 2,
            outcome: Ok(Reply::Analysis(analysis("from image"))),
        },
    );
    assert!(!effects.is_empty());

    let (state, effects) = update(
        state,
        Msg::RequestCompleted {
            request_id: 1,
            outcome: Ok(Reply::Analysis(analysis("from text"))),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.is_loading(SlotKind::TextAnalysis));
    assert_eq!(state.view().analysis, Some(analysis("from image")));
}

#[test]
fn text_analysis_still_lands_after_image_analysis_fails() {
    init_logging();
    let (state, _) = apply(
        AppState::new(),
        vec![
            Msg::AnalysisTextChanged("report".to_string()),
            Msg::AnalyzeTextClicked,
            choose_image("xray.png"),
            Msg::AnalyzeImageClicked,
        ],
    );

    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id: 2,
            outcome: Err(FailureReason::HttpStatus(500)),
        },
    );
    assert!(state.is_loading(SlotKind::TextAnalysis));

    let (state, effects) = update(
        state,
        Msg::RequestCompleted {
            request_id: 1,
            outcome: Ok(Reply::Analysis(analysis("from text"))),
        },
    );

    assert!(!effects.is_empty());
    assert_eq!(state.view().analysis, Some(analysis("from text")));
    assert_eq!(success_text(&state).as_deref(), Some("Analysis complete!"));
    assert_eq!(
        state.slot(SlotKind::TextAnalysis).phase(),
        SlotPhase::Succeeded
    );
}

#[test]
fn earlier_analysis_shows_until_later_one_settles() {
    init_logging();
    let (state, _) = apply(
        AppState::new(),
        vec![
            Msg::AnalysisTextChanged("report".to_string()),
            Msg::AnalyzeTextClicked,
            choose_image("xray.png"),
            Msg::AnalyzeImageClicked,
        ],
    );

    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id: 1,
            outcome: Ok(Reply::Analysis(analysis("from text"))),
        },
    );
    assert_eq!(state.view().analysis, Some(analysis("from text")));
    assert!(state.is_loading(SlotKind::ImageAnalysis));

    let (state, _) = update(
        state,
        Msg::RequestCompleted {
            request_id: 2,
            outcome: Ok(Reply::Analysis(analysis("from image"))),
        },
    );
    assert_eq!(state.view().analysis, Some(analysis("from image")));
}
