#![allow(dead_code)]

use std::sync::Once;

use telemed_core::{update, AppState, Effect, Msg, Request, RequestId};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(telemed_logging::initialize_for_tests);
}

pub fn apply(state: AppState, msgs: Vec<Msg>) -> (AppState, Vec<Effect>) {
    let mut state = state;
    let mut effects = Vec::new();
    for msg in msgs {
        let (next, produced) = update(state, msg);
        state = next;
        effects.extend(produced);
    }
    (state, effects)
}

pub fn sent_requests(effects: &[Effect]) -> Vec<(RequestId, Request)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::SendRequest {
                request_id,
                request,
            } => Some((*request_id, request.clone())),
            _ => None,
        })
        .collect()
}

pub fn single_request_id(effects: &[Effect]) -> RequestId {
    let sent = sent_requests(effects);
    assert_eq!(sent.len(), 1, "expected exactly one request in {effects:?}");
    sent[0].0
}
