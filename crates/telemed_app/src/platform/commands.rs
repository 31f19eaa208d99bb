use std::path::PathBuf;

use telemed_core::{Language, Msg, NoticeKind, SlotKind};

/// One parsed line of terminal input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dispatch(Vec<Msg>),
    /// Read a local image file and stage it.
    ChooseImage(PathBuf),
    Status,
    Help,
    Quit,
    Unknown(String),
}

/// Parses a terminal line. Blank lines yield `None`.
///
/// Text commands carry the rest of the line verbatim, so an empty payload
/// reaches the core and fails its validation there.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let trimmed = line.trim_start();
    let (verb, rest) = match trimmed.split_once(' ') {
        Some((verb, rest)) => (verb, rest),
        None => (trimmed, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "chat" => submit(Msg::ChatInputChanged(rest.to_string()), Msg::SendChatClicked),
        "lang" => match Language::from_code(rest.trim()) {
            Some(language) => Command::Dispatch(vec![Msg::ChatLanguageSelected(language)]),
            None => Command::Unknown(format!("unknown language {:?}", rest.trim())),
        },
        "analyze" => submit(
            Msg::AnalysisTextChanged(rest.to_string()),
            Msg::AnalyzeTextClicked,
        ),
        "context" => Command::Dispatch(vec![Msg::AnalysisContextChanged(rest.to_string())]),
        "image" if !rest.trim().is_empty() => Command::ChooseImage(PathBuf::from(rest.trim())),
        "image" => Command::Unknown("image needs a file path".to_string()),
        "analyze-image" => Command::Dispatch(vec![Msg::AnalyzeImageClicked]),
        "extract-text" => Command::Dispatch(vec![Msg::ExtractTextClicked]),
        "research" => submit(
            Msg::ResearchQueryChanged(rest.to_string()),
            Msg::ResearchClicked,
        ),
        "count" => match rest.trim().parse::<u32>() {
            Ok(count) => Command::Dispatch(vec![Msg::ResearchCountChanged(count)]),
            Err(_) => Command::Unknown(format!("count expects a number, got {:?}", rest.trim())),
        },
        "copy" => Command::Dispatch(vec![Msg::CopyResultsClicked]),
        "clear" => Command::Dispatch(vec![Msg::AnalysisCleared]),
        "cancel" => match slot_kind(rest.trim()) {
            Some(kind) => Command::Dispatch(vec![Msg::CancelRequested(kind)]),
            None => Command::Unknown(format!("nothing to cancel named {:?}", rest.trim())),
        },
        "dismiss" => match rest.trim() {
            "error" => Command::Dispatch(vec![Msg::NoticeDismissed(NoticeKind::Error)]),
            "success" => Command::Dispatch(vec![Msg::NoticeDismissed(NoticeKind::Success)]),
            other => Command::Unknown(format!("unknown notice {other:?}")),
        },
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(format!("unknown command {other:?}")),
    };
    Some(command)
}

fn submit(edit: Msg, click: Msg) -> Command {
    Command::Dispatch(vec![edit, click])
}

fn slot_kind(name: &str) -> Option<SlotKind> {
    match name {
        "chat" => Some(SlotKind::Chat),
        "text" => Some(SlotKind::TextAnalysis),
        "image" => Some(SlotKind::ImageAnalysis),
        "extract" => Some(SlotKind::TextExtraction),
        "research" => Some(SlotKind::Research),
        _ => None,
    }
}

pub const HELP: &str = "\
Commands:
  chat <message>         send a chat message
  lang en|fr             choose the chat reply language
  analyze <text>         analyze a medical report
  context <text>         set optional context for text analysis
  image <path>           stage a local image
  analyze-image          analyze the staged image
  extract-text           extract text from the staged image
  research <query>       search medical literature
  count <1-10>           number of research results
  copy                   copy the analysis to the clipboard
  clear                  clear analysis inputs and results
  cancel <chat|text|image|extract|research>
  dismiss error|success  hide a notice
  status                 show loading state of every operation
  help                   show this text
  quit                   leave";
