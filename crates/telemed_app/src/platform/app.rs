use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::Context;
use telemed_core::{update, AppState, Msg, SlotKind};
use telemed_engine::{media_type_for_path, EngineHandle};
use telemed_logging::{parse_level, telemed_info, telemed_warn};

use super::commands::{parse_command, Command};
use super::config::{load_config, AppConfig, DEFAULT_CONFIG_FILE};
use super::effects::EffectRunner;
use super::logging;
use super::render::Renderer;

/// Everything the main loop reacts to, in arrival order.
pub enum Input {
    Core(Msg),
    Line(String),
    Closed,
}

pub fn run_app() -> anyhow::Result<()> {
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let (config, config_error) = match load_config(&config_path) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };

    logging::initialize(config.log_destination, parse_level(&config.log_level));
    if let Some(err) = config_error {
        telemed_warn!("{}; continuing with default configuration", err);
    }

    let api = config
        .api_settings()
        .context("default API settings are invalid")?;
    telemed_info!("Using TeleMed service at {}", api.base_url);
    let (engine, events) = EngineHandle::with_settings(api).context("failed to start engine")?;

    let (input_tx, input_rx) = mpsc::channel();
    let mut effects = EffectRunner::new(engine, events, input_tx.clone());
    spawn_stdin_reader(input_tx);

    let settings = config.session_settings();
    let mut state = AppState::with_settings(settings.clone());
    let mut renderer = Renderer::new(io::stdout(), settings.notice_ttl, state.view());
    renderer.line("TeleMed assistant. Type `help` for commands.")?;
    renderer.health(&state.view())?;

    state = step(state, Msg::SessionStarted, &mut effects, &mut renderer)?;

    while let Ok(input) = input_rx.recv() {
        let msgs = match input {
            Input::Core(msg) => vec![msg],
            Input::Closed => break,
            Input::Line(line) => match parse_command(&line) {
                None => continue,
                Some(Command::Dispatch(msgs)) => msgs,
                Some(Command::ChooseImage(path)) => match read_image(&path) {
                    Ok(msg) => vec![msg],
                    Err(err) => {
                        telemed_warn!("Failed to read image {:?}: {:#}", path, err);
                        renderer.line(&format!("Cannot read image: {err:#}"))?;
                        continue;
                    }
                },
                Some(Command::Status) => {
                    renderer.status(&state.view())?;
                    continue;
                }
                Some(Command::Help) => {
                    renderer.help()?;
                    continue;
                }
                Some(Command::Quit) => break,
                Some(Command::Unknown(reason)) => {
                    renderer.line(&reason)?;
                    renderer.help()?;
                    continue;
                }
            },
        };

        for msg in msgs {
            state = step(state, msg, &mut effects, &mut renderer)?;
        }
    }

    telemed_info!("Session ended");
    Ok(())
}

fn step<W: Write>(
    state: AppState,
    msg: Msg,
    effects: &mut EffectRunner,
    renderer: &mut Renderer<W>,
) -> io::Result<AppState> {
    if let Some(kind) = busy_slot(&state, &msg) {
        renderer.line(&format!(
            "Still waiting for the previous {kind} request; try again when it is done."
        ))?;
    }
    let (mut state, pending) = update(state, msg);
    effects.run(pending, renderer)?;
    if state.consume_dirty() {
        renderer.render(&state.view())?;
    }
    Ok(state)
}

/// The slot `msg` would invoke, when that slot is still in flight.
fn busy_slot(state: &AppState, msg: &Msg) -> Option<SlotKind> {
    let kind = match msg {
        Msg::SendChatClicked => SlotKind::Chat,
        Msg::AnalyzeTextClicked => SlotKind::TextAnalysis,
        Msg::AnalyzeImageClicked => SlotKind::ImageAnalysis,
        Msg::ExtractTextClicked => SlotKind::TextExtraction,
        Msg::ResearchClicked => SlotKind::Research,
        _ => return None,
    };
    state.is_loading(kind).then_some(kind)
}

fn spawn_stdin_reader(input_tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = input_tx.send(Input::Closed);
    });
}

fn read_image(path: &Path) -> anyhow::Result<Msg> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Msg::ImageChosen {
        name,
        media_type: media_type_for_path(path).to_string(),
        bytes: Arc::from(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn image_file_becomes_image_chosen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rash.JPG");
        fs::File::create(&path)
            .unwrap()
            .write_all(b"\xff\xd8jpeg")
            .unwrap();

        match read_image(&path).unwrap() {
            Msg::ImageChosen {
                name,
                media_type,
                bytes,
            } => {
                assert_eq!(name, "rash.JPG");
                assert_eq!(media_type, "image/jpeg");
                assert_eq!(&bytes[..], b"\xff\xd8jpeg");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_image(&dir.path().join("none.png")).is_err());
    }

    #[test]
    fn repeated_send_reports_busy_slot() {
        let (state, _) = update(AppState::new(), Msg::ChatInputChanged("first".to_string()));
        assert_eq!(busy_slot(&state, &Msg::SendChatClicked), None);

        let (state, _) = update(state, Msg::SendChatClicked);
        assert_eq!(busy_slot(&state, &Msg::SendChatClicked), Some(SlotKind::Chat));
        assert_eq!(busy_slot(&state, &Msg::ResearchClicked), None);
        assert_eq!(busy_slot(&state, &Msg::ChatInputChanged("x".to_string())), None);
    }
}
