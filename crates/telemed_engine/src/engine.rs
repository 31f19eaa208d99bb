use std::collections::HashMap;
use std::io;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use telemed_logging::{telemed_debug, telemed_info};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::client::{ApiClient, ApiSettings, ReqwestApiClient};
use crate::preview::data_uri;
use crate::{ApiCall, ApiError, EngineEvent, FailureKind, ImageId, RequestId, TimerKey};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error("failed to build http client: {0}")]
    Client(#[from] ApiError),
}

enum EngineCommand {
    Submit {
        request_id: RequestId,
        call: ApiCall,
    },
    Cancel {
        request_id: RequestId,
    },
    ProbeHealth,
    ArmTimer {
        key: TimerKey,
        generation: u64,
        after: Duration,
    },
    DisarmTimer {
        key: TimerKey,
    },
    DerivePreview {
        image_id: ImageId,
        media_type: String,
        bytes: Arc<[u8]>,
    },
}

/// Cheap, cloneable front of the engine thread. Results come back on the
/// receiver returned by [`EngineHandle::start`].
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn with_settings(
        settings: ApiSettings,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), EngineError> {
        let client = ReqwestApiClient::new(settings)?;
        Self::start(Arc::new(client))
    }

    pub fn start(
        client: Arc<dyn ApiClient>,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), EngineError> {
        let runtime = Runtime::new()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let mut worker = Worker {
                runtime,
                client,
                event_tx,
                in_flight: Arc::new(Mutex::new(HashMap::new())),
                timers: HashMap::new(),
            };
            while let Ok(command) = cmd_rx.recv() {
                worker.handle(command);
            }
            telemed_debug!("Engine command channel closed");
        });

        Ok((Self { cmd_tx }, event_rx))
    }

    pub fn submit(&self, request_id: RequestId, call: ApiCall) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { request_id, call });
    }

    pub fn cancel(&self, request_id: RequestId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { request_id });
    }

    pub fn probe_health(&self) {
        let _ = self.cmd_tx.send(EngineCommand::ProbeHealth);
    }

    /// Starts a one-shot timer; a running timer with the same key is cancelled first.
    pub fn arm_timer(&self, key: TimerKey, generation: u64, after: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::ArmTimer {
            key,
            generation,
            after,
        });
    }

    pub fn disarm_timer(&self, key: TimerKey) {
        let _ = self.cmd_tx.send(EngineCommand::DisarmTimer { key });
    }

    pub fn derive_preview(&self, image_id: ImageId, media_type: String, bytes: Arc<[u8]>) {
        let _ = self.cmd_tx.send(EngineCommand::DerivePreview {
            image_id,
            media_type,
            bytes,
        });
    }
}

struct Worker {
    runtime: Runtime,
    client: Arc<dyn ApiClient>,
    event_tx: mpsc::Sender<EngineEvent>,
    in_flight: Arc<Mutex<HashMap<RequestId, CancellationToken>>>,
    timers: HashMap<TimerKey, CancellationToken>,
}

impl Worker {
    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Submit { request_id, call } => self.submit(request_id, call),
            EngineCommand::Cancel { request_id } => {
                if let Some(token) = lock(&self.in_flight).remove(&request_id) {
                    telemed_info!("Cancelling request {}", request_id);
                    token.cancel();
                }
            }
            EngineCommand::ProbeHealth => {
                let client = self.client.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = client.health().await;
                    let _ = event_tx.send(EngineEvent::HealthChecked(result));
                });
            }
            EngineCommand::ArmTimer {
                key,
                generation,
                after,
            } => self.arm_timer(key, generation, after),
            EngineCommand::DisarmTimer { key } => {
                if let Some(token) = self.timers.remove(&key) {
                    token.cancel();
                }
            }
            EngineCommand::DerivePreview {
                image_id,
                media_type,
                bytes,
            } => {
                let event_tx = self.event_tx.clone();
                self.runtime.spawn_blocking(move || {
                    let data_uri = data_uri(&media_type, &bytes);
                    let _ = event_tx.send(EngineEvent::PreviewReady { image_id, data_uri });
                });
            }
        }
    }

    fn submit(&mut self, request_id: RequestId, call: ApiCall) {
        let token = CancellationToken::new();
        lock(&self.in_flight).insert(request_id, token.clone());

        let client = self.client.clone();
        let event_tx = self.event_tx.clone();
        let in_flight = self.in_flight.clone();
        self.runtime.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    Err(ApiError::new(FailureKind::Cancelled, "cancelled by user"))
                }
                result = client.call(&call) => result,
            };
            lock(&in_flight).remove(&request_id);
            match result {
                Err(err) if err.kind == FailureKind::Cancelled => {
                    telemed_debug!("Request {} ({}) cancelled", request_id, call.endpoint());
                }
                result => {
                    let _ = event_tx.send(EngineEvent::RequestCompleted { request_id, result });
                }
            }
        });
    }

    fn arm_timer(&mut self, key: TimerKey, generation: u64, after: Duration) {
        let token = CancellationToken::new();
        if let Some(previous) = self.timers.insert(key, token.clone()) {
            previous.cancel();
        }

        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = event_tx.send(EngineEvent::TimerFired { key, generation });
                }
            }
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
