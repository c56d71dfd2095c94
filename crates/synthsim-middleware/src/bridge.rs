//! Reconnecting WebSocket client for an external robot program.
//!
//! [`HalBridge`] owns one background Tokio task which:
//!
//! 1. **Connects** to the configured HALSim endpoint, retrying every
//!    `reconnect_interval_ms` for as long as the bridge is running.
//!
//! 2. **Ingests** inbound motor frames into the shared [`PortStates`] map,
//!    which the simulation tick reads synchronously.
//!
//! 3. **Sends** outbound frames (encoder readings) posted through
//!    [`HalBridge::send`].  Only the latest frame per device is kept, so a
//!    slow or absent robot program never builds a backlog.
//!
//! Connection changes are published as [`StatusEvent`]s on a broadcast
//! channel.  Failures never reach the tick: the last-known port values stay
//! in place until new frames arrive.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use synthsim_types::SimError;
use tokio::runtime::Handle;
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ports::PortStates;
use crate::protocol::HalFrame;

const STATUS_CAPACITY: usize = 64;

/// `[bridge]` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enabled: bool,
    pub url: String,
    pub reconnect_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "ws://localhost:3300/wpilibws".to_string(),
            reconnect_interval_ms: 1000,
        }
    }
}

/// Connection state reported by the bridge task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeStatus {
    Open,
    Error(String),
    Closed,
}

/// A [`BridgeStatus`] with the time it was observed.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub status: BridgeStatus,
    pub at: DateTime<Utc>,
}

/// Latest outbound frame per `(type, device)` slot.
#[derive(Clone, Default)]
struct Outbox {
    pending: Arc<Mutex<BTreeMap<String, String>>>,
    notify: Arc<Notify>,
}

impl Outbox {
    fn put(&self, slot: String, text: String) {
        self.lock().insert(slot, text);
        self.notify.notify_one();
    }

    fn take_all(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock()).into_values().collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct HalBridge {
    config: BridgeConfig,
    ports: PortStates,
    status_tx: broadcast::Sender<StatusEvent>,
    outbox: Outbox,
    started: bool,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl HalBridge {
    pub fn new(config: BridgeConfig) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            ports: PortStates::new(),
            status_tx,
            outbox: Outbox::default(),
            started: false,
            shutdown_tx,
            task: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Shared handle to the inbound port values.
    pub fn ports(&self) -> PortStates {
        self.ports.clone()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Spawn the connection task on `handle`.
    ///
    /// A disabled bridge logs and stays idle.  A bridge can only be started
    /// once.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Bridge`] when the bridge was already started or
    /// shut down.
    pub fn start(&mut self, handle: &Handle) -> Result<(), SimError> {
        if !self.config.enabled {
            info!(url = %self.config.url, "bridge disabled; not connecting");
            return Ok(());
        }
        if self.started {
            return Err(SimError::Bridge("bridge already started".to_string()));
        }
        self.started = true;

        let task = handle.spawn(run_connection(
            self.config.clone(),
            self.ports.clone(),
            self.status_tx.clone(),
            self.outbox.clone(),
            self.shutdown_tx.subscribe(),
        ));
        self.task = Some(task);
        info!(url = %self.config.url, "bridge started");
        Ok(())
    }

    /// Post `frame` for the robot program, replacing any unsent frame for
    /// the same device.  Returns `false` (and drops the frame) when the
    /// connection task is not running.
    ///
    /// The latest frame posted while the socket is down is sent after the
    /// next successful connect.
    pub fn send(&self, frame: &HalFrame) -> Result<bool, SimError> {
        if !self.is_running() {
            return Ok(false);
        }
        let text = frame.to_json()?;
        let slot = format!("{}:{}", frame.frame_type, frame.device);
        self.outbox.put(slot, text);
        Ok(true)
    }

    /// Number of frames waiting to be written.  At most one per device.
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Stop the connection task.  Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(task) = self.task.take() {
            task.abort();
            info!(url = %self.config.url, "bridge shut down");
        }
    }
}

impl Drop for HalBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn emit(status_tx: &broadcast::Sender<StatusEvent>, status: BridgeStatus) {
    // No subscribers is a normal condition.
    let _ = status_tx.send(StatusEvent {
        status,
        at: Utc::now(),
    });
}

async fn run_connection(
    config: BridgeConfig,
    ports: PortStates,
    status_tx: broadcast::Sender<StatusEvent>,
    outbox: Outbox,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let retry = Duration::from_millis(config.reconnect_interval_ms.max(1));

    while !*shutdown_rx.borrow() {
        match connect_async(config.url.as_str()).await {
            Ok((stream, _)) => {
                let session = Uuid::new_v4();
                info!(url = %config.url, %session, "bridge connected");
                emit(&status_tx, BridgeStatus::Open);

                let (mut ws_tx, mut ws_rx) = stream.split();
                loop {
                    tokio::select! {
                        msg = ws_rx.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    handle_inbound(&ports, text.as_str());
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    info!(%session, "bridge connection closed by peer");
                                    emit(&status_tx, BridgeStatus::Closed);
                                    break;
                                }
                                Some(Err(e)) => {
                                    warn!(%session, error = %e, "bridge read error");
                                    emit(&status_tx, BridgeStatus::Error(e.to_string()));
                                    break;
                                }
                                _ => {}
                            }
                        }
                        _ = outbox.notify.notified() => {
                            if let Err(e) = flush(&mut ws_tx, outbox.take_all()).await {
                                warn!(%session, error = %e, "bridge write error");
                                emit(&status_tx, BridgeStatus::Error(e.to_string()));
                                break;
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            let _ = ws_tx.send(Message::Close(None)).await;
                            emit(&status_tx, BridgeStatus::Closed);
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(url = %config.url, error = %e, "bridge connect failed");
                emit(&status_tx, BridgeStatus::Error(e.to_string()));
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(retry) => {}
            _ = shutdown_rx.changed() => return,
        }
    }
}

async fn flush<S>(ws_tx: &mut S, frames: Vec<String>) -> Result<(), S::Error>
where
    S: futures_util::Sink<Message> + Unpin,
{
    for text in frames {
        ws_tx.feed(Message::Text(text.into())).await?;
    }
    ws_tx.flush().await
}

fn handle_inbound(ports: &PortStates, text: &str) {
    match HalFrame::parse(text) {
        Ok(frame) => {
            if !ports.apply_frame(&frame) {
                debug!(frame_type = %frame.frame_type, "ignoring frame");
            }
        }
        Err(e) => debug!(error = %e, "dropping malformed frame"),
    }
}
