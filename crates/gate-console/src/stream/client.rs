use futures_util::StreamExt;
use std::time::Duration;
use timing_protocol::StreamMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::Backoff;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum StreamEvent {
    State(ConnectionState),
    Message(StreamMessage),
}

#[derive(Clone, Debug)]
pub(crate) struct StreamConfig {
    pub(crate) reconnect_floor: Duration,
    pub(crate) reconnect_cap: Duration,
    pub(crate) reconnect_jitter: f64,
    pub(crate) event_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_floor: Duration::from_secs(1),
            reconnect_cap: Duration::from_secs(30),
            reconnect_jitter: 0.2,
            event_capacity: 256,
        }
    }
}

enum StreamControl {
    Connect(String),
}

enum SessionEnd {
    Closed(ConnectionState),
    Superseded(String),
    Shutdown,
}

enum WaitOutcome {
    Elapsed,
    Connect(String),
    Shutdown,
}

/// Handle to the connection task. Dropping it tears the connection down.
pub(crate) struct StreamClient {
    control_tx: mpsc::UnboundedSender<StreamControl>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StreamClient {
    pub(crate) fn spawn(config: StreamConfig) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_stream_loop(
            config,
            control_rx,
            event_tx,
            shutdown.clone(),
        ));
        let client = Self {
            control_tx,
            shutdown,
            task: Some(task),
        };
        (client, event_rx)
    }

    /// Opens a fresh connection, superseding the current one and any pending retry.
    pub(crate) fn connect(&self, url: impl Into<String>) {
        let url = url.into();
        if self.control_tx.send(StreamControl::Connect(url)).is_err() {
            warn!(event = "stream.connect.dropped", "stream task is not running");
        }
    }

    pub(crate) async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(event = "stream.task.join_failed", error = %err);
            }
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_stream_loop(
    config: StreamConfig,
    mut control_rx: mpsc::UnboundedReceiver<StreamControl>,
    event_tx: mpsc::Sender<StreamEvent>,
    shutdown: CancellationToken,
) {
    let mut backoff = Backoff::new(
        config.reconnect_floor,
        config.reconnect_cap,
        config.reconnect_jitter,
    );
    let mut url: Option<String> = None;
    loop {
        let Some(current) = url.clone() else {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                control = control_rx.recv() => match control {
                    Some(StreamControl::Connect(next)) => {
                        url = Some(next);
                        continue;
                    }
                    None => break,
                },
            }
        };

        match run_session(&current, &mut control_rx, &event_tx, &shutdown, &mut backoff).await {
            SessionEnd::Shutdown => break,
            SessionEnd::Superseded(next) => {
                info!(event = "stream.superseded", from = %current, to = %next);
                backoff.reset();
                url = Some(next);
            }
            SessionEnd::Closed(state) => {
                if !emit_state(&event_tx, state).await {
                    break;
                }
                let delay = backoff.next_delay();
                info!(
                    event = "stream.retry",
                    url = %current,
                    state = state.label(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
                match wait_reconnect(&mut control_rx, &shutdown, delay).await {
                    WaitOutcome::Elapsed => {}
                    WaitOutcome::Connect(next) => {
                        backoff.reset();
                        url = Some(next);
                    }
                    WaitOutcome::Shutdown => break,
                }
            }
        }
    }
    let _ = event_tx
        .try_send(StreamEvent::State(ConnectionState::Disconnected));
    info!(event = "stream.stopped");
}

async fn run_session(
    url: &str,
    control_rx: &mut mpsc::UnboundedReceiver<StreamControl>,
    event_tx: &mpsc::Sender<StreamEvent>,
    shutdown: &CancellationToken,
    backoff: &mut Backoff,
) -> SessionEnd {
    if !emit_state(event_tx, ConnectionState::Connecting).await {
        return SessionEnd::Shutdown;
    }
    info!(event = "stream.connect", url = %url);
    let mut socket = tokio::select! {
        _ = shutdown.cancelled() => return SessionEnd::Shutdown,
        control = control_rx.recv() => return superseded(control),
        result = tokio_tungstenite::connect_async(url) => match result {
            Ok((socket, _)) => socket,
            Err(err) => {
                warn!(event = "stream.connect.failed", url = %url, error = %err);
                return SessionEnd::Closed(ConnectionState::Error);
            }
        },
    };
    info!(event = "stream.open", url = %url, "waiting for server info");

    let mut established = false;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = socket.close(None).await;
                return SessionEnd::Shutdown;
            }
            control = control_rx.recv() => {
                let _ = socket.close(None).await;
                return superseded(control);
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let message = match StreamMessage::from_json(&text) {
                        Ok(message) => message,
                        Err(err) => {
                            warn!(
                                event = "stream.message.dropped",
                                error = %err,
                                len = text.len(),
                                "ignoring unusable message"
                            );
                            continue;
                        }
                    };
                    let opens_session = !established
                        && matches!(message, StreamMessage::ServerInfo(_));
                    debug!(event = "stream.message", kind = message.kind(), race = ?message.race_id());
                    if event_tx.send(StreamEvent::Message(message)).await.is_err() {
                        return SessionEnd::Shutdown;
                    }
                    if opens_session {
                        established = true;
                        backoff.reset();
                        if !emit_state(event_tx, ConnectionState::Connected).await {
                            return SessionEnd::Shutdown;
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let state = close_state(frame.as_ref());
                    info!(event = "stream.closed", url = %url, state = state.label(), frame = ?frame);
                    return SessionEnd::Closed(state);
                }
                Some(Ok(Message::Binary(payload))) => {
                    warn!(event = "stream.message.dropped", len = payload.len(), "binary frame");
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(event = "stream.read.failed", url = %url, error = %err);
                    return SessionEnd::Closed(ConnectionState::Error);
                }
                None => {
                    warn!(event = "stream.eof", url = %url, "socket ended without close frame");
                    return SessionEnd::Closed(ConnectionState::Error);
                }
            },
        }
    }
}

fn close_state(frame: Option<&CloseFrame<'_>>) -> ConnectionState {
    match frame.map(|frame| frame.code) {
        None | Some(CloseCode::Normal) | Some(CloseCode::Away) => ConnectionState::Disconnected,
        Some(_) => ConnectionState::Error,
    }
}

fn superseded(control: Option<StreamControl>) -> SessionEnd {
    match control {
        Some(StreamControl::Connect(next)) => SessionEnd::Superseded(next),
        None => SessionEnd::Shutdown,
    }
}

async fn wait_reconnect(
    control_rx: &mut mpsc::UnboundedReceiver<StreamControl>,
    shutdown: &CancellationToken,
    delay: Duration,
) -> WaitOutcome {
    tokio::select! {
        _ = shutdown.cancelled() => WaitOutcome::Shutdown,
        control = control_rx.recv() => match control {
            Some(StreamControl::Connect(next)) => WaitOutcome::Connect(next),
            None => WaitOutcome::Shutdown,
        },
        _ = tokio::time::sleep(delay) => WaitOutcome::Elapsed,
    }
}

async fn emit_state(event_tx: &mpsc::Sender<StreamEvent>, state: ConnectionState) -> bool {
    debug!(event = "stream.state", state = state.label());
    event_tx.send(StreamEvent::State(state)).await.is_ok()
}
