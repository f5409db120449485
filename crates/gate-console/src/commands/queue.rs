use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use timing_protocol::command::{
    CommandRequest, RemovalReason, RemoveFromCourseRequest, ScoringRequest, TimingChannel,
    TimingRequest,
};
use timing_protocol::PenaltyValue;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::transport::CommandTransport;
use crate::stream::ConnectionState;

/// Identity used to serialize writes: one competitor plus one action slot.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct TargetKey(String);

impl TargetKey {
    pub(crate) fn penalty(bib: &str, gate: u32) -> Self {
        Self(format!("{bib}:gate:{gate}"))
    }

    pub(crate) fn removal(bib: &str) -> Self {
        Self(format!("{bib}:remove"))
    }

    pub(crate) fn timing(bib: &str, channel: TimingChannel) -> Self {
        Self(format!("{bib}:timing:{}", channel.as_str()))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandKind {
    SetPenalty,
    Remove,
    TimingImpulse,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    SetPenalty {
        bib: String,
        gate: u32,
        value: Option<PenaltyValue>,
    },
    Remove {
        bib: String,
        reason: RemovalReason,
    },
    TimingImpulse {
        bib: String,
        channel: TimingChannel,
    },
}

impl Command {
    pub(crate) fn target_key(&self) -> TargetKey {
        match self {
            Command::SetPenalty { bib, gate, .. } => TargetKey::penalty(bib, *gate),
            Command::Remove { bib, .. } => TargetKey::removal(bib),
            Command::TimingImpulse { bib, channel } => TargetKey::timing(bib, *channel),
        }
    }

    pub(crate) fn kind(&self) -> CommandKind {
        match self {
            Command::SetPenalty { .. } => CommandKind::SetPenalty,
            Command::Remove { .. } => CommandKind::Remove,
            Command::TimingImpulse { .. } => CommandKind::TimingImpulse,
        }
    }

    fn to_request(&self) -> CommandRequest {
        match self {
            Command::SetPenalty { bib, gate, value } => {
                CommandRequest::Scoring(ScoringRequest::new(bib.clone(), *gate, *value))
            }
            Command::Remove { bib, reason } => {
                CommandRequest::RemoveFromCourse(RemoveFromCourseRequest {
                    bib: bib.clone(),
                    reason: *reason,
                })
            }
            Command::TimingImpulse { bib, channel } => CommandRequest::Timing(TimingRequest {
                bib: bib.clone(),
                channel: *channel,
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PendingCommand {
    pub(crate) target_key: TargetKey,
    pub(crate) kind: CommandKind,
    pub(crate) request_id: String,
    pub(crate) submitted_at: Instant,
    pub(crate) command: Command,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum CommandError {
    #[error("not connected to the timing server")]
    NotConnected,
    #[error("gate {0} does not exist; gates are numbered from 1")]
    InvalidGate(u32),
    #[error("{key} rejected: {message}")]
    Rejected { key: TargetKey, message: String },
}

/// Network outcome of one dispatched command, delivered back to the owner loop.
#[derive(Debug)]
pub(crate) struct CommandCompletion {
    pub(crate) key: TargetKey,
    pub(crate) request_id: String,
    pub(crate) result: Result<(), String>,
}

#[derive(Debug)]
struct Slot {
    in_flight: PendingCommand,
    /// Latest value requested while `in_flight` was outstanding.
    queued: Option<Command>,
}

/// Optimistic correction queue.
///
/// At most one write per `TargetKey` is on the network. Submits for a busy key
/// replace the queued value and go out once the current write resolves, so the
/// last requested value is always the last one sent.
pub(crate) struct CommandQueue {
    transport: Arc<dyn CommandTransport>,
    completion_tx: mpsc::UnboundedSender<CommandCompletion>,
    slots: BTreeMap<TargetKey, Slot>,
    connection: ConnectionState,
    last_error: Option<CommandError>,
}

impl CommandQueue {
    pub(crate) fn new(
        transport: Arc<dyn CommandTransport>,
    ) -> (Self, mpsc::UnboundedReceiver<CommandCompletion>) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let queue = Self {
            transport,
            completion_tx,
            slots: BTreeMap::new(),
            connection: ConnectionState::Disconnected,
            last_error: None,
        };
        (queue, completion_rx)
    }

    pub(crate) fn set_connection_state(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    pub(crate) fn submit_penalty(
        &mut self,
        bib: &str,
        gate: u32,
        value: Option<PenaltyValue>,
    ) -> Result<(), CommandError> {
        if gate == 0 {
            return Err(self.reject_locally(CommandError::InvalidGate(gate)));
        }
        self.submit(Command::SetPenalty {
            bib: bib.to_string(),
            gate,
            value,
        })
    }

    pub(crate) fn submit_removal(
        &mut self,
        bib: &str,
        reason: RemovalReason,
    ) -> Result<(), CommandError> {
        self.submit(Command::Remove {
            bib: bib.to_string(),
            reason,
        })
    }

    pub(crate) fn submit_timing_impulse(
        &mut self,
        bib: &str,
        channel: TimingChannel,
    ) -> Result<(), CommandError> {
        self.submit(Command::TimingImpulse {
            bib: bib.to_string(),
            channel,
        })
    }

    fn submit(&mut self, command: Command) -> Result<(), CommandError> {
        if self.connection != ConnectionState::Connected {
            return Err(self.reject_locally(CommandError::NotConnected));
        }
        let key = command.target_key();
        if let Some(slot) = self.slots.get_mut(&key) {
            if slot.in_flight.command == command {
                slot.queued = None;
            } else {
                slot.queued = Some(command);
            }
            debug!(
                event = "command.coalesced",
                key = %key,
                in_flight = %slot.in_flight.request_id,
                queued = slot.queued.is_some()
            );
            return Ok(());
        }
        let in_flight = self.dispatch(command);
        self.slots.insert(
            key,
            Slot {
                in_flight,
                queued: None,
            },
        );
        Ok(())
    }

    /// Applies a network outcome. Outcomes for superseded requests are ignored.
    pub(crate) fn resolve(&mut self, completion: CommandCompletion) {
        let Some(mut slot) = self.slots.remove(&completion.key) else {
            debug!(event = "command.stale", key = %completion.key, request_id = %completion.request_id);
            return;
        };
        if slot.in_flight.request_id != completion.request_id {
            debug!(
                event = "command.stale",
                key = %completion.key,
                request_id = %completion.request_id,
                current = %slot.in_flight.request_id
            );
            self.slots.insert(completion.key, slot);
            return;
        }

        let finished = &slot.in_flight;
        let elapsed_ms = finished.submitted_at.elapsed().as_millis() as u64;
        match completion.result {
            Ok(()) => {
                info!(
                    event = "command.applied",
                    key = %finished.target_key,
                    kind = ?finished.kind,
                    request_id = %finished.request_id,
                    elapsed_ms
                );
            }
            Err(message) => {
                warn!(
                    event = "command.rejected",
                    key = %finished.target_key,
                    kind = ?finished.kind,
                    request_id = %finished.request_id,
                    elapsed_ms,
                    error = %message
                );
                self.last_error = Some(CommandError::Rejected {
                    key: completion.key.clone(),
                    message,
                });
            }
        }

        if let Some(next) = slot.queued.take() {
            if self.connection != ConnectionState::Connected {
                warn!(event = "command.dropped", key = %completion.key, "connection lost before send");
                self.last_error = Some(CommandError::NotConnected);
                return;
            }
            let in_flight = self.dispatch(next);
            self.slots.insert(
                completion.key,
                Slot {
                    in_flight,
                    queued: None,
                },
            );
        }
    }

    pub(crate) fn pending_operations(&self) -> usize {
        self.slots.len()
    }

    /// The newest value requested for a gate that has not resolved yet.
    pub(crate) fn desired_penalty(&self, bib: &str, gate: u32) -> Option<Option<PenaltyValue>> {
        let slot = self.slots.get(&TargetKey::penalty(bib, gate))?;
        let command = slot.queued.as_ref().unwrap_or(&slot.in_flight.command);
        match command {
            Command::SetPenalty { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn last_error(&self) -> Option<&CommandError> {
        self.last_error.as_ref()
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn reject_locally(&mut self, error: CommandError) -> CommandError {
        warn!(event = "command.precondition", error = %error);
        self.last_error = Some(error.clone());
        error
    }

    fn dispatch(&self, command: Command) -> PendingCommand {
        let request_id = Uuid::new_v4().to_string();
        let target_key = command.target_key();
        let request = command.to_request();
        info!(
            event = "command.sent",
            key = %target_key,
            request_id = %request_id,
            path = request.path()
        );

        let transport = Arc::clone(&self.transport);
        let completion_tx = self.completion_tx.clone();
        let key = target_key.clone();
        let id = request_id.clone();
        tokio::spawn(async move {
            let result = transport
                .send(&id, &request)
                .await
                .map_err(|err| format!("{err:#}"));
            let _ = completion_tx.send(CommandCompletion {
                key,
                request_id: id,
                result,
            });
        });

        PendingCommand {
            target_key,
            kind: command.kind(),
            request_id,
            submitted_at: Instant::now(),
            command,
        }
    }
}
