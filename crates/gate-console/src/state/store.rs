use std::sync::Arc;

use timing_protocol::StreamMessage;
use tracing::{info, warn};

use super::snapshot::RaceSnapshot;

/// Folds stream messages into copy-on-write snapshots.
///
/// Every keyed entity is last-write-wins and every list is replaced whole;
/// nothing here merges, retries or reorders.
#[derive(Clone, Debug, Default)]
pub(crate) struct RaceStateStore {
    snapshot: Arc<RaceSnapshot>,
    applied: u64,
}

impl RaceStateStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Readers keep the `Arc` they got; later messages never touch it.
    pub(crate) fn snapshot(&self) -> Arc<RaceSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub(crate) fn applied(&self) -> u64 {
        self.applied
    }

    pub(crate) fn apply(&mut self, message: StreamMessage) {
        let snapshot = Arc::make_mut(&mut self.snapshot);
        match message {
            StreamMessage::ServerInfo(info) => {
                snapshot.server_info = Some(info);
            }
            StreamMessage::Schedule(schedule) => {
                snapshot.schedule = schedule.races;
            }
            StreamMessage::RaceConfig(config) => {
                snapshot.configs.insert(config.race_id.clone(), config);
            }
            StreamMessage::OnCourse(on_course) => {
                snapshot
                    .on_course_by_race
                    .insert(on_course.race_id, on_course.competitors);
            }
            StreamMessage::Results(results) => {
                snapshot
                    .results_by_race
                    .insert(results.race_id, results.rows);
            }
            StreamMessage::Error(error) => {
                warn!(
                    event = "feed.server_error",
                    code = ?error.code,
                    message = %error.message
                );
                snapshot.last_server_error = Some(error.message);
            }
            StreamMessage::ForceRefresh(refresh) => {
                info!(
                    event = "feed.force_refresh",
                    reason = ?refresh.reason,
                    races = snapshot.results_by_race.len(),
                    "dropping cached race data"
                );
                snapshot.results_by_race.clear();
                snapshot.on_course_by_race.clear();
                snapshot.configs.clear();
                snapshot.refresh_epoch += 1;
            }
        }
        self.applied += 1;
    }
}

/// Replays a message sequence into a fresh snapshot.
#[cfg(test)]
pub(crate) fn fold<I>(messages: I) -> RaceSnapshot
where
    I: IntoIterator<Item = StreamMessage>,
{
    let mut store = RaceStateStore::new();
    for message in messages {
        store.apply(message);
    }
    store.snapshot().as_ref().clone()
}
