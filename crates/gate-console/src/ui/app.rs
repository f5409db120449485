use std::sync::Arc;
use std::time::Instant;

use timing_protocol::command::{RemovalReason, TimingChannel};
use timing_protocol::PenaltyValue;
use tracing::{debug, info};

use crate::commands::{CommandCompletion, CommandQueue};
use crate::config::ConsoleConfig;
use crate::input::{
    cell_id, Direction, GridFocusModel, InputSignal, PenaltyInputStateMachine, PenaltyKey,
};
use crate::state::{RaceSnapshot, RaceStateStore};
use crate::stream::{ConnectionState, StreamEvent};
use crate::view::{grid_rows, GridRow};

/// Cursor jumps that are not single steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Jump {
    PageUp,
    PageDown,
    RowStart,
    RowEnd,
    FirstRow,
    LastRow,
}

/// Everything the UI loop owns. Only this loop mutates it.
pub(crate) struct AppState {
    pub(crate) connection: ConnectionState,
    pub(crate) store: RaceStateStore,
    pub(crate) queue: CommandQueue,
    pub(crate) focus: GridFocusModel,
    pub(crate) input: PenaltyInputStateMachine,
    pub(crate) selected_race: Option<String>,
    pub(crate) rows: Vec<GridRow>,
    pub(crate) show_help: bool,
    pub(crate) confirm_quit: bool,
    pub(crate) notice: Option<String>,
    auto_advance: bool,
    /// Competitor and gate a staged 5 was typed into.
    staged: Option<(String, u32)>,
    grid_race: Option<String>,
}

impl AppState {
    pub(crate) fn new(queue: CommandQueue, config: &ConsoleConfig) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            store: RaceStateStore::new(),
            queue,
            focus: GridFocusModel::new(config.grid.wrap, config.grid.page_rows),
            input: PenaltyInputStateMachine::new(config.input.multi_key_window),
            selected_race: None,
            rows: Vec::new(),
            show_help: false,
            confirm_quit: false,
            notice: None,
            auto_advance: config.grid.auto_advance,
            staged: None,
            grid_race: None,
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<RaceSnapshot> {
        self.store.snapshot()
    }

    pub(crate) fn handle_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::State(state) => {
                if state != self.connection {
                    info!(event = "ui.connection", state = state.label());
                }
                self.connection = state;
                self.queue.set_connection_state(state);
            }
            StreamEvent::Message(message) => {
                let epoch = self.store.snapshot().refresh_epoch;
                self.store.apply(message);
                if self.store.snapshot().refresh_epoch != epoch {
                    self.notice = Some("server dropped its caches; reloading".to_string());
                }
                self.sync_race_selection();
                self.sync_grid();
            }
        }
    }

    pub(crate) fn handle_completion(&mut self, completion: CommandCompletion) {
        self.queue.resolve(completion);
        self.take_command_error();
    }

    /// Fires timers that are due: the staged 50 and any coalesced move.
    pub(crate) fn tick(&mut self, now: Instant) {
        if let Some(signal) = self.input.tick(now) {
            self.apply_signal(signal);
        }
        self.focus.tick(now);
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        match (self.input.deadline(), self.focus.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub(crate) fn handle_penalty_key(&mut self, key: PenaltyKey, now: Instant) {
        let target = self.focused_gate();
        let signals = self.input.handle_key(key, now);
        let confirming = signals.contains(&InputSignal::Confirm);
        for signal in signals {
            match signal {
                InputSignal::Value(value) if confirming => {
                    self.commit_value(value);
                }
                other => self.apply_signal(other),
            }
        }
        self.staged = match self.input.preview() {
            Some(_) => self.staged.take().or(target),
            None => None,
        };
    }

    /// A staged 50 always lands on the cell it was typed into.
    pub(crate) fn move_focus(&mut self, direction: Direction, now: Instant) {
        self.flush_input();
        self.focus.request_move(direction, now);
    }

    pub(crate) fn jump_focus(&mut self, jump: Jump) {
        self.flush_input();
        match jump {
            Jump::PageUp => self.focus.page_up(),
            Jump::PageDown => self.focus.page_down(),
            Jump::RowStart => self.focus.move_to_row_start(),
            Jump::RowEnd => self.focus.move_to_row_end(),
            Jump::FirstRow => self.focus.move_to_first_row(),
            Jump::LastRow => self.focus.move_to_last_row(),
        }
    }

    pub(crate) fn cycle_race(&mut self) {
        self.flush_input();
        let snapshot = self.store.snapshot();
        if snapshot.schedule.is_empty() {
            return;
        }
        let current = self
            .selected_race
            .as_deref()
            .and_then(|race_id| {
                snapshot
                    .schedule
                    .iter()
                    .position(|race| race.race_id == race_id)
            });
        let next = current.map(|index| (index + 1) % snapshot.schedule.len()).unwrap_or(0);
        self.selected_race = Some(snapshot.schedule[next].race_id.clone());
        self.sync_grid();
    }

    pub(crate) fn remove_focused(&mut self, reason: RemovalReason) {
        self.flush_input();
        let Some(row) = self.focused_row() else {
            return;
        };
        let bib = row.bib.clone();
        if self.queue.submit_removal(&bib, reason).is_ok() {
            self.notice = Some(format!("{} sent for bib {bib}", reason.as_str()));
        }
        self.take_command_error();
    }

    pub(crate) fn finish_impulse_focused(&mut self) {
        self.flush_input();
        let Some(row) = self.focused_row() else {
            return;
        };
        let bib = row.bib.clone();
        if self
            .queue
            .submit_timing_impulse(&bib, TimingChannel::Finish)
            .is_ok()
        {
            self.notice = Some(format!("finish impulse sent for bib {bib}"));
        }
        self.take_command_error();
    }

    /// The staged value, shown only while the cursor sits on the cell it was
    /// typed into.
    pub(crate) fn preview(&self) -> Option<PenaltyValue> {
        let value = self.input.preview()?;
        (self.staged.is_some() && self.staged == self.focused_gate()).then_some(value)
    }

    pub(crate) fn focused_row(&self) -> Option<&GridRow> {
        let (row, _) = self.focus.position();
        self.rows.get(row)
    }

    fn focused_gate(&self) -> Option<(String, u32)> {
        let (row, column) = self.focus.position();
        if !self.focus.is_focused(row, column) {
            return None;
        }
        let bib = self.rows.get(row)?.bib.clone();
        Some((bib, column as u32 + 1))
    }

    /// Commits a staged 50 in place; the caller is about to move the cursor.
    fn flush_input(&mut self) {
        if let Some(InputSignal::Value(value)) = self.input.flush() {
            self.commit_value(value);
        }
        self.staged = None;
    }

    /// A value that resolves a staged 5 goes to the staged cell, wherever the
    /// cursor or the rows have moved since; anything else goes to the cursor.
    fn commit_value(&mut self, value: PenaltyValue) -> bool {
        match self.staged.take() {
            Some((bib, gate)) => self.submit(&bib, gate, Some(value)),
            None => self.submit_focused(Some(value)),
        }
    }

    fn apply_signal(&mut self, signal: InputSignal) {
        match signal {
            InputSignal::Value(value) => {
                if self.commit_value(value) && self.auto_advance {
                    self.focus.move_now(Direction::Right);
                }
            }
            InputSignal::Clear => {
                self.submit_focused(None);
            }
            InputSignal::Confirm => self.focus.move_now(Direction::Down),
            InputSignal::Cancel => self.notice = None,
            InputSignal::Help => self.show_help = !self.show_help,
        }
    }

    fn submit_focused(&mut self, value: Option<PenaltyValue>) -> bool {
        let Some((bib, gate)) = self.focused_gate() else {
            return false;
        };
        self.submit(&bib, gate, value)
    }

    fn submit(&mut self, bib: &str, gate: u32, value: Option<PenaltyValue>) -> bool {
        let row = self.rows.iter().position(|row| row.bib == bib);
        debug!(
            event = "ui.penalty",
            cell = ?row.map(|row| cell_id(row, gate.saturating_sub(1) as usize)),
            bib = %bib,
            gate,
            value = ?value.map(PenaltyValue::seconds)
        );
        let accepted = self.queue.submit_penalty(bib, gate, value).is_ok();
        self.take_command_error();
        accepted
    }

    fn take_command_error(&mut self) {
        if let Some(err) = self.queue.last_error() {
            self.notice = Some(err.to_string());
            self.queue.clear_error();
        }
    }

    fn sync_race_selection(&mut self) {
        let snapshot = self.store.snapshot();
        let still_listed = self.selected_race.as_deref().is_some_and(|race_id| {
            snapshot
                .schedule
                .iter()
                .any(|race| race.race_id == race_id)
        });
        if still_listed {
            return;
        }
        self.selected_race = snapshot
            .running_race()
            .or_else(|| snapshot.schedule.first())
            .map(|race| race.race_id.clone());
    }

    /// Rebuilds the rows; within the same race the cursor stays on the
    /// competitor it was on, even if a push re-ranked the rows.
    fn sync_grid(&mut self) {
        let snapshot = self.store.snapshot();
        let Some(race_id) = self.selected_race.clone() else {
            self.rows.clear();
            self.grid_race = None;
            self.focus.set_dimensions(0, 0);
            return;
        };
        let focused_bib = (self.grid_race.as_deref() == Some(race_id.as_str()))
            .then(|| self.focused_row().map(|row| row.bib.clone()))
            .flatten();
        self.rows = grid_rows(&snapshot, &race_id);
        let columns = snapshot.gate_count(&race_id) as usize;
        self.focus.set_dimensions(self.rows.len(), columns);
        if let Some(index) = focused_bib
            .and_then(|bib| self.rows.iter().position(|row| row.bib == bib))
        {
            self.focus.move_to_row(index);
        }
        self.grid_race = Some(race_id);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::commands::{connected_queue, HeldTransport};
    use std::time::Duration;
    use timing_protocol::command::CommandRequest;
    use timing_protocol::{
        RaceConfig, RaceResults, RaceStatus, RaceSummary, ResultRow, Schedule, StreamMessage,
    };

    fn summary(race_id: &str, status: RaceStatus) -> RaceSummary {
        RaceSummary {
            race_id: race_id.to_string(),
            order: 1,
            main_title: race_id.to_string(),
            sub_title: None,
            status,
            on_course_count: 0,
        }
    }

    fn row(bib: &str) -> ResultRow {
        ResultRow {
            bib: bib.to_string(),
            rank: None,
            name: format!("Competitor {bib}"),
            start_order: 1,
            time: None,
            penalty_total: None,
            gates_string: "0 0 0".to_string(),
            status: None,
        }
    }

    pub(crate) fn loaded_app(transport: Arc<HeldTransport>) -> AppState {
        let (queue, _completions) = connected_queue(transport);
        let mut app = AppState::new(queue, &ConsoleConfig::default());
        app.handle_stream_event(StreamEvent::State(ConnectionState::Connected));
        for message in [
            StreamMessage::Schedule(Schedule {
                races: vec![
                    summary("K1M", RaceStatus::Official),
                    summary("C1W", RaceStatus::Running),
                ],
            }),
            StreamMessage::RaceConfig(RaceConfig {
                race_id: "C1W".to_string(),
                gate_count: 3,
                gate_type_string: "NNR".to_string(),
            }),
            StreamMessage::Results(RaceResults {
                race_id: "C1W".to_string(),
                rows: vec![row("42"), row("7")],
            }),
        ] {
            app.handle_stream_event(StreamEvent::Message(message));
        }
        app
    }

    fn scored(transport: &HeldTransport) -> Vec<(String, u32, Option<u32>)> {
        transport
            .calls()
            .into_iter()
            .filter_map(|request| match request {
                CommandRequest::Scoring(scoring) => {
                    Some((scoring.bib, scoring.gate, scoring.value))
                }
                _ => None,
            })
            .collect()
    }

    async fn wait_for_calls(transport: &HeldTransport, count: usize) {
        for _ in 0..100 {
            if transport.calls().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn selects_running_race_and_sizes_grid() {
        let app = loaded_app(Arc::new(HeldTransport::new()));
        assert_eq!(app.selected_race.as_deref(), Some("C1W"));
        assert_eq!(app.focus.dimensions(), (2, 3));
        assert_eq!(app.focused_row().map(|row| row.bib.as_str()), Some("42"));
    }

    #[tokio::test]
    async fn committed_value_is_sent_and_cursor_advances() {
        let transport = Arc::new(HeldTransport::new());
        let mut app = loaded_app(Arc::clone(&transport));
        let now = Instant::now();

        app.handle_penalty_key(PenaltyKey::Two, now);
        assert_eq!(app.focus.position(), (0, 1));
        assert_eq!(app.queue.pending_operations(), 1);

        wait_for_calls(&transport, 1).await;
        assert_eq!(scored(&transport), vec![("42".to_string(), 1, Some(2))]);
    }

    #[tokio::test]
    async fn staged_fifty_lands_on_original_cell_when_moving_away() {
        let transport = Arc::new(HeldTransport::new());
        let mut app = loaded_app(Arc::clone(&transport));
        let now = Instant::now();

        app.handle_penalty_key(PenaltyKey::Five, now);
        assert_eq!(app.preview(), Some(PenaltyValue::Miss));
        app.move_focus(Direction::Down, now + Duration::from_millis(50));

        assert_eq!(app.preview(), None);
        assert_eq!(
            app.queue.desired_penalty("42", 1),
            Some(Some(PenaltyValue::Miss))
        );
        assert_eq!(app.focus.position(), (1, 0));
    }

    #[tokio::test]
    async fn expired_window_commits_through_tick() {
        let transport = Arc::new(HeldTransport::new());
        let mut app = loaded_app(Arc::clone(&transport));
        let now = Instant::now();

        app.handle_penalty_key(PenaltyKey::Five, now);
        assert!(app.next_deadline().is_some());
        app.tick(now + Duration::from_millis(300));
        assert_eq!(
            app.queue.desired_penalty("42", 1),
            Some(Some(PenaltyValue::Miss))
        );
        assert_eq!(app.focus.position(), (0, 1));
        assert!(app.next_deadline().is_none());
    }

    #[tokio::test]
    async fn delete_clears_without_advancing() {
        let transport = Arc::new(HeldTransport::new());
        let mut app = loaded_app(Arc::clone(&transport));
        app.handle_penalty_key(PenaltyKey::Delete, Instant::now());
        assert_eq!(app.queue.desired_penalty("42", 1), Some(None));
        assert_eq!(app.focus.position(), (0, 0));
    }

    #[tokio::test]
    async fn disconnected_removal_surfaces_notice() {
        let transport = Arc::new(HeldTransport::new());
        let mut app = loaded_app(Arc::clone(&transport));
        app.handle_stream_event(StreamEvent::State(ConnectionState::Disconnected));

        app.remove_focused(RemovalReason::Dnf);
        assert_eq!(app.queue.pending_operations(), 0);
        assert!(app.queue.last_error().is_none());
        assert_eq!(
            app.notice.as_deref(),
            Some("not connected to the timing server")
        );
    }

    #[tokio::test]
    async fn tab_cycles_races_and_resizes() {
        let mut app = loaded_app(Arc::new(HeldTransport::new()));
        app.cycle_race();
        assert_eq!(app.selected_race.as_deref(), Some("K1M"));
        assert_eq!(app.focus.dimensions(), (0, 0));
        app.cycle_race();
        assert_eq!(app.selected_race.as_deref(), Some("C1W"));
    }

    #[tokio::test]
    async fn help_toggles_and_confirm_moves_down() {
        let mut app = loaded_app(Arc::new(HeldTransport::new()));
        let now = Instant::now();
        app.handle_penalty_key(PenaltyKey::Help, now);
        assert!(app.show_help);
        app.handle_penalty_key(PenaltyKey::Enter, now);
        assert_eq!(app.focus.position(), (1, 0));

        app.handle_penalty_key(PenaltyKey::Five, now);
        app.handle_penalty_key(PenaltyKey::Enter, now + Duration::from_millis(40));
        assert_eq!(
            app.queue.desired_penalty("7", 1),
            Some(Some(PenaltyValue::Miss))
        );
        assert_eq!(app.focus.position(), (1, 0));
    }

    fn push_results(app: &mut AppState, rows: Vec<ResultRow>) {
        app.handle_stream_event(StreamEvent::Message(StreamMessage::Results(RaceResults {
            race_id: "C1W".to_string(),
            rows,
        })));
    }

    #[tokio::test]
    async fn staged_fifty_follows_its_competitor_through_a_reorder() {
        let transport = Arc::new(HeldTransport::new());
        let mut app = loaded_app(Arc::clone(&transport));
        let now = Instant::now();

        app.handle_penalty_key(PenaltyKey::Five, now);
        push_results(&mut app, vec![row("7"), row("42")]);

        assert_eq!(app.focused_row().map(|row| row.bib.as_str()), Some("42"));
        assert_eq!(app.focus.position(), (1, 0));
        assert_eq!(app.preview(), Some(PenaltyValue::Miss));

        app.tick(now + Duration::from_millis(300));
        assert_eq!(
            app.queue.desired_penalty("42", 1),
            Some(Some(PenaltyValue::Miss))
        );
        assert_eq!(app.queue.desired_penalty("7", 1), None);
    }

    #[tokio::test]
    async fn staged_fifty_keeps_its_cell_when_the_row_disappears() {
        let transport = Arc::new(HeldTransport::new());
        let mut app = loaded_app(Arc::clone(&transport));
        let now = Instant::now();

        app.handle_penalty_key(PenaltyKey::Five, now);
        push_results(&mut app, vec![row("7")]);

        assert_eq!(app.focused_row().map(|row| row.bib.as_str()), Some("7"));
        assert_eq!(app.preview(), None);

        app.tick(now + Duration::from_millis(300));
        assert_eq!(
            app.queue.desired_penalty("42", 1),
            Some(Some(PenaltyValue::Miss))
        );
        assert_eq!(app.queue.desired_penalty("7", 1), None);
    }

    #[tokio::test]
    async fn single_keys_follow_the_focused_competitor_after_a_reorder() {
        let transport = Arc::new(HeldTransport::new());
        let mut app = loaded_app(Arc::clone(&transport));

        push_results(&mut app, vec![row("7"), row("42")]);
        app.handle_penalty_key(PenaltyKey::Two, Instant::now());

        assert_eq!(
            app.queue.desired_penalty("42", 1),
            Some(Some(PenaltyValue::Touch))
        );
        assert_eq!(app.queue.desired_penalty("7", 1), None);
    }

    #[tokio::test]
    async fn typed_gates_then_disconnected_removal_is_rejected() {
        let transport = Arc::new(HeldTransport::new());
        let (queue, _completions) = CommandQueue::new(transport.clone());
        let mut app = AppState::new(queue, &ConsoleConfig::default());
        for message in [
            StreamMessage::Schedule(Schedule {
                races: vec![summary("C1W", RaceStatus::Running)],
            }),
            StreamMessage::Results(RaceResults {
                race_id: "C1W".to_string(),
                rows: vec![ResultRow {
                    gates_string: "0 0 2".to_string(),
                    ..row("42")
                }],
            }),
            StreamMessage::RaceConfig(RaceConfig {
                race_id: "C1W".to_string(),
                gate_count: 3,
                gate_type_string: "NNR".to_string(),
            }),
        ] {
            app.handle_stream_event(StreamEvent::Message(message));
        }

        let gate = app
            .snapshot()
            .gate_penalty("C1W", "42", 3)
            .expect("gate 3");
        assert_eq!(gate.value, Some(PenaltyValue::Touch));
        assert_eq!(gate.kind, timing_protocol::GateKind::Reverse);

        assert_eq!(app.focused_row().map(|row| row.bib.as_str()), Some("42"));
        app.remove_focused(RemovalReason::Dnf);
        assert_eq!(app.queue.pending_operations(), 0);
        assert!(transport.calls().is_empty());
        assert_eq!(
            app.notice.as_deref(),
            Some("not connected to the timing server")
        );
    }
}
