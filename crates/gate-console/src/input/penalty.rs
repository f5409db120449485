use std::time::{Duration, Instant};

use timing_protocol::PenaltyValue;

pub(crate) const MULTI_KEY_WINDOW: Duration = Duration::from_millis(300);

/// Keys the penalty entry understands; everything else stays with the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PenaltyKey {
    Zero,
    Two,
    Five,
    Enter,
    Escape,
    Delete,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InputSignal {
    Value(PenaltyValue),
    /// Empties the cell; not the same as a zero.
    Clear,
    Confirm,
    Cancel,
    Help,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum InputState {
    #[default]
    Idle,
    PendingFive {
        deadline: Instant,
    },
}

/// Turns keystrokes into committed penalty values.
///
/// A lone `5` is ambiguous until `0` arrives or the window elapses; it is shown
/// as a 50 preview meanwhile. Callers drive the window through `tick`.
#[derive(Debug)]
pub(crate) struct PenaltyInputStateMachine {
    state: InputState,
    window: Duration,
}

impl Default for PenaltyInputStateMachine {
    fn default() -> Self {
        Self::new(MULTI_KEY_WINDOW)
    }
}

impl PenaltyInputStateMachine {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            state: InputState::Idle,
            window,
        }
    }

    pub(crate) fn handle_key(&mut self, key: PenaltyKey, now: Instant) -> Vec<InputSignal> {
        let mut signals = Vec::with_capacity(2);
        signals.extend(self.tick(now));

        let staged = self.is_pending();
        match key {
            PenaltyKey::Zero => {
                self.state = InputState::Idle;
                let value = if staged {
                    PenaltyValue::Miss
                } else {
                    PenaltyValue::Clear
                };
                signals.push(InputSignal::Value(value));
            }
            PenaltyKey::Two => {
                self.state = InputState::Idle;
                signals.push(InputSignal::Value(PenaltyValue::Touch));
            }
            PenaltyKey::Five => {
                if staged {
                    signals.push(InputSignal::Value(PenaltyValue::Miss));
                }
                self.state = InputState::PendingFive {
                    deadline: now + self.window,
                };
            }
            PenaltyKey::Enter => {
                signals.extend(self.flush());
                signals.push(InputSignal::Confirm);
            }
            PenaltyKey::Escape => {
                self.state = InputState::Idle;
                signals.push(InputSignal::Cancel);
            }
            PenaltyKey::Delete => {
                self.state = InputState::Idle;
                signals.push(InputSignal::Clear);
            }
            PenaltyKey::Help => signals.push(InputSignal::Help),
        }
        signals
    }

    /// Commits a staged 50 once its window has elapsed.
    pub(crate) fn tick(&mut self, now: Instant) -> Option<InputSignal> {
        match self.state {
            InputState::PendingFive { deadline } if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Commits a staged 50 immediately.
    pub(crate) fn flush(&mut self) -> Option<InputSignal> {
        match std::mem::take(&mut self.state) {
            InputState::PendingFive { .. } => Some(InputSignal::Value(PenaltyValue::Miss)),
            InputState::Idle => None,
        }
    }

    pub(crate) fn preview(&self) -> Option<PenaltyValue> {
        self.is_pending().then_some(PenaltyValue::Miss)
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        match self.state {
            InputState::PendingFive { deadline } => Some(deadline),
            InputState::Idle => None,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.state, InputState::PendingFive { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn feed(
        machine: &mut PenaltyInputStateMachine,
        start: Instant,
        keys: &[(u32, PenaltyKey)],
    ) -> Vec<InputSignal> {
        keys.iter()
            .flat_map(|(offset, key)| machine.handle_key(*key, start + MS * *offset))
            .collect()
    }

    #[test]
    fn single_digits_commit_immediately() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        assert_eq!(
            feed(&mut machine, start, &[(0, PenaltyKey::Zero)]),
            vec![InputSignal::Value(PenaltyValue::Clear)]
        );
        assert_eq!(
            feed(&mut machine, start, &[(10, PenaltyKey::Two)]),
            vec![InputSignal::Value(PenaltyValue::Touch)]
        );
        assert_eq!(machine.preview(), None);
    }

    #[test]
    fn five_then_zero_is_one_fifty() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        let signals = feed(&mut machine, start, &[(0, PenaltyKey::Five), (120, PenaltyKey::Zero)]);
        assert_eq!(signals, vec![InputSignal::Value(PenaltyValue::Miss)]);
        assert_eq!(machine.tick(start + MS * 1000), None);
    }

    #[test]
    fn five_alone_commits_after_the_window() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        assert!(machine.handle_key(PenaltyKey::Five, start).is_empty());
        assert_eq!(machine.preview(), Some(PenaltyValue::Miss));
        assert_eq!(machine.deadline(), Some(start + MULTI_KEY_WINDOW));

        assert_eq!(machine.tick(start + MS * 299), None);
        assert_eq!(
            machine.tick(start + MULTI_KEY_WINDOW),
            Some(InputSignal::Value(PenaltyValue::Miss))
        );
        assert_eq!(machine.preview(), None);
        assert_eq!(machine.tick(start + MS * 2000), None);
    }

    #[test]
    fn five_then_two_yields_only_two() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        let signals = feed(&mut machine, start, &[(0, PenaltyKey::Five), (50, PenaltyKey::Two)]);
        assert_eq!(signals, vec![InputSignal::Value(PenaltyValue::Touch)]);
        assert_eq!(machine.deadline(), None);
    }

    #[test]
    fn repeated_five_commits_the_first_and_stages_the_second() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        let signals = feed(&mut machine, start, &[(0, PenaltyKey::Five), (100, PenaltyKey::Five)]);
        assert_eq!(signals, vec![InputSignal::Value(PenaltyValue::Miss)]);
        assert_eq!(machine.deadline(), Some(start + MS * 100 + MULTI_KEY_WINDOW));
    }

    #[test]
    fn late_key_after_expired_window_commits_both() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        let signals = feed(&mut machine, start, &[(0, PenaltyKey::Five), (400, PenaltyKey::Zero)]);
        assert_eq!(
            signals,
            vec![
                InputSignal::Value(PenaltyValue::Miss),
                InputSignal::Value(PenaltyValue::Clear)
            ]
        );
    }

    #[test]
    fn enter_commits_staged_value_before_confirm() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        let signals = feed(&mut machine, start, &[(0, PenaltyKey::Five), (10, PenaltyKey::Enter)]);
        assert_eq!(
            signals,
            vec![InputSignal::Value(PenaltyValue::Miss), InputSignal::Confirm]
        );
        assert_eq!(
            machine.handle_key(PenaltyKey::Enter, start + MS * 20),
            vec![InputSignal::Confirm]
        );
    }

    #[test]
    fn escape_and_delete_drop_the_preview() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        let signals = feed(&mut machine, start, &[(0, PenaltyKey::Five), (10, PenaltyKey::Escape)]);
        assert_eq!(signals, vec![InputSignal::Cancel]);
        assert_eq!(machine.tick(start + MS * 1000), None);

        let signals = feed(&mut machine, start, &[(20, PenaltyKey::Five), (30, PenaltyKey::Delete)]);
        assert_eq!(signals, vec![InputSignal::Clear]);
        assert_eq!(machine.preview(), None);
    }

    #[test]
    fn help_leaves_the_preview_alone() {
        let start = Instant::now();
        let mut machine = PenaltyInputStateMachine::default();
        let signals = feed(&mut machine, start, &[(0, PenaltyKey::Five), (10, PenaltyKey::Help)]);
        assert_eq!(signals, vec![InputSignal::Help]);
        assert_eq!(machine.preview(), Some(PenaltyValue::Miss));
    }

    #[test]
    fn flush_commits_once() {
        let mut machine = PenaltyInputStateMachine::new(Duration::from_millis(500));
        assert_eq!(machine.flush(), None);
        machine.handle_key(PenaltyKey::Five, Instant::now());
        assert_eq!(machine.flush(), Some(InputSignal::Value(PenaltyValue::Miss)));
        assert_eq!(machine.flush(), None);
    }
}
