use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Instant;
use timing_protocol::command::RemovalReason;

use super::app::{AppState, Jump};
use crate::input::{Direction, PenaltyKey};

/// Returns `true` when the operator confirmed quitting.
pub(crate) fn handle_key_event(key: KeyEvent, app: &mut AppState, now: Instant) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    if app.confirm_quit {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return true,
            KeyCode::Esc => {
                app.confirm_quit = false;
                return false;
            }
            _ => {
                app.confirm_quit = false;
            }
        }
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.confirm_quit = true,
        KeyCode::Char('0') => app.handle_penalty_key(PenaltyKey::Zero, now),
        KeyCode::Char('2') => app.handle_penalty_key(PenaltyKey::Two, now),
        KeyCode::Char('5') => app.handle_penalty_key(PenaltyKey::Five, now),
        KeyCode::Char('?') => app.handle_penalty_key(PenaltyKey::Help, now),
        KeyCode::Enter => app.handle_penalty_key(PenaltyKey::Enter, now),
        KeyCode::Esc if app.show_help => app.show_help = false,
        KeyCode::Esc => app.handle_penalty_key(PenaltyKey::Escape, now),
        KeyCode::Delete | KeyCode::Backspace => app.handle_penalty_key(PenaltyKey::Delete, now),
        KeyCode::Up => app.move_focus(Direction::Up, now),
        KeyCode::Down => app.move_focus(Direction::Down, now),
        KeyCode::Left => app.move_focus(Direction::Left, now),
        KeyCode::Right => app.move_focus(Direction::Right, now),
        KeyCode::PageUp => app.jump_focus(Jump::PageUp),
        KeyCode::PageDown => app.jump_focus(Jump::PageDown),
        KeyCode::Home if ctrl => app.jump_focus(Jump::FirstRow),
        KeyCode::Home => app.jump_focus(Jump::RowStart),
        KeyCode::End if ctrl => app.jump_focus(Jump::LastRow),
        KeyCode::End => app.jump_focus(Jump::RowEnd),
        KeyCode::Tab => app.cycle_race(),
        KeyCode::F(5) => app.finish_impulse_focused(),
        KeyCode::F(9) => app.remove_focused(RemovalReason::Dns),
        KeyCode::F(10) => app.remove_focused(RemovalReason::Dnf),
        KeyCode::F(11) => app.remove_focused(RemovalReason::Cap),
        _ => {}
    }
    false
}
