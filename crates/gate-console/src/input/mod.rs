mod focus;
mod penalty;

pub(crate) use focus::{cell_id, Direction, GridFocusModel};
pub(crate) use penalty::{InputSignal, PenaltyInputStateMachine, PenaltyKey};
