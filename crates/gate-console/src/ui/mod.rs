mod app;
mod keys;
mod render;
mod terminal;
mod theme;

pub(crate) use app::AppState;
pub(crate) use keys::handle_key_event;
pub(crate) use render::draw_ui;
pub(crate) use terminal::{restore_terminal, setup_terminal};
