mod cli;
mod commands;
mod config;
mod input;
mod logging;
mod state;
mod stream;
mod ui;
mod view;

use crate::cli::Args;
use crate::commands::{CommandCompletion, CommandQueue, CommandTransport, HttpCommandTransport};
use crate::config::load_config;
use crate::logging::init_tracing;
use crate::stream::{StreamClient, StreamEvent};
use crate::ui::{draw_ui, handle_key_event, restore_terminal, setup_terminal, AppState};
use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event};
use ratatui::backend::Backend;
use ratatui::Terminal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;

const FRAME: Duration = Duration::from_millis(16);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _file_guard = init_tracing(&args.log_dir, args.log_to_stderr)?;

    let mut config = load_config(args.config.as_deref())?;
    config.apply_overrides(args.server_url, args.api_base);
    config.validate().context("invalid settings")?;
    let api_base = config.api_base()?;
    info!(
        event = "console.start",
        server_url = %config.server_url,
        api_base = %api_base
    );

    let (stream, mut stream_rx) = StreamClient::spawn(config.stream_config());
    stream.connect(config.server_url.clone());

    let transport: Arc<dyn CommandTransport> =
        Arc::new(HttpCommandTransport::new(api_base, config.commands.timeout)?);
    let (queue, mut completion_rx) = CommandQueue::new(transport);
    let mut app = AppState::new(queue, &config);

    let mut terminal = setup_terminal()?;
    let result = run_ui(&mut terminal, &mut app, &mut stream_rx, &mut completion_rx);
    restore_terminal(&mut terminal)?;

    stream.shutdown().await;
    info!(
        event = "console.stop",
        pending = app.queue.pending_operations(),
        messages = app.store.applied()
    );
    result
}

fn run_ui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    stream_rx: &mut mpsc::Receiver<StreamEvent>,
    completion_rx: &mut mpsc::UnboundedReceiver<CommandCompletion>,
) -> anyhow::Result<()> {
    loop {
        while let Ok(event) = stream_rx.try_recv() {
            app.handle_stream_event(event);
        }
        while let Ok(completion) = completion_rx.try_recv() {
            app.handle_completion(completion);
        }
        app.tick(Instant::now());

        terminal.draw(|frame| draw_ui(frame, app))?;

        let timeout = app
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .map_or(FRAME, |until| until.min(FRAME));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if handle_key_event(key, app, Instant::now()) {
                    return Ok(());
                }
            }
        }
    }
}
