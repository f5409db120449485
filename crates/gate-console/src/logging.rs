use anyhow::Context;
use std::io;
use std::path::Path;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Stdout belongs to the terminal UI, so logs go to a daily JSON file and,
/// optionally, stderr.
pub(crate) fn init_tracing(
    log_dir: &Path,
    log_to_stderr: bool,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log dir {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "gate-console.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_target(false)
        .json();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if log_to_stderr {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false);
        registry.with(stderr_layer).init();
    } else {
        registry.init();
    }

    Ok(file_guard)
}
