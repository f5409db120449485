use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gate-console",
    version,
    about = "Gate judge terminal for live slalom timing corrections"
)]
pub(crate) struct Args {
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Overrides `server_url` from the config file.
    #[arg(long)]
    pub(crate) server_url: Option<String>,
    /// Overrides `api_base` from the config file.
    #[arg(long)]
    pub(crate) api_base: Option<String>,
    #[arg(long, default_value = "logs")]
    pub(crate) log_dir: PathBuf,
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
}
