use anyhow::Context;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

use crate::stream::StreamConfig;

const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:27123/ws";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConsoleConfig {
    pub(crate) server_url: String,
    pub(crate) api_base: Option<String>,
    pub(crate) reconnect: ReconnectConfig,
    pub(crate) commands: CommandsConfig,
    pub(crate) grid: GridConfig,
    pub(crate) input: InputConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ReconnectConfig {
    #[serde(deserialize_with = "human_duration")]
    pub(crate) floor: Duration,
    #[serde(deserialize_with = "human_duration")]
    pub(crate) cap: Duration,
    pub(crate) jitter: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CommandsConfig {
    #[serde(deserialize_with = "human_duration")]
    pub(crate) timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GridConfig {
    pub(crate) wrap: bool,
    pub(crate) auto_advance: bool,
    pub(crate) page_rows: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct InputConfig {
    #[serde(deserialize_with = "human_duration")]
    pub(crate) multi_key_window: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_base: None,
            reconnect: ReconnectConfig::default(),
            commands: CommandsConfig::default(),
            grid: GridConfig::default(),
            input: InputConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        let stream = StreamConfig::default();
        Self {
            floor: stream.reconnect_floor,
            cap: stream.reconnect_cap,
            jitter: stream.reconnect_jitter,
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            wrap: true,
            auto_advance: true,
            page_rows: 10,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            multi_key_window: Duration::from_millis(300),
        }
    }
}

impl ConsoleConfig {
    pub(crate) fn apply_overrides(&mut self, server_url: Option<String>, api_base: Option<String>) {
        if let Some(server_url) = server_url {
            self.server_url = server_url;
        }
        if let Some(api_base) = api_base {
            self.api_base = Some(api_base);
        }
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            anyhow::bail!("server_url must start with ws:// or wss://: {}", self.server_url);
        }
        if let Some(api_base) = &self.api_base {
            if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
                anyhow::bail!("api_base must start with http:// or https://: {api_base}");
            }
        }
        let reconnect = &self.reconnect;
        if reconnect.floor.is_zero() {
            anyhow::bail!("reconnect.floor must be greater than zero");
        }
        if reconnect.floor > reconnect.cap {
            anyhow::bail!(
                "reconnect.floor ({}) exceeds reconnect.cap ({})",
                humantime::format_duration(reconnect.floor),
                humantime::format_duration(reconnect.cap)
            );
        }
        if !(0.0..1.0).contains(&reconnect.jitter) {
            anyhow::bail!("reconnect.jitter must be in [0, 1), got {}", reconnect.jitter);
        }
        if self.commands.timeout.is_zero() {
            anyhow::bail!("commands.timeout must be greater than zero");
        }
        if self.grid.page_rows == 0 {
            anyhow::bail!("grid.page_rows must be at least 1");
        }
        Ok(())
    }

    pub(crate) fn api_base(&self) -> anyhow::Result<String> {
        match &self.api_base {
            Some(api_base) => Ok(api_base.trim_end_matches('/').to_string()),
            None => derive_api_base(&self.server_url),
        }
    }

    pub(crate) fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            reconnect_floor: self.reconnect.floor,
            reconnect_cap: self.reconnect.cap,
            reconnect_jitter: self.reconnect.jitter,
            ..StreamConfig::default()
        }
    }
}

pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<ConsoleConfig> {
    let Some(path) = path else {
        return Ok(ConsoleConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: ConsoleConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// `ws://host:port/ws` becomes `http://host:port`.
pub(crate) fn derive_api_base(server_url: &str) -> anyhow::Result<String> {
    let (scheme, rest) = if let Some(rest) = server_url.strip_prefix("wss://") {
        ("https", rest)
    } else if let Some(rest) = server_url.strip_prefix("ws://") {
        ("http", rest)
    } else {
        anyhow::bail!("cannot derive api base from {server_url}");
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        anyhow::bail!("server url has no host: {server_url}");
    }
    Ok(format!("{scheme}://{authority}"))
}

fn human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
