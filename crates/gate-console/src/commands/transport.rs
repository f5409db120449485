use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use timing_protocol::command::{CommandReply, CommandRequest};

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Sends one correction and reports whether the server accepted it.
#[async_trait]
pub(crate) trait CommandTransport: Send + Sync {
    async fn send(&self, request_id: &str, request: &CommandRequest) -> anyhow::Result<()>;
}

pub(crate) struct HttpCommandTransport {
    client: Client,
    api_base: String,
    timeout: Duration,
}

impl HttpCommandTransport {
    pub(crate) fn new(api_base: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            timeout,
        })
    }
}

#[async_trait]
impl CommandTransport for HttpCommandTransport {
    async fn send(&self, request_id: &str, request: &CommandRequest) -> anyhow::Result<()> {
        let url = join_base_path(&self.api_base, request.path());
        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read reply from {url}"))?;
        let reply = serde_json::from_str::<CommandReply>(&body).ok();
        tracing::debug!(
            event = "command.http.reply",
            request_id = %request_id,
            status = status.as_u16(),
            body_len = body.len()
        );
        if !status.is_success() {
            let message = reply
                .and_then(|reply| reply.error)
                .unwrap_or_else(|| format!("server returned {status}"));
            anyhow::bail!(message);
        }
        match reply {
            Some(CommandReply {
                success: false,
                error,
            }) => anyhow::bail!(error.unwrap_or_else(|| "command rejected".to_string())),
            _ => Ok(()),
        }
    }
}

pub(crate) fn join_base_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
