use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{PushMessage, PushRelay};

/// ntfy-style relay. Publishes through the JSON endpoint (`POST {base}` with the
/// topic in the body), so titles and bodies travel as UTF-8 rather than headers.
#[derive(Clone)]
pub struct NtfyRelay {
    base_url: String,
    token: Option<String>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

#[derive(Debug, Serialize)]
struct NtfyPublish<'a> {
    topic: &'a str,
    title: &'a str,
    message: &'a str,
    priority: u8,
    #[serde(skip_serializing_if = "no_tags")]
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    click: Option<&'a str>,
}

fn no_tags(tags: &&[String]) -> bool {
    tags.is_empty()
}

impl<'a> NtfyPublish<'a> {
    fn new(topic: &'a str, msg: &'a PushMessage) -> Self {
        Self {
            topic,
            title: &msg.title,
            message: &msg.body,
            priority: msg.priority.level(),
            tags: &msg.tags,
            icon: msg.icon_url.as_deref(),
            click: msg.click_url.as_deref(),
        }
    }
}

impl NtfyRelay {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn request(&self, payload: &NtfyPublish<'_>) -> reqwest::RequestBuilder {
        let req = self
            .client
            .post(&self.base_url)
            .timeout(self.timeout)
            .json(payload);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait::async_trait]
impl PushRelay for NtfyRelay {
    async fn send(&self, topic: &str, msg: &PushMessage) -> Result<()> {
        let payload = NtfyPublish::new(topic, msg);
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self.request(&payload).send().await;
            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("relay HTTP error: {e}"),
                },
                Err(e) => anyhow!(e).context("relay request failed"),
            };
            if attempt >= self.max_retries {
                return Err(err).context(format!("send to topic after {attempt} attempts"));
            }
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }

    fn name(&self) -> &'static str {
        "ntfy"
    }
}
