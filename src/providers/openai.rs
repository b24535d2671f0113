//! OpenAI Chat Completions client implementing [`TextCompleter`].

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::TextCompleter;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiCompleter {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiCompleter {
    /// `model_override`: pass Some("gpt-4o") to override; defaults to gpt-4o-mini.
    pub fn new(api_key: String, model_override: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .user_agent("cinetrack/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(45))
            .build()
            .context("build openai http client")?;
        Ok(Self {
            http,
            api_key,
            model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
            endpoint: ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

#[async_trait::async_trait]
impl TextCompleter for OpenAiCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY not configured");
        }

        let sys = "You recommend movies and TV shows. Answer with a JSON array only, no prose.";
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        let body: Resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?
            .error_for_status()
            .context("openai non-2xx")?
            .json()
            .await
            .context("openai decode")?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("openai returned no choices"))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
