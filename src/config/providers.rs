// src/config/providers.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_env() -> String {
    "ENV".to_string()
}
fn default_ntfy_base_url() -> String {
    "https://ntfy.sh".to_string()
}

/// Credentials and endpoints of the external collaborators.
/// A value of `"ENV"` means: read it from the matching environment variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderKeys {
    #[serde(default = "default_env")]
    pub tmdb_api_key: String,
    #[serde(default = "default_env")]
    pub openai_api_key: String,
    #[serde(default)]
    pub openai_model: Option<String>,
    #[serde(default = "default_ntfy_base_url")]
    pub ntfy_base_url: String,
    /// Optional access token for a protected relay.
    #[serde(default = "default_env")]
    pub ntfy_token: String,
}

impl Default for ProviderKeys {
    fn default() -> Self {
        Self {
            tmdb_api_key: default_env(),
            openai_api_key: default_env(),
            openai_model: None,
            ntfy_base_url: default_ntfy_base_url(),
            ntfy_token: default_env(),
        }
    }
}

impl ProviderKeys {
    /// Replace `"ENV"` placeholders with environment values. Missing variables resolve
    /// to an empty string; clients treat an empty key as "not configured".
    pub fn resolve_env(&mut self) {
        self.tmdb_api_key = resolve(&self.tmdb_api_key, "TMDB_API_KEY");
        self.openai_api_key = resolve(&self.openai_api_key, "OPENAI_API_KEY");
        self.ntfy_token = resolve(&self.ntfy_token, "NTFY_TOKEN");
        self.ntfy_base_url = self.ntfy_base_url.trim_end_matches('/').to_string();
    }

    pub fn ntfy_token(&self) -> Option<&str> {
        let t = self.ntfy_token.trim();
        (!t.is_empty()).then_some(t)
    }
}

fn resolve(value: &str, var: &str) -> String {
    if value.trim().eq_ignore_ascii_case("env") {
        env::var(var).unwrap_or_default()
    } else {
        value.to_string()
    }
}
