// src/config/refresh.rs
use serde::{Deserialize, Serialize};

fn default_episode_cache_ttl_hours() -> i64 {
    24
}
fn default_send_delay_ms() -> u64 {
    500
}
fn default_worker_ready_timeout_secs() -> u64 {
    10
}
fn default_history_threshold() -> usize {
    3
}
fn default_liked_min_rating() -> u8 {
    3
}
fn default_max_prompt_items() -> usize {
    150
}
fn default_locale() -> String {
    "pt-BR".to_string()
}
fn default_ui_language() -> String {
    "en".to_string()
}
fn default_topic_prefix() -> String {
    "cinetrack".to_string()
}
fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w185".to_string()
}
fn default_store_dir() -> String {
    "state".to_string()
}

/// Tunables of the refresh/notification pipeline. Every field has a default, so an
/// empty `[refresh]` table (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshConfig {
    #[serde(default = "default_episode_cache_ttl_hours")]
    pub episode_cache_ttl_hours: i64,
    /// Pause between two push sends.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
    #[serde(default = "default_worker_ready_timeout_secs")]
    pub worker_ready_timeout_secs: u64,
    /// Watched items needed before the AI path is attempted.
    #[serde(default = "default_history_threshold")]
    pub history_threshold: usize,
    #[serde(default = "default_liked_min_rating")]
    pub liked_min_rating: u8,
    #[serde(default = "default_max_prompt_items")]
    pub max_prompt_items: usize,
    /// Locale for secondary title lookups, e.g. "pt-BR".
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Language of user-facing messages ("en" | "pt").
    #[serde(default = "default_ui_language")]
    pub ui_language: String,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    /// Opened when a notification is tapped.
    #[serde(default)]
    pub app_url: Option<String>,
    /// Directory of the long-lived file store.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            episode_cache_ttl_hours: default_episode_cache_ttl_hours(),
            send_delay_ms: default_send_delay_ms(),
            worker_ready_timeout_secs: default_worker_ready_timeout_secs(),
            history_threshold: default_history_threshold(),
            liked_min_rating: default_liked_min_rating(),
            max_prompt_items: default_max_prompt_items(),
            locale: default_locale(),
            ui_language: default_ui_language(),
            topic_prefix: default_topic_prefix(),
            image_base_url: default_image_base_url(),
            app_url: None,
            store_dir: default_store_dir(),
        }
    }
}

/// One year. Longer windows are clamped.
pub const MAX_EPISODE_CACHE_TTL_HOURS: i64 = 24 * 365;

impl RefreshConfig {
    /// Put out-of-range values back to their defaults.
    pub fn sanitize(&mut self) {
        if self.episode_cache_ttl_hours <= 0 {
            self.episode_cache_ttl_hours = default_episode_cache_ttl_hours();
        }
        self.episode_cache_ttl_hours = self.episode_cache_ttl_hours.min(MAX_EPISODE_CACHE_TTL_HOURS);
        if self.worker_ready_timeout_secs == 0 {
            self.worker_ready_timeout_secs = default_worker_ready_timeout_secs();
        }
        if !(1..=5).contains(&self.liked_min_rating) {
            self.liked_min_rating = default_liked_min_rating();
        }
        if self.max_prompt_items == 0 {
            self.max_prompt_items = default_max_prompt_items();
        }
        if self.locale.trim().is_empty() {
            self.locale = default_locale();
        }
        if self.topic_prefix.trim().is_empty() {
            self.topic_prefix = default_topic_prefix();
        }
        self.image_base_url = self.image_base_url.trim_end_matches('/').to_string();
    }

    pub fn episode_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.episode_cache_ttl_hours.min(MAX_EPISODE_CACHE_TTL_HOURS))
            .unwrap_or_else(|| chrono::Duration::hours(default_episode_cache_ttl_hours()))
    }

    pub fn send_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.send_delay_ms)
    }

    pub fn worker_ready_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.worker_ready_timeout_secs)
    }

    /// Full poster URL for a metadata-source poster path.
    pub fn poster_url(&self, poster_path: &str) -> String {
        poster_url(&self.image_base_url, poster_path)
    }
}

/// Absolute paths pass through untouched.
pub fn poster_url(image_base_url: &str, poster_path: &str) -> String {
    if poster_path.starts_with("http") {
        return poster_path.to_string();
    }
    format!(
        "{}/{}",
        image_base_url.trim_end_matches('/'),
        poster_path.trim_start_matches('/')
    )
}
