// src/providers/mod.rs
pub mod openai;
pub mod tmdb;

use anyhow::Result;

use crate::model::{EpisodeDescriptor, MediaDetail, MediaKind, MediaSummary};

/// Movie/TV metadata lookups.
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    /// Ordered results; the first one is authoritative.
    async fn search_by_title(&self, text: &str) -> Result<Vec<MediaSummary>>;
    async fn details_with_locale(
        &self,
        id: u64,
        kind: MediaKind,
        locale: &str,
    ) -> Result<Option<MediaDetail>>;
    /// Episodes not yet aired (or airing today), in broadcast order.
    async fn upcoming_episodes_for(&self, series_id: u64) -> Result<Vec<EpisodeDescriptor>>;
    /// Globally popular titles, used when personalization is unavailable.
    async fn trending(&self) -> Result<Vec<MediaSummary>>;
    fn name(&self) -> &'static str;
}

/// Free-form text generation.
#[async_trait::async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}
