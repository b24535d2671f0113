//! # Episode aggregator
//! Builds the per-user list of upcoming episodes across every tracked series.
//!
//! - No tracked series: empty result, cache untouched.
//! - Cache hit (24h window): cached sequence returned as-is.
//! - Otherwise every series is fetched concurrently. A series whose fetch fails
//!   contributes nothing; the rest still make it into the result.
//! - The merged list is stable-sorted by air date and written back, even when empty.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use metrics::{counter, gauge};
use tracing::{debug, info, warn};

use crate::cache::TimedCache;
use crate::model::{
    tracked_series, MediaItem, MediaKind, TrackedSeries, UpcomingEpisodeRecord, UserId,
};
use crate::providers::MetadataSource;
use crate::telemetry::{anon_id, ensure_metrics_described};

pub const CACHE_NAMESPACE: &str = "upcoming_episodes";

pub struct EpisodeAggregator {
    user: UserId,
    metadata: Arc<dyn MetadataSource>,
    cache: TimedCache,
    locale: String,
}

impl EpisodeAggregator {
    pub fn new(
        user: UserId,
        metadata: Arc<dyn MetadataSource>,
        cache: TimedCache,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            user,
            metadata,
            cache,
            locale: locale.into(),
        }
    }

    /// Upcoming episodes for the tracked series in `collection`.
    pub async fn upcoming(&self, collection: &[MediaItem]) -> Vec<UpcomingEpisodeRecord> {
        self.upcoming_for(&tracked_series(collection)).await
    }

    pub async fn upcoming_for(&self, series: &[TrackedSeries]) -> Vec<UpcomingEpisodeRecord> {
        ensure_metrics_described();

        if series.is_empty() {
            return Vec::new();
        }

        if let Some(hit) = self.cache.read::<Vec<UpcomingEpisodeRecord>>(&self.user) {
            debug!(user = %anon_id(&self.user), count = hit.len(), "upcoming episodes cache hit");
            counter!("episodes_cache_hits_total").increment(1);
            return hit;
        }

        let per_series = join_all(series.iter().map(|s| self.fetch_series(s))).await;
        let merged = merge_sorted(per_series);

        self.cache.write(&self.user, &merged);
        gauge!("aggregation_last_run_ts").set((self.cache.now_ms() / 1000) as f64);
        info!(
            user = %anon_id(&self.user),
            series = series.len(),
            episodes = merged.len(),
            "upcoming episodes refreshed"
        );
        merged
    }

    /// Drop the cached sequence, so the next call goes to the network.
    pub fn invalidate(&self) {
        self.cache.clear(&self.user);
    }

    async fn fetch_series(&self, series: &TrackedSeries) -> Vec<UpcomingEpisodeRecord> {
        let episodes = match self.metadata.upcoming_episodes_for(series.id).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = ?e, series_id = series.id, "upcoming fetch failed, skipping series");
                counter!("episodes_fetch_errors_total").increment(1);
                return Vec::new();
            }
        };
        if episodes.is_empty() {
            return Vec::new();
        }

        let localized = match &series.localized_title {
            Some(t) => Some(t.clone()),
            None => self.localized_name(series.id).await,
        };

        episodes
            .into_iter()
            .map(|episode| UpcomingEpisodeRecord {
                series_id: series.id,
                series_title: series.title.clone(),
                series_localized_title: localized.clone(),
                poster_path: series.poster_path.clone(),
                episode,
                doc_id: series.doc_id.clone(),
            })
            .collect()
    }

    async fn localized_name(&self, series_id: u64) -> Option<String> {
        match self
            .metadata
            .details_with_locale(series_id, MediaKind::Tv, &self.locale)
            .await
        {
            Ok(detail) => detail.map(|d| d.name),
            Err(e) => {
                debug!(error = ?e, series_id, "localized title lookup failed");
                None
            }
        }
    }
}

/// Flatten in series order, keep the first record per (series, season, episode),
/// then stable-sort by air date.
fn merge_sorted(per_series: Vec<Vec<UpcomingEpisodeRecord>>) -> Vec<UpcomingEpisodeRecord> {
    let mut seen = HashSet::new();
    let mut out: Vec<UpcomingEpisodeRecord> = per_series
        .into_iter()
        .flatten()
        .filter(|r| seen.insert(r.key()))
        .collect();
    out.sort_by_key(|r| r.episode.air_date);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EpisodeDescriptor;
    use chrono::NaiveDate;

    fn rec(series: u64, ep: u32, day: u32) -> UpcomingEpisodeRecord {
        UpcomingEpisodeRecord {
            series_id: series,
            series_title: format!("S{series}"),
            series_localized_title: None,
            poster_path: None,
            episode: EpisodeDescriptor {
                season_number: 1,
                episode_number: ep,
                name: format!("E{ep}"),
                air_date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
                runtime: None,
            },
            doc_id: format!("doc{series}"),
        }
    }

    #[test]
    fn merge_is_stable_on_equal_dates() {
        let out = merge_sorted(vec![
            vec![rec(1, 1, 10), rec(1, 2, 3)],
            vec![rec(2, 1, 10)],
            vec![rec(3, 1, 10)],
        ]);
        let order: Vec<(u64, u32)> = out.iter().map(|r| (r.series_id, r.episode.episode_number)).collect();
        assert_eq!(order, vec![(1, 2), (1, 1), (2, 1), (3, 1)]);
    }

    #[test]
    fn merge_drops_duplicate_triples() {
        let out = merge_sorted(vec![vec![rec(1, 1, 10), rec(1, 1, 11)], vec![rec(1, 1, 12)]]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].episode.air_date.to_string(), "2025-05-10");
    }
}
