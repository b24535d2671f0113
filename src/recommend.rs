//! # Recommendation strategy selector
//! Chooses between AI-personalized suggestions and the trending list.
//!
//! Fewer watched items than the threshold: trending, always fetched fresh.
//! Otherwise the session cache is used when the watched count it was built from
//! still matches exactly. On a miss the AI chain runs; any failure along that
//! chain degrades to trending and is only visible in logs.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::future::try_join_all;
use metrics::counter;
use once_cell::sync::OnceCell;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::TimedCache;
use crate::config::RefreshConfig;
use crate::model::{MediaItem, Recommendation, SuggestedTitle, UserId};
use crate::providers::{MetadataSource, TextCompleter};
use crate::store::KeyValueStore;
use crate::telemetry::{anon_id, ensure_metrics_described};

pub const CACHE_NAMESPACE: &str = "recommendations";
pub const PREVIOUS_NAMESPACE: &str = "previously_recommended";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fresh AI suggestions.
    Personalized,
    /// AI suggestions from earlier in this session.
    Cached,
    Trending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSet {
    pub strategy: Strategy,
    pub items: Vec<Recommendation>,
}

/// Result of a step that may fall back: the value is always usable, `Degraded`
/// remembers why the preferred path was not taken.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Fresh(T),
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn into_value(self) -> T {
        match self {
            Outcome::Fresh(v) => v,
            Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Fresh(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedRecommendations {
    /// Watched-history length the entry was computed from.
    history_len: usize,
    items: Vec<Recommendation>,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectorLimits {
    pub history_threshold: usize,
    pub liked_min_rating: u8,
    pub max_prompt_items: usize,
}

impl SelectorLimits {
    pub fn from_config(cfg: &RefreshConfig) -> Self {
        Self {
            history_threshold: cfg.history_threshold,
            liked_min_rating: cfg.liked_min_rating,
            max_prompt_items: cfg.max_prompt_items,
        }
    }
}

impl Default for SelectorLimits {
    fn default() -> Self {
        Self {
            history_threshold: 3,
            liked_min_rating: 3,
            max_prompt_items: 150,
        }
    }
}

pub struct RecommendationSelector {
    user: UserId,
    metadata: Arc<dyn MetadataSource>,
    completer: Arc<dyn TextCompleter>,
    cache: TimedCache,
    session_store: Arc<dyn KeyValueStore>,
    limits: SelectorLimits,
}

impl RecommendationSelector {
    pub fn new(
        user: UserId,
        metadata: Arc<dyn MetadataSource>,
        completer: Arc<dyn TextCompleter>,
        cache: TimedCache,
        session_store: Arc<dyn KeyValueStore>,
        limits: SelectorLimits,
    ) -> Self {
        Self {
            user,
            metadata,
            completer,
            cache,
            session_store,
            limits,
        }
    }

    pub async fn recommend(&self, collection: &[MediaItem], force_refresh: bool) -> RecommendationSet {
        ensure_metrics_described();

        let watched: Vec<&MediaItem> = collection.iter().filter(|i| i.is_watched()).collect();
        if watched.len() < self.limits.history_threshold {
            debug!(watched = watched.len(), "history below threshold, using trending");
            return RecommendationSet {
                strategy: Strategy::Trending,
                items: self.trending().await,
            };
        }

        if !force_refresh {
            if let Some(hit) = self.cache.read::<CachedRecommendations>(&self.user) {
                if hit.history_len == watched.len() {
                    return RecommendationSet {
                        strategy: Strategy::Cached,
                        items: hit.items,
                    };
                }
            }
        }

        match self.personalized(collection, &watched).await {
            Outcome::Fresh(items) => RecommendationSet {
                strategy: Strategy::Personalized,
                items,
            },
            Outcome::Degraded { value, reason } => {
                warn!(user = %anon_id(&self.user), %reason, "AI recommendations unavailable, falling back to trending");
                counter!("recommendations_degraded_total").increment(1);
                RecommendationSet {
                    strategy: Strategy::Trending,
                    items: value,
                }
            }
        }
    }

    /// Titles suggested so far in this session.
    /// A stored set that no longer parses is dropped and read as empty.
    pub fn previously_recommended(&self) -> BTreeSet<String> {
        let key = self.previous_key();
        let Some(raw) = self.session_store.get(&key) else {
            return BTreeSet::new();
        };
        match serde_json::from_str(&raw) {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "corrupt previously-recommended set, resetting");
                self.session_store.remove(&key);
                BTreeSet::new()
            }
        }
    }

    pub fn clear(&self) {
        self.cache.clear(&self.user);
        self.session_store.remove(&self.previous_key());
    }

    async fn personalized(
        &self,
        collection: &[MediaItem],
        watched: &[&MediaItem],
    ) -> Outcome<Vec<Recommendation>> {
        match self.try_personalized(collection, watched).await {
            Ok(items) => Outcome::Fresh(items),
            Err(e) => Outcome::Degraded {
                value: self.trending().await,
                reason: format!("{e:#}"),
            },
        }
    }

    async fn try_personalized(
        &self,
        collection: &[MediaItem],
        watched: &[&MediaItem],
    ) -> Result<Vec<Recommendation>> {
        let mut liked: Vec<&MediaItem> = watched
            .iter()
            .copied()
            .filter(|i| i.rating.is_some_and(|r| r >= self.limits.liked_min_rating))
            .collect();
        if liked.is_empty() {
            bail!("no liked titles in watch history");
        }
        liked.shuffle(&mut rand::rng());
        liked.truncate(self.limits.max_prompt_items);

        let previous = self.previously_recommended();
        let mut exclusions: BTreeSet<&str> = collection.iter().map(|i| i.title.as_str()).collect();
        exclusions.extend(previous.iter().map(String::as_str));

        let prompt = build_prompt(&liked, &exclusions);
        let raw = self
            .completer
            .complete(&prompt)
            .await
            .with_context(|| format!("{} completion", self.completer.name()))?;
        let suggestions = parse_suggestions(&raw)?;

        let resolved = try_join_all(suggestions.iter().map(|s| self.resolve(s))).await?;
        let items: Vec<Recommendation> = resolved
            .into_iter()
            .flatten()
            .filter(|r| {
                !collection
                    .iter()
                    .any(|c| c.external_id == r.item.id && c.kind == r.item.kind)
            })
            .collect();

        let mut merged = previous;
        merged.extend(suggestions.into_iter().map(|s| s.title));
        self.save_previous(&merged);

        self.cache.write(
            &self.user,
            &CachedRecommendations {
                history_len: watched.len(),
                items: items.clone(),
            },
        );
        info!(
            user = %anon_id(&self.user),
            sampled = liked.len(),
            resolved = items.len(),
            "AI recommendations refreshed"
        );
        Ok(items)
    }

    /// First search hit wins; no hit means the suggestion is dropped.
    async fn resolve(&self, s: &SuggestedTitle) -> Result<Option<Recommendation>> {
        let hits = self
            .metadata
            .search_by_title(&s.title)
            .await
            .with_context(|| format!("resolve suggestion '{}'", s.title))?;
        Ok(hits.into_iter().next().map(|item| Recommendation {
            item,
            reason: s.reason.clone(),
        }))
    }

    async fn trending(&self) -> Vec<Recommendation> {
        match self.metadata.trending().await {
            Ok(list) => list
                .into_iter()
                .map(|item| Recommendation {
                    item,
                    reason: String::new(),
                })
                .collect(),
            Err(e) => {
                warn!(error = ?e, "trending fetch failed");
                Vec::new()
            }
        }
    }

    fn previous_key(&self) -> String {
        format!("{}:{}", PREVIOUS_NAMESPACE, self.user)
    }

    fn save_previous(&self, titles: &BTreeSet<String>) {
        match serde_json::to_string(titles) {
            Ok(json) => self.session_store.set(&self.previous_key(), &json),
            Err(e) => warn!(error = %e, "previously-recommended encode failed"),
        }
    }
}

fn build_prompt(liked: &[&MediaItem], exclusions: &BTreeSet<&str>) -> String {
    let mut p = String::from(
        "Based on the movies and TV shows this user watched and liked (rating 1-5), \
         suggest 10 titles they have not seen.\n\nLiked:\n",
    );
    for it in liked {
        p.push_str(&format!(
            "- {} ({}, rated {})\n",
            it.title,
            it.kind.as_str(),
            it.rating.unwrap_or_default()
        ));
    }
    if !exclusions.is_empty() {
        p.push_str("\nDo NOT suggest any of these:\n");
        for t in exclusions {
            p.push_str(&format!("- {t}\n"));
        }
    }
    p.push_str(
        "\nRespond with a JSON array only: [{\"title\": \"...\", \"reason\": \"one short sentence\"}]",
    );
    p
}

/// Pull a `[{title, reason}]` array out of model output, tolerating code fences
/// and stray prose around the array.
pub fn parse_suggestions(raw: &str) -> Result<Vec<SuggestedTitle>> {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    let re = RE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("fence regex")
    });

    let body = match re.captures(raw).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => raw,
    };
    let body = match (body.find('['), body.rfind(']')) {
        (Some(a), Some(b)) if a < b => &body[a..=b],
        _ => bail!("no JSON array in model output"),
    };

    let list: Vec<SuggestedTitle> =
        serde_json::from_str(body).context("model output is not a [{title, reason}] array")?;
    Ok(list
        .into_iter()
        .filter(|s| !s.title.trim().is_empty())
        .map(|s| SuggestedTitle {
            title: s.title.trim().to_string(),
            reason: s.reason.trim().to_string(),
        })
        .collect())
}
