//! TMDB v3 REST client implementing [`MetadataSource`].
//!
//! Upcoming episodes are the rest of the season that holds `next_episode_to_air`,
//! filtered to air dates from today on. If the season listing fails, the single
//! `next_episode_to_air` entry is still returned.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::MetadataSource;
use crate::clock::{local_date, Clock};
use crate::model::{EpisodeDescriptor, MediaDetail, MediaKind, MediaSummary};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

pub struct TmdbClient {
    http: Client,
    base_url: String,
    api_key: String,
    language: String,
    clock: Arc<dyn Clock>,
}

impl TmdbClient {
    pub fn new(api_key: String, language: String, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = Client::builder()
            .user_agent("cinetrack/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("build tmdb http client")?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            language,
            clock,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let rsp = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .with_context(|| format!("tmdb GET {path}"))?;
        if rsp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let rsp = rsp
            .error_for_status()
            .with_context(|| format!("tmdb non-2xx for {path}"))?;
        let body = rsp
            .json::<T>()
            .await
            .with_context(|| format!("tmdb decode {path}"))?;
        Ok(Some(body))
    }
}

#[async_trait::async_trait]
impl MetadataSource for TmdbClient {
    async fn search_by_title(&self, text: &str) -> Result<Vec<MediaSummary>> {
        let page: Option<ResultPage> = self
            .get_json(
                "/search/multi",
                &[("query", text), ("language", self.language.as_str())],
            )
            .await?;
        Ok(page.map(ResultPage::into_summaries).unwrap_or_default())
    }

    async fn details_with_locale(
        &self,
        id: u64,
        kind: MediaKind,
        locale: &str,
    ) -> Result<Option<MediaDetail>> {
        let path = format!("/{}/{}", kind.as_str(), id);
        let raw: Option<RawDetail> = self.get_json(&path, &[("language", locale)]).await?;
        Ok(raw.and_then(|d| {
            let name = d.name.or(d.title)?;
            let name = name.trim().to_string();
            (!name.is_empty()).then_some(MediaDetail { id: d.id, name })
        }))
    }

    async fn upcoming_episodes_for(&self, series_id: u64) -> Result<Vec<EpisodeDescriptor>> {
        let show: Option<RawShow> = self.get_json(&format!("/tv/{series_id}"), &[]).await?;
        let Some(next) = show.and_then(|s| s.next_episode_to_air) else {
            return Ok(Vec::new());
        };
        let Some(next_desc) = next.clone().into_descriptor() else {
            return Ok(Vec::new());
        };

        let today = local_date(self.clock.as_ref());
        let season_path = format!("/tv/{series_id}/season/{}", next.season_number);
        match self.get_json::<RawSeason>(&season_path, &[]).await {
            Ok(Some(season)) => {
                let eps = upcoming_from_season(season, next.episode_number, today);
                if eps.is_empty() {
                    Ok(vec![next_desc])
                } else {
                    Ok(eps)
                }
            }
            Ok(None) => Ok(vec![next_desc]),
            Err(e) => {
                tracing::warn!(error = ?e, series_id, "season listing failed, using next episode only");
                Ok(vec![next_desc])
            }
        }
    }

    async fn trending(&self) -> Result<Vec<MediaSummary>> {
        let page: Option<ResultPage> = self
            .get_json("/trending/all/week", &[("language", self.language.as_str())])
            .await?;
        Ok(page.map(ResultPage::into_summaries).unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

// ------------------------------------------------------------
// Wire shapes
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ResultPage {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    id: u64,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
}

impl ResultPage {
    /// People and other non-title hits are dropped; order is preserved.
    fn into_summaries(self) -> Vec<MediaSummary> {
        self.results
            .into_iter()
            .filter_map(|r| {
                let kind = match r.media_type.as_deref() {
                    Some("movie") => MediaKind::Movie,
                    Some("tv") => MediaKind::Tv,
                    _ => return None,
                };
                let title = r.title.or(r.name)?;
                Some(MediaSummary {
                    id: r.id,
                    kind,
                    title,
                    overview: r.overview.filter(|o| !o.is_empty()),
                    poster_path: r.poster_path,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawDetail {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawShow {
    #[serde(default)]
    next_episode_to_air: Option<RawEpisode>,
}

#[derive(Debug, Deserialize)]
struct RawSeason {
    #[serde(default)]
    episodes: Vec<RawEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEpisode {
    season_number: u32,
    episode_number: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    air_date: Option<String>,
    #[serde(default)]
    runtime: Option<u32>,
}

impl RawEpisode {
    /// Episodes without a parseable air date are unscheduled and skipped.
    fn into_descriptor(self) -> Option<EpisodeDescriptor> {
        let air_date = NaiveDate::parse_from_str(self.air_date.as_deref()?, "%Y-%m-%d").ok()?;
        Some(EpisodeDescriptor {
            season_number: self.season_number,
            episode_number: self.episode_number,
            name: self.name.unwrap_or_default(),
            air_date,
            runtime: self.runtime,
        })
    }
}

fn upcoming_from_season(
    season: RawSeason,
    from_episode: u32,
    today: NaiveDate,
) -> Vec<EpisodeDescriptor> {
    season
        .episodes
        .into_iter()
        .filter(|e| e.episode_number >= from_episode)
        .filter_map(RawEpisode::into_descriptor)
        .filter(|e| e.air_date >= today)
        .collect()
}
