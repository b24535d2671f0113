//! Collection documents and the derived records the pipeline produces.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type UserId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

/// Where a collection item's metadata came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Tmdb,
    Manual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    Watchlist,
    History,
}

/// One document of the user's collection, as stored by the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    /// Collection-document id.
    pub doc_id: String,
    /// Metadata-source id.
    pub external_id: u64,
    pub kind: MediaKind,
    pub origin: Origin,
    pub status: WatchStatus,
    #[serde(default)]
    pub rating: Option<u8>,
    pub title: String,
    #[serde(default)]
    pub localized_title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl MediaItem {
    /// Series tracked for upcoming episodes: a TV item whose id is a metadata-source id.
    pub fn as_tracked_series(&self) -> Option<TrackedSeries> {
        if self.kind != MediaKind::Tv || self.origin != Origin::Tmdb {
            return None;
        }
        Some(TrackedSeries {
            id: self.external_id,
            doc_id: self.doc_id.clone(),
            title: self.title.clone(),
            localized_title: self.localized_title.clone(),
            poster_path: self.poster_path.clone(),
        })
    }

    pub fn is_watched(&self) -> bool {
        self.status == WatchStatus::History
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedSeries {
    pub id: u64,
    pub doc_id: String,
    pub title: String,
    pub localized_title: Option<String>,
    pub poster_path: Option<String>,
}

/// Pick every tracked series out of a collection, in collection order.
pub fn tracked_series(collection: &[MediaItem]) -> Vec<TrackedSeries> {
    collection
        .iter()
        .filter_map(MediaItem::as_tracked_series)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeDescriptor {
    pub season_number: u32,
    pub episode_number: u32,
    pub name: String,
    pub air_date: NaiveDate,
    #[serde(default)]
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpcomingEpisodeRecord {
    pub series_id: u64,
    pub series_title: String,
    pub series_localized_title: Option<String>,
    pub poster_path: Option<String>,
    pub episode: EpisodeDescriptor,
    /// Collection-document id of the tracked series.
    pub doc_id: String,
}

impl UpcomingEpisodeRecord {
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey {
            series_id: self.series_id,
            season: self.episode.season_number,
            episode: self.episode.episode_number,
        }
    }

    /// Localized title when known, default-locale title otherwise.
    pub fn display_title(&self) -> &str {
        self.series_localized_title
            .as_deref()
            .unwrap_or(&self.series_title)
    }
}

/// Identity of one airing event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EpisodeKey {
    pub series_id: u64,
    pub season: u32,
    pub episode: u32,
}

/// A search hit or trending entry from the metadata source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaSummary {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// Localized detail lookup result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaDetail {
    pub id: u64,
    pub name: String,
}

/// Raw `{title, reason}` pair as emitted by the text generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestedTitle {
    pub title: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub item: MediaSummary,
    /// Why it was suggested. Empty for trending entries.
    pub reason: String,
}
