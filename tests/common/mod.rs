// tests/common/mod.rs
// Hand-written collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, TimeZone};

use cinetrack::clock::ManualClock;
use cinetrack::model::{
    EpisodeDescriptor, MediaDetail, MediaItem, MediaKind, MediaSummary, Origin, WatchStatus,
};
use cinetrack::notify::{PushMessage, PushRelay};
use cinetrack::providers::{MetadataSource, TextCompleter};
use cinetrack::subscription::{
    Permission, PushPlatform, PushSubscription, RemoteUserStore, SubscriptionKeys, WorkerHandle,
};

// ------------------------------------------------------------
// Fixtures
// ------------------------------------------------------------

/// Clock at `y-m-d h:00` in UTC-03:00.
pub fn clock_at(y: i32, m: u32, d: u32, h: u32) -> Arc<ManualClock> {
    let tz = FixedOffset::west_opt(3 * 3600).unwrap();
    Arc::new(ManualClock::new(
        tz.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
    ))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn series(id: u64, title: &str) -> MediaItem {
    MediaItem {
        doc_id: format!("doc-{id}"),
        external_id: id,
        kind: MediaKind::Tv,
        origin: Origin::Tmdb,
        status: WatchStatus::Watchlist,
        rating: None,
        title: title.to_string(),
        localized_title: None,
        poster_path: Some(format!("/poster{id}.jpg")),
    }
}

pub fn watched(id: u64, title: &str, rating: u8) -> MediaItem {
    MediaItem {
        doc_id: format!("doc-{id}"),
        external_id: id,
        kind: MediaKind::Movie,
        origin: Origin::Tmdb,
        status: WatchStatus::History,
        rating: Some(rating),
        title: title.to_string(),
        localized_title: None,
        poster_path: None,
    }
}

pub fn episode(season: u32, number: u32, air: NaiveDate) -> EpisodeDescriptor {
    EpisodeDescriptor {
        season_number: season,
        episode_number: number,
        name: format!("Episode {number}"),
        air_date: air,
        runtime: Some(45),
    }
}

pub fn summary(id: u64, title: &str) -> MediaSummary {
    MediaSummary {
        id,
        kind: MediaKind::Movie,
        title: title.to_string(),
        overview: None,
        poster_path: None,
    }
}

// ------------------------------------------------------------
// Metadata source
// ------------------------------------------------------------

#[derive(Default)]
pub struct FakeMetadata {
    episodes: Mutex<HashMap<u64, Result<Vec<EpisodeDescriptor>, String>>>,
    localized: Mutex<HashMap<u64, Result<Option<String>, String>>>,
    search: Mutex<HashMap<String, Vec<MediaSummary>>>,
    search_fails: AtomicBool,
    trending: Mutex<Vec<MediaSummary>>,
    pub upcoming_calls: AtomicUsize,
    pub details_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub trending_calls: AtomicUsize,
}

impl FakeMetadata {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_episodes(&self, series_id: u64, eps: Vec<EpisodeDescriptor>) -> &Self {
        self.episodes.lock().unwrap().insert(series_id, Ok(eps));
        self
    }

    pub fn failing_series(&self, series_id: u64) -> &Self {
        self.episodes
            .lock()
            .unwrap()
            .insert(series_id, Err("upstream 503".into()));
        self
    }

    pub fn with_localized(&self, series_id: u64, name: &str) -> &Self {
        self.localized
            .lock()
            .unwrap()
            .insert(series_id, Ok(Some(name.to_string())));
        self
    }

    pub fn failing_localized(&self, series_id: u64) -> &Self {
        self.localized
            .lock()
            .unwrap()
            .insert(series_id, Err("locale lookup down".into()));
        self
    }

    pub fn with_search(&self, title: &str, hits: Vec<MediaSummary>) -> &Self {
        self.search.lock().unwrap().insert(title.to_string(), hits);
        self
    }

    pub fn fail_search(&self) -> &Self {
        self.search_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_trending(&self, list: Vec<MediaSummary>) -> &Self {
        *self.trending.lock().unwrap() = list;
        self
    }
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn search_by_title(&self, text: &str) -> Result<Vec<MediaSummary>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.search_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("search unavailable"));
        }
        Ok(self
            .search
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_default())
    }

    async fn details_with_locale(
        &self,
        id: u64,
        _kind: MediaKind,
        _locale: &str,
    ) -> Result<Option<MediaDetail>> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        match self.localized.lock().unwrap().get(&id) {
            Some(Ok(Some(name))) => Ok(Some(MediaDetail {
                id,
                name: name.clone(),
            })),
            Some(Ok(None)) | None => Ok(None),
            Some(Err(e)) => Err(anyhow!(e.clone())),
        }
    }

    async fn upcoming_episodes_for(&self, series_id: u64) -> Result<Vec<EpisodeDescriptor>> {
        self.upcoming_calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent fetches interleave.
        tokio::task::yield_now().await;
        match self.episodes.lock().unwrap().get(&series_id) {
            Some(Ok(eps)) => Ok(eps.clone()),
            Some(Err(e)) => Err(anyhow!(e.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn trending(&self) -> Result<Vec<MediaSummary>> {
        self.trending_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.trending.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "fake-metadata"
    }
}

// ------------------------------------------------------------
// Text completer
// ------------------------------------------------------------

pub struct FakeCompleter {
    response: Mutex<Result<String, String>>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeCompleter {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(text.to_string())),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err("rate limited".into())),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn set_reply(&self, text: &str) {
        *self.response.lock().unwrap() = Ok(text.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TextCompleter for FakeCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }

    fn name(&self) -> &'static str {
        "fake-ai"
    }
}

// ------------------------------------------------------------
// Push relay
// ------------------------------------------------------------

#[derive(Default)]
pub struct FakeRelay {
    failing_titles: Mutex<HashSet<String>>,
    pub sent: Mutex<Vec<(String, PushMessage, tokio::time::Instant)>>,
    pub attempts: AtomicUsize,
}

impl FakeRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, title: &str) {
        self.failing_titles.lock().unwrap().insert(title.to_string());
    }

    pub fn heal(&self) {
        self.failing_titles.lock().unwrap().clear();
    }

    pub fn sent_titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m, _)| m.title.clone())
            .collect()
    }
}

#[async_trait]
impl PushRelay for FakeRelay {
    async fn send(&self, topic: &str, msg: &PushMessage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_titles.lock().unwrap().contains(&msg.title) {
            return Err(anyhow!("relay returned 429"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), msg.clone(), tokio::time::Instant::now()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-relay"
    }
}

// ------------------------------------------------------------
// Push platform + remote store
// ------------------------------------------------------------

pub struct FakePlatform {
    pub supported: AtomicBool,
    pub mobile: AtomicBool,
    pub standalone: AtomicBool,
    pub permission: Mutex<Permission>,
    pub existing: Mutex<Option<WorkerHandle>>,
    /// `None` means the worker never becomes ready.
    pub ready: Mutex<Option<WorkerHandle>>,
    pub subscribe_fails: AtomicBool,
    pub unsubscribe_fails: AtomicBool,
    pub current: Mutex<Option<PushSubscription>>,
    pub permission_requests: AtomicUsize,
}

pub fn active_worker() -> WorkerHandle {
    WorkerHandle {
        scope: "/".into(),
        active: true,
        push_manager: true,
    }
}

impl FakePlatform {
    /// Mobile, push-capable, permission granted, worker already registered.
    pub fn happy() -> Arc<Self> {
        Arc::new(Self {
            supported: AtomicBool::new(true),
            mobile: AtomicBool::new(true),
            standalone: AtomicBool::new(false),
            permission: Mutex::new(Permission::Granted),
            existing: Mutex::new(Some(active_worker())),
            ready: Mutex::new(Some(active_worker())),
            subscribe_fails: AtomicBool::new(false),
            unsubscribe_fails: AtomicBool::new(false),
            current: Mutex::new(None),
            permission_requests: AtomicUsize::new(0),
        })
    }

    pub fn set_permission(&self, p: Permission) {
        *self.permission.lock().unwrap() = p;
    }

    pub fn is_subscribed(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }
}

#[async_trait]
impl PushPlatform for FakePlatform {
    fn push_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    fn is_mobile(&self) -> bool {
        self.mobile.load(Ordering::SeqCst)
    }

    fn is_standalone(&self) -> bool {
        self.standalone.load(Ordering::SeqCst)
    }

    fn user_agent(&self) -> String {
        "FakePhone/1.0".into()
    }

    async fn request_permission(&self) -> Permission {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        *self.permission.lock().unwrap()
    }

    async fn existing_worker(&self) -> Option<WorkerHandle> {
        self.existing.lock().unwrap().clone()
    }

    async fn worker_ready(&self) -> WorkerHandle {
        let ready = self.ready.lock().unwrap().clone();
        match ready {
            Some(w) => w,
            None => std::future::pending().await,
        }
    }

    async fn subscribe(&self, _worker: &WorkerHandle) -> Result<PushSubscription> {
        if self.subscribe_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("AbortError: registration failed"));
        }
        let sub = PushSubscription {
            endpoint: "https://push.example/ep/abc".into(),
            keys: SubscriptionKeys {
                p256dh: "BPk".into(),
                auth: "x1".into(),
            },
        };
        *self.current.lock().unwrap() = Some(sub.clone());
        Ok(sub)
    }

    async fn current_subscription(&self) -> Option<PushSubscription> {
        self.current.lock().unwrap().clone()
    }

    async fn unsubscribe(&self, _sub: &PushSubscription) -> Result<()> {
        if self.unsubscribe_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("unsubscribe refused"));
        }
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRemote {
    pub docs: Mutex<HashMap<(String, String), serde_json::Value>>,
    pub fail_set: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn doc(&self, collection: &str, user: &str) -> Option<serde_json::Value> {
        self.docs
            .lock()
            .unwrap()
            .get(&(collection.to_string(), user.to_string()))
            .cloned()
    }
}

#[async_trait]
impl RemoteUserStore for FakeRemote {
    async fn set_user_doc(
        &self,
        collection: &str,
        user_id: &str,
        fields: serde_json::Value,
    ) -> Result<()> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(anyhow!("permission-denied by rules"));
        }
        self.docs
            .lock()
            .unwrap()
            .insert((collection.to_string(), user_id.to_string()), fields);
        Ok(())
    }

    async fn delete_user_doc(&self, collection: &str, user_id: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(anyhow!("offline"));
        }
        self.docs
            .lock()
            .unwrap()
            .remove(&(collection.to_string(), user_id.to_string()));
        Ok(())
    }
}
