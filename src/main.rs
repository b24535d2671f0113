//! cinetrack: one-shot refresh runner.
//! Reads a collection export, refreshes upcoming episodes for `CINETRACK_USER_ID`,
//! sends today's notifications and optionally prints recommendations.
//!
//! Usage: `cinetrack <collection.json> [--recommend]`

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use cinetrack::aggregator::{self, EpisodeAggregator};
use cinetrack::cache::TimedCache;
use cinetrack::clock::{Clock, SystemClock};
use cinetrack::config::Settings;
use cinetrack::ledger::DedupLedger;
use cinetrack::model::MediaItem;
use cinetrack::notify::ntfy::NtfyRelay;
use cinetrack::notify::NotificationDispatcher;
use cinetrack::providers::openai::OpenAiCompleter;
use cinetrack::providers::tmdb::TmdbClient;
use cinetrack::recommend::{self, RecommendationSelector, SelectorLimits};
use cinetrack::store::{FileStore, KeyValueStore, MemoryStore};
use cinetrack::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: cinetrack <collection.json> [--recommend]");
    };
    let want_recs = args.any(|a| a == "--recommend");

    let settings = Settings::load_default()?;
    let cfg = &settings.refresh;
    let user = std::env::var("CINETRACK_USER_ID").context("CINETRACK_USER_ID missing")?;
    if settings.providers.tmdb_api_key.is_empty() {
        bail!("TMDB_API_KEY missing");
    }

    let collection: Vec<MediaItem> = serde_json::from_str(
        &fs::read_to_string(&path).with_context(|| format!("reading collection {path}"))?,
    )
    .context("collection must be a JSON array of media items")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let durable: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&cfg.store_dir));
    let metadata = Arc::new(TmdbClient::new(
        settings.providers.tmdb_api_key.clone(),
        cfg.locale.clone(),
        clock.clone(),
    )?);
    let relay = Arc::new(
        NtfyRelay::new(settings.providers.ntfy_base_url.clone())
            .with_token(settings.providers.ntfy_token().map(str::to_string)),
    );

    let aggregator = EpisodeAggregator::new(
        user.clone(),
        metadata.clone(),
        TimedCache::new(
            durable.clone(),
            clock.clone(),
            aggregator::CACHE_NAMESPACE,
            Some(cfg.episode_cache_ttl()),
        ),
        cfg.locale.clone(),
    );
    let dispatcher = NotificationDispatcher::new(
        user.clone(),
        relay,
        DedupLedger::new(durable.clone(), clock.clone(), &user),
        clock.clone(),
        cfg,
    );

    let upcoming = aggregator.upcoming(&collection).await;
    println!("upcoming episodes: {}", upcoming.len());
    for r in &upcoming {
        println!(
            "  {}  {}  S{:02}E{:02} {}",
            r.episode.air_date,
            r.display_title(),
            r.episode.season_number,
            r.episode.episode_number,
            r.episode.name
        );
    }

    let report = dispatcher.check_and_notify(&upcoming).await;
    println!(
        "notifications: sent={} failed={} skipped={} (topic {})",
        report.sent,
        report.failed,
        report.skipped,
        dispatcher.topic()
    );

    if want_recs {
        let session: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let completer = Arc::new(OpenAiCompleter::new(
            settings.providers.openai_api_key.clone(),
            settings.providers.openai_model.as_deref(),
        )?);
        let selector = RecommendationSelector::new(
            user,
            metadata,
            completer,
            TimedCache::session(session.clone(), clock, recommend::CACHE_NAMESPACE),
            session,
            SelectorLimits::from_config(cfg),
        );
        let set = selector.recommend(&collection, false).await;
        println!("recommendations ({:?}): {}", set.strategy, set.items.len());
        for r in &set.items {
            if r.reason.is_empty() {
                println!("  {}", r.item.title);
            } else {
                println!("  {}: {}", r.item.title, r.reason);
            }
        }
    }

    Ok(())
}
