// tests/recommend_strategy.rs
mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cinetrack::cache::TimedCache;
use cinetrack::model::MediaItem;
use cinetrack::recommend::{self, RecommendationSelector, SelectorLimits, Strategy};
use cinetrack::store::MemoryStore;

use common::*;

const AI_REPLY: &str = r#"```json
[{"title": "Arrival", "reason": "Cerebral sci-fi"},
 {"title": "Nowhere Film", "reason": "No match"},
 {"title": "Heat", "reason": "Already owned"}]
```"#;

fn selector(md: Arc<FakeMetadata>, ai: Arc<FakeCompleter>) -> RecommendationSelector {
    let session = Arc::new(MemoryStore::new());
    RecommendationSelector::new(
        "user-1".to_string(),
        md,
        ai,
        TimedCache::session(
            session.clone(),
            clock_at(2025, 6, 10, 12),
            recommend::CACHE_NAMESPACE,
        ),
        session,
        SelectorLimits::default(),
    )
}

fn metadata() -> Arc<FakeMetadata> {
    let md = FakeMetadata::new();
    md.with_trending(vec![summary(900, "Trending One"), summary(901, "Trending Two")])
        .with_search("Arrival", vec![summary(329865, "Arrival"), summary(1, "Arrival (1996)")])
        .with_search("Heat", vec![summary(949, "Heat")]);
    md
}

fn history(n: usize) -> Vec<MediaItem> {
    let mut v = vec![watched(949, "Heat", 5)];
    v.extend((1..n).map(|i| watched(100 + i as u64, &format!("Film {i}"), 4)));
    v
}

#[tokio::test]
async fn short_history_uses_trending_without_ai() {
    let md = metadata();
    let ai = FakeCompleter::replying(AI_REPLY);
    let sel = selector(md.clone(), ai.clone());

    let set = sel.recommend(&history(2), false).await;

    assert_eq!(set.strategy, Strategy::Trending);
    assert_eq!(set.items.len(), 2);
    assert!(set.items.iter().all(|r| r.reason.is_empty()));
    assert_eq!(ai.calls(), 0);
}

#[tokio::test]
async fn threshold_reached_goes_personalized() {
    let md = metadata();
    let ai = FakeCompleter::replying(AI_REPLY);
    let sel = selector(md.clone(), ai.clone());

    let set = sel.recommend(&history(3), false).await;

    assert_eq!(set.strategy, Strategy::Personalized);
    // Unresolved title dropped, owned title filtered, first hit wins.
    assert_eq!(set.items.len(), 1);
    assert_eq!(set.items[0].item.id, 329865);
    assert_eq!(set.items[0].reason, "Cerebral sci-fi");
    assert_eq!(md.trending_calls.load(Ordering::SeqCst), 0);

    let prompt = ai.last_prompt();
    assert!(prompt.contains("- Heat (movie, rated 5)"));
    assert!(prompt.contains("Do NOT suggest"));
}

#[tokio::test]
async fn cached_set_is_reused_while_history_length_matches() {
    let md = metadata();
    let ai = FakeCompleter::replying(AI_REPLY);
    let sel = selector(md, ai.clone());
    let coll = history(4);

    let first = sel.recommend(&coll, false).await;
    let second = sel.recommend(&coll, false).await;

    assert_eq!(second.strategy, Strategy::Cached);
    assert_eq!(second.items, first.items);
    assert_eq!(ai.calls(), 1);
}

#[tokio::test]
async fn threshold_sized_history_serves_cache_without_new_request() {
    let md = metadata();
    let ai = FakeCompleter::replying(AI_REPLY);
    let sel = selector(md.clone(), ai.clone());
    let coll = history(3);

    let first = sel.recommend(&coll, false).await;
    assert_eq!(first.strategy, Strategy::Personalized);
    let searches = md.search_calls.load(Ordering::SeqCst);

    let second = sel.recommend(&coll, false).await;

    assert_eq!(second.strategy, Strategy::Cached);
    assert_eq!(second.items, first.items);
    assert_eq!(ai.calls(), 1);
    assert_eq!(md.search_calls.load(Ordering::SeqCst), searches);
}

#[tokio::test]
async fn history_change_or_force_refresh_bypasses_cache() {
    let md = metadata();
    let ai = FakeCompleter::replying(AI_REPLY);
    let sel = selector(md, ai.clone());

    sel.recommend(&history(4), false).await;
    let grown = sel.recommend(&history(5), false).await;
    assert_eq!(grown.strategy, Strategy::Personalized);
    assert_eq!(ai.calls(), 2);

    let forced = sel.recommend(&history(5), true).await;
    assert_eq!(forced.strategy, Strategy::Personalized);
    assert_eq!(ai.calls(), 3);
}

#[tokio::test]
async fn ai_failure_degrades_to_trending() {
    let md = metadata();
    let ai = FakeCompleter::failing();
    let sel = selector(md.clone(), ai.clone());

    let set = sel.recommend(&history(6), false).await;

    assert_eq!(set.strategy, Strategy::Trending);
    assert_eq!(set.items.len(), 2);
    assert_eq!(ai.calls(), 1);

    // Nothing was cached, so the next call tries AI again.
    sel.recommend(&history(6), false).await;
    assert_eq!(ai.calls(), 2);
}

#[tokio::test]
async fn unparseable_reply_or_search_failure_degrade() {
    let md = metadata();
    let ai = FakeCompleter::replying("Sorry, I can't help with that.");
    let sel = selector(md.clone(), ai.clone());
    assert_eq!(sel.recommend(&history(3), false).await.strategy, Strategy::Trending);

    ai.set_reply(AI_REPLY);
    md.fail_search();
    assert_eq!(sel.recommend(&history(3), false).await.strategy, Strategy::Trending);
}

#[tokio::test]
async fn no_liked_titles_degrades() {
    let md = metadata();
    let ai = FakeCompleter::replying(AI_REPLY);
    let sel = selector(md, ai.clone());
    let lukewarm: Vec<MediaItem> = (0..4).map(|i| watched(i, &format!("Meh {i}"), 2)).collect();

    let set = sel.recommend(&lukewarm, false).await;

    assert_eq!(set.strategy, Strategy::Trending);
    assert_eq!(ai.calls(), 0);
}

#[tokio::test]
async fn previous_suggestions_accumulate_and_are_excluded() {
    let md = metadata();
    let ai = FakeCompleter::replying(AI_REPLY);
    let sel = selector(md, ai.clone());

    sel.recommend(&history(3), false).await;
    let prev = sel.previously_recommended();
    assert!(prev.contains("Arrival"));
    assert!(prev.contains("Nowhere Film"));

    ai.set_reply(r#"[{"title": "Sicario", "reason": "Tense"}]"#);
    sel.recommend(&history(3), true).await;
    assert!(ai.last_prompt().contains("- Nowhere Film\n"));
    let prev = sel.previously_recommended();
    assert!(prev.contains("Arrival") && prev.contains("Sicario"));

    sel.clear();
    assert!(sel.previously_recommended().is_empty());
}
