//! # Per-user session context
//! Everything user-scoped is built here on sign-in and torn down on sign-out,
//! so no cache, ledger or recommendation state can leak from one user to the next.

use std::sync::Arc;

use tracing::info;

use crate::aggregator::{self, EpisodeAggregator};
use crate::cache::TimedCache;
use crate::clock::Clock;
use crate::config::Settings;
use crate::ledger::DedupLedger;
use crate::model::{MediaItem, UpcomingEpisodeRecord, UserId};
use crate::notify::{DispatchReport, NotificationDispatcher, PushRelay};
use crate::providers::{MetadataSource, TextCompleter};
use crate::recommend::{self, RecommendationSelector, RecommendationSet, SelectorLimits};
use crate::store::KeyValueStore;
use crate::subscription::{Locale, PushPlatform, RemoteUserStore, SubscriptionManager};
use crate::telemetry::anon_id;

/// Shared collaborators. Cheap to clone.
#[derive(Clone)]
pub struct Services {
    pub metadata: Arc<dyn MetadataSource>,
    pub completer: Arc<dyn TextCompleter>,
    pub relay: Arc<dyn PushRelay>,
    pub platform: Arc<dyn PushPlatform>,
    pub remote: Arc<dyn RemoteUserStore>,
    /// Cleared on sign-out and when the process ends.
    pub session_store: Arc<dyn KeyValueStore>,
    /// Survives restarts.
    pub durable_store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub settings: Settings,
}

/// Output of one session refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSummary {
    pub upcoming: Vec<UpcomingEpisodeRecord>,
    pub dispatch: DispatchReport,
}

pub struct UserSession {
    user: UserId,
    aggregator: EpisodeAggregator,
    dispatcher: NotificationDispatcher,
    recommender: RecommendationSelector,
    subscription: SubscriptionManager,
    ledger: DedupLedger,
    locale: Locale,
}

impl UserSession {
    pub fn start(user: UserId, svc: &Services) -> Self {
        let cfg = &svc.settings.refresh;

        let episode_cache = TimedCache::new(
            svc.durable_store.clone(),
            svc.clock.clone(),
            aggregator::CACHE_NAMESPACE,
            Some(cfg.episode_cache_ttl()),
        );
        let aggregator = EpisodeAggregator::new(
            user.clone(),
            svc.metadata.clone(),
            episode_cache,
            cfg.locale.clone(),
        );

        let ledger = DedupLedger::new(svc.durable_store.clone(), svc.clock.clone(), &user);
        let dispatcher = NotificationDispatcher::new(
            user.clone(),
            svc.relay.clone(),
            ledger.clone(),
            svc.clock.clone(),
            cfg,
        );

        let rec_cache = TimedCache::session(
            svc.session_store.clone(),
            svc.clock.clone(),
            recommend::CACHE_NAMESPACE,
        );
        let recommender = RecommendationSelector::new(
            user.clone(),
            svc.metadata.clone(),
            svc.completer.clone(),
            rec_cache,
            svc.session_store.clone(),
            SelectorLimits::from_config(cfg),
        );

        let subscription = SubscriptionManager::new(
            user.clone(),
            svc.platform.clone(),
            svc.remote.clone(),
            svc.clock.clone(),
        )
        .with_worker_timeout(cfg.worker_ready_timeout());

        info!(user = %anon_id(&user), "session started");
        Self {
            user,
            aggregator,
            dispatcher,
            recommender,
            subscription,
            ledger,
            locale: Locale::from_tag(&cfg.ui_language),
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn subscription(&self) -> &SubscriptionManager {
        &self.subscription
    }

    pub fn aggregator(&self) -> &EpisodeAggregator {
        &self.aggregator
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Upcoming episodes (cached or fresh), then today's notifications.
    pub async fn refresh(&self, collection: &[MediaItem]) -> RefreshSummary {
        let upcoming = self.aggregator.upcoming(collection).await;
        let dispatch = self.dispatcher.check_and_notify(&upcoming).await;
        RefreshSummary { upcoming, dispatch }
    }

    pub async fn recommendations(
        &self,
        collection: &[MediaItem],
        force_refresh: bool,
    ) -> RecommendationSet {
        self.recommender.recommend(collection, force_refresh).await
    }

    /// Sign-out: drop every cache and ledger held for this user.
    pub fn teardown(self) {
        self.aggregator.invalidate();
        self.ledger.clear();
        self.recommender.clear();
        info!(user = %anon_id(&self.user), "session ended");
    }
}

/// What the identity provider currently says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityState {
    Loading,
    SignedOut,
    SignedIn(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    Started,
    /// Previous user torn down, new one started; caller should refetch.
    Switched,
    Ended,
}

/// Follows identity changes and owns the current [`UserSession`].
pub struct SessionManager {
    services: Services,
    current: Option<UserSession>,
}

impl SessionManager {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&UserSession> {
        self.current.as_ref()
    }

    pub fn on_identity(&mut self, identity: IdentityState) -> SessionChange {
        match identity {
            IdentityState::Loading => SessionChange::Unchanged,
            IdentityState::SignedOut => match self.current.take() {
                Some(s) => {
                    s.teardown();
                    SessionChange::Ended
                }
                None => SessionChange::Unchanged,
            },
            IdentityState::SignedIn(id) => {
                if self.current.as_ref().is_some_and(|s| s.user() == &id) {
                    return SessionChange::Unchanged;
                }
                let change = match self.current.take() {
                    Some(prev) => {
                        prev.teardown();
                        SessionChange::Switched
                    }
                    None => SessionChange::Started,
                };
                self.current = Some(UserSession::start(id, &self.services));
                change
            }
        }
    }
}
