// src/lib.rs
// Public library surface for the client shell and integration tests.

pub mod clock;
pub mod config;
pub mod model;
pub mod store;
pub mod telemetry;

// Storage primitives: time-windowed cache + day-scoped dedup ledger
pub mod cache;
pub mod ledger;

// External collaborators (metadata source, text generation)
pub mod providers;

// Pipeline components
pub mod aggregator;
pub mod notify;
pub mod recommend;
pub mod subscription;

pub mod session;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::EpisodeAggregator;
pub use crate::notify::{DispatchReport, NotificationDispatcher, PushMessage, PushRelay};
pub use crate::recommend::{RecommendationSelector, RecommendationSet, Strategy};
pub use crate::session::{IdentityState, Services, SessionChange, SessionManager, UserSession};
pub use crate::subscription::{
    EnableOutcome, SubscriptionError, SubscriptionManager, SubscriptionState,
};
