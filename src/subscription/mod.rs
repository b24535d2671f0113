//! # Push subscription lifecycle
//!
//! Enable: permission → worker → platform subscribe → remote record → subscribed.
//! Disable: platform unsubscribe → remote delete → unsubscribed.
//!
//! Whether the device is subscribed is never stored locally; [`SubscriptionManager::is_subscribed`]
//! asks the platform every time. The watch channel only reports progress of an
//! operation in flight. Any enable failure publishes `Error(reason)` and then
//! `Unsubscribed`, leaving nothing half-done behind, so the caller can retry from scratch.

pub mod error;
pub mod platform;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::model::UserId;
use crate::telemetry::anon_id;

pub use error::{FailureReason, Guidance, Locale, SubscriptionError};
pub use platform::{
    Permission, PushPlatform, PushSubscription, RemoteUserStore, SubscriptionKeys, WorkerHandle,
};

pub const REMOTE_COLLECTION: &str = "push_subscriptions";
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    RequestingPermission,
    RegisteringWorker,
    Subscribing,
    PersistingRemote,
    Subscribed,
    Unsubscribing,
    Error(FailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    Subscribed,
    /// Preconditions not met; nothing was attempted.
    Guidance(Guidance),
}

pub struct SubscriptionManager {
    user: UserId,
    platform: Arc<dyn PushPlatform>,
    remote: Arc<dyn RemoteUserStore>,
    clock: Arc<dyn Clock>,
    worker_timeout: Duration,
    state: watch::Sender<SubscriptionState>,
    /// One enable/disable at a time.
    busy: Mutex<()>,
}

impl SubscriptionManager {
    pub fn new(
        user: UserId,
        platform: Arc<dyn PushPlatform>,
        remote: Arc<dyn RemoteUserStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state, _) = watch::channel(SubscriptionState::Unsubscribed);
        Self {
            user,
            platform,
            remote,
            clock,
            worker_timeout: DEFAULT_WORKER_TIMEOUT,
            state,
            busy: Mutex::new(()),
        }
    }

    pub fn with_worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    /// Latest published state.
    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<SubscriptionState> {
        self.state.subscribe()
    }

    /// Capability and eligibility gate. `None` means the lifecycle may run.
    pub fn guidance(&self) -> Option<Guidance> {
        if !self.platform.push_supported() {
            return Some(Guidance::PushUnsupported);
        }
        if !(self.platform.is_mobile() || self.platform.is_standalone()) {
            return Some(Guidance::InstallRequired);
        }
        None
    }

    /// Asks the platform; nothing cached.
    pub async fn is_subscribed(&self) -> bool {
        self.platform.current_subscription().await.is_some()
    }

    /// Re-derive the published state from the platform, e.g. on app start.
    pub async fn sync_state(&self) -> SubscriptionState {
        let derived = if self.is_subscribed().await {
            SubscriptionState::Subscribed
        } else {
            SubscriptionState::Unsubscribed
        };
        self.publish(derived);
        derived
    }

    pub async fn enable(&self) -> Result<EnableOutcome, SubscriptionError> {
        if let Some(g) = self.guidance() {
            debug!(guidance = ?g, "push enable short-circuited");
            return Ok(EnableOutcome::Guidance(g));
        }

        let _busy = self.busy.lock().await;
        match self.run_enable().await {
            Ok(()) => {
                self.publish(SubscriptionState::Subscribed);
                info!(user = %anon_id(&self.user), "push subscription enabled");
                Ok(EnableOutcome::Subscribed)
            }
            Err(e) => {
                warn!(user = %anon_id(&self.user), reason = %e.reason, detail = %e.detail, "push enable failed");
                self.publish(SubscriptionState::Error(e.reason));
                self.publish(SubscriptionState::Unsubscribed);
                Err(e)
            }
        }
    }

    async fn run_enable(&self) -> Result<(), SubscriptionError> {
        self.publish(SubscriptionState::RequestingPermission);
        match self.platform.request_permission().await {
            Permission::Granted => {}
            other => {
                return Err(SubscriptionError::new(
                    FailureReason::PermissionDenied,
                    format!("permission is {other:?}"),
                ))
            }
        }

        self.publish(SubscriptionState::RegisteringWorker);
        let worker = self.obtain_worker().await?;
        if !worker.active {
            return Err(SubscriptionError::new(
                FailureReason::WorkerInactive,
                format!("worker at {} is not active", worker.scope),
            ));
        }
        if !worker.push_manager {
            return Err(SubscriptionError::new(
                FailureReason::PushManagerUnavailable,
                "registration has no push manager",
            ));
        }

        self.publish(SubscriptionState::Subscribing);
        let sub = match self.platform.current_subscription().await {
            Some(existing) => existing,
            None => self.platform.subscribe(&worker).await.map_err(|e| {
                SubscriptionError::new(FailureReason::SubscribeRejected, format!("{e:#}"))
            })?,
        };

        self.publish(SubscriptionState::PersistingRemote);
        if let Err(e) = self
            .remote
            .set_user_doc(REMOTE_COLLECTION, &self.user, self.remote_record(&sub))
            .await
        {
            // Do not leave a device subscription the backend does not know about.
            if let Err(ue) = self.platform.unsubscribe(&sub).await {
                warn!(error = ?ue, "rollback unsubscribe failed");
            }
            return Err(SubscriptionError::new(
                FailureReason::PersistFailed,
                format!("{e:#}"),
            ));
        }
        Ok(())
    }

    /// Prefer an existing worker; otherwise wait for one, bounded by the timeout.
    async fn obtain_worker(&self) -> Result<WorkerHandle, SubscriptionError> {
        if let Some(w) = self.platform.existing_worker().await {
            return Ok(w);
        }
        tokio::time::timeout(self.worker_timeout, self.platform.worker_ready())
            .await
            .map_err(|_| {
                SubscriptionError::new(
                    FailureReason::WorkerRegistrationTimeout,
                    format!("no worker ready after {:?}", self.worker_timeout),
                )
            })
    }

    fn remote_record(&self, sub: &PushSubscription) -> serde_json::Value {
        let now = self.clock.now().to_rfc3339();
        json!({
            "endpoint": sub.endpoint,
            "keys": {
                "p256dh": sub.keys.p256dh,
                "auth": sub.keys.auth,
            },
            "user_id": self.user,
            "user_agent": self.platform.user_agent(),
            "created_at": now,
            "updated_at": now,
        })
    }

    /// Local unsubscribe must succeed; a failed remote delete is only logged,
    /// the next enable overwrites the orphaned record.
    pub async fn disable(&self) -> Result<(), SubscriptionError> {
        let _busy = self.busy.lock().await;
        self.publish(SubscriptionState::Unsubscribing);

        if let Some(sub) = self.platform.current_subscription().await {
            if let Err(e) = self.platform.unsubscribe(&sub).await {
                let err = SubscriptionError::new(FailureReason::UnsubscribeRejected, format!("{e:#}"));
                warn!(user = %anon_id(&self.user), detail = %err.detail, "push disable failed");
                self.publish(SubscriptionState::Error(err.reason));
                let derived = if self.is_subscribed().await {
                    SubscriptionState::Subscribed
                } else {
                    SubscriptionState::Unsubscribed
                };
                self.publish(derived);
                return Err(err);
            }
        }

        if let Err(e) = self.remote.delete_user_doc(REMOTE_COLLECTION, &self.user).await {
            warn!(error = ?e, user = %anon_id(&self.user), "remote subscription delete failed, record left behind");
        }

        self.publish(SubscriptionState::Unsubscribed);
        info!(user = %anon_id(&self.user), "push subscription disabled");
        Ok(())
    }

    fn publish(&self, s: SubscriptionState) {
        debug!(state = ?s, "subscription state");
        self.state.send_replace(s);
    }
}
