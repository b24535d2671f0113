//! Platform seams used by the subscription lifecycle: the push-capable runtime
//! (permission prompt, background worker, push manager) and the remote
//! per-user document store.

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Prompt dismissed without a choice.
    Default,
}

/// Handle to a registered background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    pub scope: String,
    /// The worker has finished installing and can receive pushes.
    pub active: bool,
    /// The runtime exposes a push manager on this registration.
    pub push_manager: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Platform push subscription for this device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[async_trait::async_trait]
pub trait PushPlatform: Send + Sync {
    /// Runtime supports workers, push and notifications at all.
    fn push_supported(&self) -> bool;
    fn is_mobile(&self) -> bool;
    /// Running as an installed standalone app rather than a browser tab.
    fn is_standalone(&self) -> bool;
    fn user_agent(&self) -> String;

    async fn request_permission(&self) -> Permission;
    /// Already-registered worker, if any.
    async fn existing_worker(&self) -> Option<WorkerHandle>;
    /// Resolves once a worker is ready. May never resolve; callers bound it.
    async fn worker_ready(&self) -> WorkerHandle;
    async fn subscribe(&self, worker: &WorkerHandle) -> Result<PushSubscription>;
    /// Authoritative current subscription, queried fresh every time.
    async fn current_subscription(&self) -> Option<PushSubscription>;
    async fn unsubscribe(&self, sub: &PushSubscription) -> Result<()>;
}

/// Durable per-user documents (one document per user per collection).
#[async_trait::async_trait]
pub trait RemoteUserStore: Send + Sync {
    async fn set_user_doc(
        &self,
        collection: &str,
        user_id: &str,
        fields: serde_json::Value,
    ) -> Result<()>;
    async fn delete_user_doc(&self, collection: &str, user_id: &str) -> Result<()>;
}
