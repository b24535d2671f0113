// src/notify/mod.rs
pub mod dispatcher;
pub mod ntfy;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use dispatcher::{DispatchReport, NotificationDispatcher};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Min,
    Low,
    #[default]
    Default,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Min => "min",
            Priority::Low => "low",
            Priority::Default => "default",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Numeric form used by the relay's JSON API (1 = min, 5 = urgent).
    pub fn level(self) -> u8 {
        match self {
            Priority::Min => 1,
            Priority::Low => 2,
            Priority::Default => 3,
            Priority::High => 4,
            Priority::Urgent => 5,
        }
    }
}

/// One outbound push message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub icon_url: Option<String>,
    pub click_url: Option<String>,
}

/// Relay that delivers messages to subscribed devices. `Ok(())` means the relay
/// confirmed acceptance; anything else counts as not delivered.
#[async_trait::async_trait]
pub trait PushRelay: Send + Sync {
    async fn send(&self, topic: &str, msg: &PushMessage) -> Result<()>;
    fn name(&self) -> &'static str;
}
