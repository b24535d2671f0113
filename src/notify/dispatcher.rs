//! # Notification dispatcher
//! Sends one push per episode airing today that has not been notified yet.
//!
//! Sends are strictly sequential with a fixed pause in between. The ledger is
//! updated only after the relay confirms a send, so a failed send stays
//! eligible for the next check of the same day.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, info, warn};

use super::{Priority, PushMessage, PushRelay};
use crate::clock::{local_date, Clock};
use crate::config::refresh::poster_url;
use crate::config::RefreshConfig;
use crate::ledger::DedupLedger;
use crate::model::{UpcomingEpisodeRecord, UserId};
use crate::telemetry::{anon_id, ensure_metrics_described};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    /// Airing today but already in the ledger.
    pub skipped: usize,
}

pub struct NotificationDispatcher {
    user: UserId,
    relay: Arc<dyn PushRelay>,
    ledger: DedupLedger,
    clock: Arc<dyn Clock>,
    topic: String,
    send_delay: Duration,
    image_base_url: String,
    click_url: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(
        user: UserId,
        relay: Arc<dyn PushRelay>,
        ledger: DedupLedger,
        clock: Arc<dyn Clock>,
        cfg: &RefreshConfig,
    ) -> Self {
        let topic = topic_for(&cfg.topic_prefix, &user);
        Self {
            user,
            relay,
            ledger,
            clock,
            topic,
            send_delay: cfg.send_delay(),
            image_base_url: cfg.image_base_url.clone(),
            click_url: cfg.app_url.clone(),
        }
    }

    /// Relay topic this user's device subscribes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn check_and_notify(&self, upcoming: &[UpcomingEpisodeRecord]) -> DispatchReport {
        ensure_metrics_described();

        let today = local_date(self.clock.as_ref());
        let ledger = self.ledger.load();

        let airing_today: Vec<&UpcomingEpisodeRecord> = upcoming
            .iter()
            .filter(|r| r.episode.air_date == today)
            .collect();
        let pending: Vec<&UpcomingEpisodeRecord> = airing_today
            .iter()
            .copied()
            .filter(|r| !ledger.contains(&r.key()))
            .collect();

        let mut report = DispatchReport {
            skipped: airing_today.len() - pending.len(),
            ..Default::default()
        };

        for (i, rec) in pending.iter().enumerate() {
            if i > 0 && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
            let msg = self.message_for(rec);
            match self.relay.send(&self.topic, &msg).await {
                Ok(()) => {
                    self.ledger.record(rec.key());
                    counter!("notifications_sent_total").increment(1);
                    report.sent += 1;
                    debug!(series_id = rec.series_id, "episode notification sent");
                }
                Err(e) => {
                    counter!("notifications_failed_total").increment(1);
                    report.failed += 1;
                    warn!(error = ?e, series_id = rec.series_id, relay = self.relay.name(), "episode notification failed");
                }
            }
        }

        if report.sent + report.failed > 0 {
            info!(
                user = %anon_id(&self.user),
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped,
                "notification check done"
            );
        }
        report
    }

    pub fn message_for(&self, rec: &UpcomingEpisodeRecord) -> PushMessage {
        let ep = &rec.episode;
        let mut body = format!("S{:02}E{:02}", ep.season_number, ep.episode_number);
        if !ep.name.trim().is_empty() {
            body.push_str(" · ");
            body.push_str(ep.name.trim());
        }
        PushMessage {
            title: rec.display_title().to_string(),
            body,
            priority: Priority::Default,
            tags: vec!["tv".to_string()],
            icon_url: rec
                .poster_path
                .as_deref()
                .map(|p| poster_url(&self.image_base_url, p)),
            click_url: self.click_url.clone(),
        }
    }
}

/// `<prefix>-<short hash of user id>`: stable per user, does not expose the id.
pub fn topic_for(prefix: &str, user: &str) -> String {
    format!("{}-{}", prefix, anon_id(user))
}
