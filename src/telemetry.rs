//! Logging setup, metric descriptions and log-safe identifiers.

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. Filter comes from `RUST_LOG`, falling back to
/// `cinetrack=info,warn`. `CINETRACK_LOG_JSON=1` switches to JSON lines.
/// Calling twice is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cinetrack=info,warn"));
    let json = std::env::var("CINETRACK_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing already initialized");
    }
}

/// One-time metrics registration.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "episodes_fetch_errors_total",
            "Per-series upcoming-episode fetches that failed and were skipped."
        );
        describe_counter!(
            "episodes_cache_hits_total",
            "Aggregations served from the 24h cache."
        );
        describe_counter!(
            "recommendations_degraded_total",
            "Recommendation runs that fell back to trending after an AI failure."
        );
        describe_counter!("notifications_sent_total", "Push messages confirmed by the relay.");
        describe_counter!("notifications_failed_total", "Push sends the relay rejected.");
        describe_gauge!(
            "aggregation_last_run_ts",
            "Unix ts when upcoming episodes were last fetched from the network."
        );
    });
}

/// Short SHA-256 prefix of a user id, so logs never carry the raw id.
pub fn anon_id(user: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
