//! Keepalive pinger for the recommendation sidecar
//!
//! The free-tier hosting behind the LM service idles out; a periodic ping
//! keeps it warm. Strictly fire-and-forget: the task never touches a request
//! path and its failures are logged, never escalated.

use tokio::time::MissedTickBehavior;

use crate::config::KeepaliveConfig;

pub fn spawn_keepalive(
    client: reqwest::Client,
    config: KeepaliveConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let url = format!("{}/health", config.base_url.trim_end_matches('/'));
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("keepalive ping ok");
                }
                Ok(response) => {
                    tracing::warn!(status = %response.status(), "keepalive ping returned non-2xx");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "keepalive ping failed");
                }
            }
        }
    })
}
