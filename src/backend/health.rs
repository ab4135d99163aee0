//! Readiness Prober
//!
//! Best-effort HTTP probes against the backend health URLs, plus the
//! bounded 1-second poll loop used during startup.

use std::time::Duration;

use tokio::time::Instant;

use super::config::POLL_INTERVAL;

/// Probe a URL once with a per-request timeout.
///
/// Any status in [200, 500) counts as ready: the question is "is something
/// listening and speaking HTTP here", not "did the request succeed". A 404
/// from a half-configured reverse proxy is still a live process; a 5xx or
/// a connection/timeout failure is not. Never returns an error.
pub async fn probe(url: &str, timeout: Duration) -> bool {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(_) => return false,
    };

    match client.get(url).send().await {
        Ok(response) => {
            let code = response.status().as_u16();
            (200..500).contains(&code)
        }
        Err(_) => false,
    }
}

/// Probe `url` at a fixed 1-second interval until it becomes ready or
/// `max_wait` elapses. Returns the last probe result.
pub async fn wait_until_ready(url: &str, probe_timeout: Duration, max_wait: Duration) -> bool {
    let deadline = Instant::now() + max_wait;
    while Instant::now() < deadline {
        if probe(url, probe_timeout).await {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    false
}
