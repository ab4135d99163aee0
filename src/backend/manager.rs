//! Startup Orchestrator
//!
//! Composes the prober, locator, and launcher into a single `ensure_ready`
//! call that runs before the shell UI is considered usable.

use std::time::Duration;

use super::config::{Endpoints, PROBE_TIMEOUT, STARTUP_DEADLINE};
use super::error::StartupError;
use super::health::{probe, wait_until_ready};
use super::launch::launch_backend;
use super::locate::{resolve_backend_root, RootSearch};

/// Coordinates backend startup for the two shell endpoints.
pub struct BackendManager {
    endpoints: Endpoints,
    search: RootSearch,
    probe_timeout: Duration,
    deadline: Duration,
}

impl BackendManager {
    pub fn new(endpoints: Endpoints, search: RootSearch) -> Self {
        Self {
            endpoints,
            search,
            probe_timeout: PROBE_TIMEOUT,
            deadline: STARTUP_DEADLINE,
        }
    }

    /// Override the startup deadline (tests use short ones).
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Make sure both backend services answer on their health URLs,
    /// launching the backend bootstrap if necessary.
    ///
    /// Already-running backends (started externally) are detected by the
    /// initial probe and skip the locate/launch steps entirely. Custom
    /// endpoint URLs are never auto-launched.
    pub async fn ensure_ready(&self) -> Result<(), StartupError> {
        let drawer_health = self.endpoints.drawer_health();
        let viewer_health = self.endpoints.viewer_health();

        let (drawer_ready, viewer_ready) = tokio::join!(
            probe(&drawer_health, self.probe_timeout),
            probe(&viewer_health, self.probe_timeout)
        );
        if drawer_ready && viewer_ready {
            log::info!("[Backend] Already reachable, skipping launch");
            return Ok(());
        }

        if !self.endpoints.is_default() {
            return Err(StartupError::Misconfigured {
                drawer_health,
                viewer_health,
            });
        }

        let root = resolve_backend_root(&self.search).ok_or(StartupError::RootNotFound)?;
        log::info!("[Backend] Using backend root {}", root.display());

        launch_backend(&root).await.map_err(StartupError::Launch)?;

        let (drawer_ok, viewer_ok) = tokio::join!(
            wait_until_ready(&drawer_health, self.probe_timeout, self.deadline),
            wait_until_ready(&viewer_health, self.probe_timeout, self.deadline)
        );
        if !drawer_ok || !viewer_ok {
            return Err(StartupError::Timeout {
                drawer_health,
                viewer_health,
            });
        }

        log::info!("[Backend] Ready");
        Ok(())
    }
}
