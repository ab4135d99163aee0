//! Backend Configuration
//!
//! Endpoint defaults, environment overrides, and URL normalization.

use std::env;
use std::time::Duration;

/// Default base URL of the drawer (render) service.
pub const DEFAULT_DRAWER_URL: &str = "http://127.0.0.1:17865/";
/// Default base URL of the viewer (gallery) service.
pub const DEFAULT_VIEWER_URL: &str = "http://127.0.0.1:17866/";

/// Environment override for the drawer base URL.
pub const DRAWER_URL_ENV: &str = "WINDDRAWER_DRAWER_URL";
/// Environment override for the viewer base URL.
pub const VIEWER_URL_ENV: &str = "WINDDRAWER_VIEWER_URL";
/// Environment override for the backend project root.
pub const PROJECT_ROOT_ENV: &str = "WINDDRAWER_PROJECT_ROOT";

/// Per-request probe timeout. Distinct from the overall startup deadline:
/// a hung probe must not stall the retry loop.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Interval between readiness probes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Overall deadline for backend startup, per endpoint.
pub const STARTUP_DEADLINE: Duration = Duration::from_secs(180);

/// Normalize a base URL: empty/whitespace input falls back to the default,
/// anything else gets exactly one trailing slash. Idempotent.
pub fn normalize_base_url(value: Option<&str>, fallback: &str) -> String {
    let raw = value.unwrap_or("").trim();
    if raw.is_empty() {
        return fallback.to_string();
    }
    if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    }
}

/// Derive a health-check URL from a base URL and a fixed path suffix.
pub fn health_url(base: &str, suffix: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), suffix)
}

/// The two backend endpoints the shell talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub drawer: String,
    pub viewer: String,
}

impl Endpoints {
    /// Built-in defaults.
    pub fn default_urls() -> Self {
        Self {
            drawer: DEFAULT_DRAWER_URL.to_string(),
            viewer: DEFAULT_VIEWER_URL.to_string(),
        }
    }

    /// Read endpoints from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let drawer = env::var(DRAWER_URL_ENV).ok();
        let viewer = env::var(VIEWER_URL_ENV).ok();
        Self {
            drawer: normalize_base_url(drawer.as_deref(), DEFAULT_DRAWER_URL),
            viewer: normalize_base_url(viewer.as_deref(), DEFAULT_VIEWER_URL),
        }
    }

    /// True iff both endpoints are at their built-in defaults. Auto-launch
    /// is only attempted for default endpoints; a custom URL means the user
    /// manages the backend themselves.
    pub fn is_default(&self) -> bool {
        self.drawer == DEFAULT_DRAWER_URL && self.viewer == DEFAULT_VIEWER_URL
    }

    /// Health-check URL for the drawer service.
    pub fn drawer_health(&self) -> String {
        health_url(&self.drawer, "/api/models")
    }

    /// Health-check URL for the viewer service.
    pub fn viewer_health(&self) -> String {
        health_url(&self.viewer, "/api/images")
    }
}
