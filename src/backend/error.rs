//! Startup error taxonomy.
//!
//! Fatal startup failures are presented to the user as a dismissable
//! dialog; the shell window still opens afterward so the backend can be
//! started manually and retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    /// The user pointed the shell at a custom backend URL that does not
    /// answer. Auto-launch is never attempted for custom URLs.
    #[error("Configured URLs are not reachable.\nDrawer: {drawer_health}\nViewer: {viewer_health}")]
    Misconfigured {
        drawer_health: String,
        viewer_health: String,
    },

    /// No candidate directory contained the backend project files.
    #[error(
        "Cannot locate WindDrawer backend files.\n\
         Set WINDDRAWER_PROJECT_ROOT to your WindDrawer repository path, \
         or start the backend manually."
    )]
    RootNotFound,

    /// The bootstrap process failed to start or exited nonzero.
    #[error("Failed to start WindDrawer backend.\n{0}")]
    Launch(String),

    /// The bootstrap ran but the services never became reachable.
    #[error("Backend startup timed out.\nDrawer: {drawer_health}\nViewer: {viewer_health}")]
    Timeout {
        drawer_health: String,
        viewer_health: String,
    },
}
