//! Backend Locator
//!
//! Finds a directory containing the WindDrawer backend project files.
//! Candidate generation is side-effect free and ordered by precedence;
//! validation is a single marker-file check shared by every candidate.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::config::PROJECT_ROOT_ENV;

/// Version marker written into the synced runtime copy.
const RUNTIME_VERSION_MARKER: &str = ".runtime-version";

/// Marker files that must all exist directly under a valid backend root.
pub fn required_markers() -> [&'static str; 3] {
    if cfg!(target_os = "windows") {
        ["start.ps1", "docker-compose.yml", "Dockerfile"]
    } else {
        ["start.sh", "docker-compose.yml", "Dockerfile"]
    }
}

/// True iff every required marker file is a direct child of `root`.
pub fn has_project_files(root: &Path) -> bool {
    required_markers().iter().all(|name| root.join(name).is_file())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Deduplicate candidate paths by absolute form, preserving first-seen
/// order. An explicit override that happens to equal the working directory
/// is only checked once.
pub fn dedupe_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for item in paths {
        let normalized = absolute(item);
        if seen.insert(normalized.clone()) {
            result.push(normalized);
        }
    }
    result
}

/// Return the first candidate that passes the marker check, in input order.
pub fn find_root(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|root| has_project_files(root)).cloned()
}

/// Where to look for a backend root, in precedence order.
#[derive(Debug, Clone, Default)]
pub struct RootSearch {
    /// Explicit override from `WINDDRAWER_PROJECT_ROOT`.
    pub env_root: Option<PathBuf>,
    /// Current working directory.
    pub cwd: Option<PathBuf>,
    /// Repository root relative to this crate (development builds).
    pub dev_root: Option<PathBuf>,
    /// Whether the app runs from a packaged install.
    pub packaged: bool,
    /// Bundled runtime template shipped with the packaged app.
    pub template_root: Option<PathBuf>,
    /// Per-user writable directory for the synced template copy.
    pub runtime_dir: Option<PathBuf>,
    /// App version, used to refresh stale template copies.
    pub app_version: String,
}

impl RootSearch {
    /// Build the search from the process environment. `template_root` and
    /// `runtime_dir` come from the caller since they depend on the
    /// installed app layout.
    pub fn from_environment(
        packaged: bool,
        template_root: Option<PathBuf>,
        runtime_dir: Option<PathBuf>,
        app_version: &str,
    ) -> Self {
        Self {
            env_root: env::var(PROJECT_ROOT_ENV).ok().map(PathBuf::from),
            cwd: env::current_dir().ok(),
            dev_root: Some(PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
            packaged,
            template_root,
            runtime_dir,
            app_version: app_version.to_string(),
        }
    }
}

/// Resolve the backend root for this search, or `None` if nothing valid
/// was found. Precedence: explicit override, then (dev) working directory
/// and repository root, then (packaged) working directory and the synced
/// runtime template.
pub fn resolve_backend_root(search: &RootSearch) -> Option<PathBuf> {
    if let Some(env_root) = &search.env_root {
        let env_root = absolute(env_root);
        if has_project_files(&env_root) {
            return Some(env_root);
        }
    }

    if !search.packaged {
        let mut candidates = Vec::new();
        candidates.extend(search.env_root.clone());
        candidates.extend(search.cwd.clone());
        candidates.extend(search.dev_root.clone());
        return find_root(&dedupe_paths(&candidates));
    }

    if let Some(cwd) = &search.cwd {
        let cwd = absolute(cwd);
        if has_project_files(&cwd) {
            return Some(cwd);
        }
    }

    let template = search.template_root.as_deref()?;
    let runtime = search.runtime_dir.as_deref()?;
    sync_runtime_template(template, runtime, &search.app_version)
}

/// Sync the bundled runtime template into a per-user writable location.
///
/// The copy is refreshed whenever it is missing project files or its
/// `.runtime-version` marker does not match the current app version, so
/// stale copies are replaced on upgrade.
pub fn sync_runtime_template(
    template_root: &Path,
    runtime_root: &Path,
    version: &str,
) -> Option<PathBuf> {
    if !has_project_files(template_root) {
        return None;
    }

    let marker_path = runtime_root.join(RUNTIME_VERSION_MARKER);
    let current_version = fs::read_to_string(&marker_path)
        .map(|v| v.trim().to_string())
        .unwrap_or_default();

    if !has_project_files(runtime_root) || current_version != version {
        log::info!(
            "[Locate] Syncing runtime template to {} (version {})",
            runtime_root.display(),
            version
        );
        if let Err(e) = copy_dir_all(template_root, runtime_root) {
            log::error!("[Locate] Failed to sync runtime template: {}", e);
            return None;
        }
        if let Err(e) = fs::write(&marker_path, format!("{}\n", version)) {
            log::error!("[Locate] Failed to write version marker: {}", e);
            return None;
        }
    }

    Some(runtime_root.to_path_buf())
}

fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
