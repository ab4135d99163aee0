//! Tauri Commands
//!
//! Exposes backend startup and the render-job lifecycle to the shell
//! frontend. All fallible commands return `Result<_, String>`; job UI
//! updates are pushed to the window as `job-effect` events.

use std::sync::Arc;

use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tokio::sync::Mutex;

use crate::backend::locate::RootSearch;
use crate::backend::{BackendManager, Endpoints};
use crate::job::client::{AspectOption, JobStream, OutputItem};
use crate::job::{DrawerClient, JobSession, RenderRequest, UiEffect, ViewerClient};

/// Event channel carrying `UiEffect` values to the window.
const JOB_EFFECT_EVENT: &str = "job-effect";
/// Event channel carrying `StartupStatus` updates to the window.
const STARTUP_STATUS_EVENT: &str = "startup-status";
/// Give up on a job stream after this many errors in a row.
const MAX_STREAM_ERRORS: u32 = 5;

/// Shared shell state managed by Tauri.
pub struct ShellState {
    pub endpoints: Endpoints,
    pub drawer: DrawerClient,
    pub viewer: ViewerClient,
    pub session: Arc<Mutex<JobSession>>,
    pub startup: Arc<Mutex<StartupStatus>>,
}

impl ShellState {
    pub fn new(endpoints: Endpoints) -> Self {
        let drawer = DrawerClient::new(&endpoints.drawer);
        let viewer = ViewerClient::new(&endpoints.viewer);
        Self {
            endpoints,
            drawer,
            viewer,
            session: Arc::new(Mutex::new(JobSession::new())),
            startup: Arc::new(Mutex::new(StartupStatus::pending())),
        }
    }
}

/// Startup progress reported to the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct StartupStatus {
    pub phase: String,
    pub message: Option<String>,
}

impl StartupStatus {
    pub fn pending() -> Self {
        Self {
            phase: "pending".to_string(),
            message: None,
        }
    }

    fn ready() -> Self {
        Self {
            phase: "ready".to_string(),
            message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            phase: "failed".to_string(),
            message: Some(message),
        }
    }
}

/// Static configuration handed to the shell frontend.
#[derive(Debug, Clone, Serialize)]
pub struct ShellConfig {
    pub drawer_url: String,
    pub viewer_url: String,
}

fn build_search(app: &AppHandle) -> RootSearch {
    let packaged = !cfg!(debug_assertions);
    let template_root = app
        .path()
        .resource_dir()
        .ok()
        .map(|dir| dir.join("runtime-template"));
    let runtime_dir = app
        .path()
        .app_data_dir()
        .ok()
        .or_else(|| dirs::data_dir().map(|dir| dir.join("com.winddrawer.desktop")))
        .map(|dir| dir.join("runtime"));
    let version = app.package_info().version.to_string();
    RootSearch::from_environment(packaged, template_root, runtime_dir, &version)
}

async fn set_startup_status(app: &AppHandle, status: StartupStatus) {
    let state: State<'_, ShellState> = app.state();
    *state.startup.lock().await = status.clone();
    let _ = app.emit(STARTUP_STATUS_EVENT, &status);
}

/// Run `ensure_ready` and report the outcome. Startup failures never tear
/// the shell down: the window stays usable and `retry_startup` can rerun
/// this after the user starts the backend manually.
pub async fn run_startup(app: AppHandle, announce_failure: bool) {
    set_startup_status(&app, StartupStatus::pending()).await;

    let endpoints = app.state::<ShellState>().endpoints.clone();
    let manager = BackendManager::new(endpoints, build_search(&app));

    match manager.ensure_ready().await {
        Ok(()) => {
            set_startup_status(&app, StartupStatus::ready()).await;
        }
        Err(e) => {
            log::error!("[Startup] {}", e);
            set_startup_status(&app, StartupStatus::failed(e.to_string())).await;
            if announce_failure {
                app.dialog()
                    .message(format!(
                        "{}\n\nYou can start the backend manually, then use Reload All.",
                        e
                    ))
                    .title("WindDrawer Backend Startup Failed")
                    .kind(MessageDialogKind::Error)
                    .show(|_| {});
            }
        }
    }
}

#[tauri::command]
pub async fn shell_config(state: State<'_, ShellState>) -> Result<ShellConfig, String> {
    Ok(ShellConfig {
        drawer_url: state.endpoints.drawer.clone(),
        viewer_url: state.endpoints.viewer.clone(),
    })
}

#[tauri::command]
pub async fn startup_status(state: State<'_, ShellState>) -> Result<StartupStatus, String> {
    Ok(state.startup.lock().await.clone())
}

/// Re-run the startup orchestration on user request (degraded mode).
#[tauri::command]
pub async fn retry_startup(app: AppHandle) -> Result<(), String> {
    tauri::async_runtime::spawn(run_startup(app.clone(), true));
    Ok(())
}

#[tauri::command]
pub async fn list_models(state: State<'_, ShellState>) -> Result<Vec<String>, String> {
    state.drawer.list_models().await
}

#[tauri::command]
pub async fn list_aspects(state: State<'_, ShellState>) -> Result<Vec<AspectOption>, String> {
    state.drawer.list_aspects().await
}

#[tauri::command]
pub async fn list_outputs(state: State<'_, ShellState>) -> Result<Vec<OutputItem>, String> {
    state.viewer.list_outputs().await
}

#[tauri::command]
pub async fn output_metadata(
    state: State<'_, ShellState>,
    filename: String,
) -> Result<serde_json::Value, String> {
    state.viewer.metadata(&filename).await
}

/// Submit a render job and start consuming its event stream.
///
/// The session lock is held across submission so two racing submits
/// cannot both pass the active check.
#[tauri::command]
pub async fn start_render(
    app: AppHandle,
    state: State<'_, ShellState>,
    request: RenderRequest,
) -> Result<String, String> {
    let mut session = state.session.lock().await;
    if session.is_active() {
        return Err("a render job is already running".to_string());
    }

    let job_id = state.drawer.submit(&request).await?;
    let effects = session.begin(&job_id)?;
    drop(session);

    for effect in &effects {
        let _ = app.emit(JOB_EFFECT_EVENT, effect);
    }

    let drawer = state.drawer.clone();
    let session = Arc::clone(&state.session);
    let stream_app = app.clone();
    let stream_job_id = job_id.clone();
    tauri::async_runtime::spawn(async move {
        consume_job_stream(stream_app, drawer, session, stream_job_id).await;
    });

    Ok(job_id)
}

/// Drive one job's event stream to completion, applying each event to the
/// session and pushing the resulting effects to the window.
async fn consume_job_stream(
    app: AppHandle,
    drawer: DrawerClient,
    session: Arc<Mutex<JobSession>>,
    job_id: String,
) {
    let mut stream = match drawer.subscribe(&job_id) {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("[Job] {}", e);
            let effects = session.lock().await.abort();
            for effect in &effects {
                let _ = app.emit(JOB_EFFECT_EVENT, effect);
            }
            return;
        }
    };

    drive_job_stream(&mut stream, &session, &job_id, |effect| {
        let _ = app.emit(JOB_EFFECT_EVENT, effect);
    })
    .await;
    log::info!("[Job] stream closed for {}", job_id);
}

/// Read an open job stream until a terminal event or the stream dies.
/// If the stream ends while the session still holds this job — the
/// backend crashed or the connection dropped mid-job — the session is
/// aborted so submission is re-enabled instead of staying busy forever.
async fn drive_job_stream<F: FnMut(&UiEffect)>(
    stream: &mut JobStream,
    session: &Mutex<JobSession>,
    job_id: &str,
    mut emit: F,
) {
    let mut consecutive_errors = 0u32;
    while let Some(result) = stream.next_event().await {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                // Transient stream/decode problems: log and keep reading.
                // The stream stays authoritative for state transitions.
                log::warn!("[Job] stream error: {}", e);
                consecutive_errors += 1;
                if consecutive_errors >= MAX_STREAM_ERRORS {
                    log::error!("[Job] giving up after {} stream errors", consecutive_errors);
                    break;
                }
                continue;
            }
        };
        consecutive_errors = 0;

        let terminal = event.is_terminal();
        let effects = session.lock().await.apply(&event);
        for effect in &effects {
            emit(effect);
        }
        if terminal {
            break;
        }
    }

    stream.close();

    let mut session = session.lock().await;
    if session.job_id() == Some(job_id) {
        for effect in &session.abort() {
            emit(effect);
        }
    }
}

/// Ask the backend to stop the active job. A stop with no active job is a
/// no-op and produces no network call. Delivery failures are reported but
/// do not change job state.
#[tauri::command]
pub async fn stop_render(state: State<'_, ShellState>) -> Result<(), String> {
    request_stop(&state.drawer, &state.session).await
}

/// Stop guard shared by `stop_render`: only an active job produces a
/// network call.
async fn request_stop(
    drawer: &DrawerClient,
    session: &Mutex<JobSession>,
) -> Result<(), String> {
    let job_id = {
        let session = session.lock().await;
        match session.job_id() {
            Some(id) => id.to_string(),
            None => return Ok(()),
        }
    };
    drawer.stop(&job_id).await
}

/// Open a URL in the system browser.
#[tauri::command]
pub async fn open_external(url: String) -> Result<(), String> {
    #[cfg(target_os = "linux")]
    let result = std::process::Command::new("xdg-open").arg(&url).spawn();
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(&url).spawn();
    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd")
        .args(["/c", "start", &url])
        .spawn();

    result.map(|_| ()).map_err(|e| e.to_string())
}

/// Get app version.
#[tauri::command]
pub fn get_app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

/// Quit the application.
#[tauri::command]
pub async fn quit_app(app: AppHandle) -> Result<(), String> {
    app.exit(0);
    Ok(())
}
