use tauri::Manager;

pub mod backend;
mod commands;
pub mod job;

use backend::Endpoints;
use commands::{
    get_app_version, list_aspects, list_models, list_outputs, open_external, output_metadata,
    quit_app, retry_startup, shell_config, start_render, startup_status, stop_render, ShellState,
};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let mut builder = tauri::Builder::default();

    // Single instance: focus the existing window if already running
    #[cfg(desktop)]
    {
        builder = builder.plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            if let Some(window) = app.get_webview_window("main") {
                let _ = window.show();
                let _ = window.unminimize();
                let _ = window.set_focus();
            }
        }));
    }

    builder
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            // Logging
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let endpoints = Endpoints::from_env();
            log::info!(
                "[Startup] Drawer: {} | Viewer: {}",
                endpoints.drawer,
                endpoints.viewer
            );
            app.manage(ShellState::new(endpoints));

            // Bring the backend up before the panels are usable. Failures
            // surface as a dialog; the window still opens so the user can
            // start the backend manually and retry.
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(commands::run_startup(handle, true));

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            shell_config,
            startup_status,
            retry_startup,
            list_models,
            list_aspects,
            list_outputs,
            output_metadata,
            start_render,
            stop_render,
            open_external,
            get_app_version,
            quit_app,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
