//! Backend Launcher
//!
//! Runs the backend bootstrap script from a located project root. Launch
//! strategies are tried in order; a strategy that fails to spawn falls
//! through to the next one with its error recorded, while a started
//! interpreter that exits nonzero is a final failure.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// One way of invoking the bootstrap script.
#[derive(Debug, Clone)]
pub struct LaunchStrategy {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchStrategy {
    fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }
}

/// Platform-specific strategies, in fallback order.
#[cfg(target_os = "windows")]
pub fn launch_strategies(root: &Path) -> Vec<LaunchStrategy> {
    let script = root.join("start.ps1").to_string_lossy().to_string();
    let args = |s: &str| {
        vec![
            "-NoProfile".to_string(),
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-File".to_string(),
            s.to_string(),
            "-NoOpenBrowser".to_string(),
        ]
    };
    vec![
        LaunchStrategy::new("pwsh", args(&script)),
        LaunchStrategy::new("powershell", args(&script)),
    ]
}

#[cfg(not(target_os = "windows"))]
pub fn launch_strategies(root: &Path) -> Vec<LaunchStrategy> {
    let script = root.join("start.sh").to_string_lossy().to_string();
    vec![LaunchStrategy::new("bash", vec![script])]
}

/// Launch the backend bootstrap from `root` and wait for it to finish.
///
/// The child inherits this process's standard streams so bootstrap output
/// lands in the user-visible log. Completion is the bootstrap script's own
/// exit; the long-running backend it starts is not managed here.
pub async fn launch_backend(root: &Path) -> Result<(), String> {
    run_strategies(root, &launch_strategies(root)).await
}

async fn run_strategies(root: &Path, strategies: &[LaunchStrategy]) -> Result<(), String> {
    let mut spawn_errors = Vec::new();

    for strategy in strategies {
        log::info!(
            "[Launch] Running {} {}",
            strategy.program,
            strategy.args.join(" ")
        );

        let mut cmd = Command::new(&strategy.program);
        cmd.args(&strategy.args)
            .current_dir(root)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                // Interpreter not available: record and try the next one.
                spawn_errors.push(format!("{}: {}", strategy.program, e));
                continue;
            }
        };

        let status = child
            .wait()
            .await
            .map_err(|e| format!("{}: {}", strategy.program, e))?;

        if status.success() {
            return Ok(());
        }

        // The interpreter ran; its failure is authoritative, no fallback.
        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return Err(format!("{} exited with code {}", strategy.program, code));
    }

    Err(format!(
        "Failed to run backend bootstrap.\n{}",
        spawn_errors.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn successful_bootstrap_completes() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("start.sh"), "exit 0\n").unwrap();
        assert!(launch_backend(root.path()).await.is_ok());
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn nonzero_exit_reports_code() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("start.sh"), "exit 3\n").unwrap();
        let err = launch_backend(root.path()).await.unwrap_err();
        assert!(err.contains("code 3"), "unexpected error: {}", err);
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn spawn_failure_falls_through_to_next_strategy() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("ok.sh"), "exit 0\n").unwrap();
        let script = root.path().join("ok.sh").to_string_lossy().to_string();

        let strategies = vec![
            LaunchStrategy::new("winddrawer-no-such-interpreter", vec![script.clone()]),
            LaunchStrategy::new("bash", vec![script]),
        ];
        assert!(run_strategies(root.path(), &strategies).await.is_ok());
    }

    #[tokio::test]
    async fn all_spawn_failures_are_concatenated() {
        let root = TempDir::new().unwrap();
        let strategies = vec![
            LaunchStrategy::new("winddrawer-missing-a", vec![]),
            LaunchStrategy::new("winddrawer-missing-b", vec![]),
        ];
        let err = run_strategies(root.path(), &strategies).await.unwrap_err();
        assert!(err.contains("winddrawer-missing-a"));
        assert!(err.contains("winddrawer-missing-b"));
    }
}
