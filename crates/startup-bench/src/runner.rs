//! Building and cold-starting the app binaries.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context};
use startup_probe::Metric;

/// Metrics recovered from one cold start.
#[derive(Debug, Clone, Copy)]
pub struct RunMetrics {
    /// Spawn to ServerStartupComplete, in milliseconds.
    pub startup_ms: f64,
    /// ServerStartupComplete to FirstRequestComplete, in milliseconds.
    pub first_request_ms: Option<f64>,
    /// Resident set size reported after the first request.
    pub working_set_bytes: Option<u64>,
}

/// `cargo build -p <app> --profile <profile>`, returning the binary path.
pub fn build(workspace_root: &Path, app: &str, profile: &str) -> anyhow::Result<PathBuf> {
    let status = Command::new("cargo")
        .current_dir(workspace_root)
        .args(["build", "-p", app, "--profile", profile])
        .status()
        .context("failed to run cargo")?;
    if !status.success() {
        bail!("cargo build failed for '{app}' with profile '{profile}'");
    }

    // cargo puts the `dev` profile under target/debug; every other profile
    // gets a directory of its own name.
    let target_dir = if profile == "dev" { "debug" } else { profile };
    let binary = workspace_root.join("target").join(target_dir).join(app);
    if !binary.exists() {
        bail!("built binary not found at '{}'", binary.display());
    }
    Ok(binary)
}

/// Spawns one benchmark-mode run and parses its metric lines.
pub fn run_once(binary: &Path, envs: &[(String, String)]) -> anyhow::Result<RunMetrics> {
    let spawned_at = startup_probe::now_micros();

    let mut command = Command::new(binary);
    command.env("SHUTDOWN_ON_START", "true");
    for (name, value) in envs {
        command.env(name, value);
    }

    let output = command
        .output()
        .with_context(|| format!("failed to start '{}'", binary.display()))?;

    if !output.status.success() {
        bail!(
            "application process failed on exit ({:?})\nStandard output:\n{}\nStandard error:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_metrics(&stdout, spawned_at)
}

fn parse_metrics(stdout: &str, spawned_at: u64) -> anyhow::Result<RunMetrics> {
    let mut startup_at = None;
    let mut first_request_at = None;
    let mut working_set_bytes = None;

    for metric in stdout.lines().filter_map(Metric::parse) {
        match metric {
            Metric::StartupComplete { at_micros, .. } => startup_at = Some(at_micros),
            Metric::FirstRequestComplete { at_micros } => first_request_at = Some(at_micros),
            Metric::WorkingSet { bytes, .. } => working_set_bytes = Some(bytes),
        }
    }

    let startup_at =
        startup_at.context("app never printed the ServerStartupComplete metric line")?;

    Ok(RunMetrics {
        startup_ms: startup_at.saturating_sub(spawned_at) as f64 / 1000.0,
        first_request_ms: first_request_at
            .map(|at| at.saturating_sub(startup_at) as f64 / 1000.0),
        working_set_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_benchmark_run() {
        let stdout = "\
ServerStartupComplete,1000000,http://localhost:5003
FirstRequestComplete,1250000
WorkingSet,1250100,2097152
Shutting down
Server shut down successfully
";
        let metrics = parse_metrics(stdout, 400_000).unwrap();
        assert_eq!(metrics.startup_ms, 600.0);
        assert_eq!(metrics.first_request_ms, Some(250.0));
        assert_eq!(metrics.working_set_bytes, Some(2_097_152));
    }

    #[test]
    fn suppressed_first_request_leaves_optionals_empty() {
        let stdout = "ServerStartupComplete,1000000,http://localhost:5003\n";
        let metrics = parse_metrics(stdout, 999_000).unwrap();
        assert_eq!(metrics.startup_ms, 1.0);
        assert!(metrics.first_request_ms.is_none());
        assert!(metrics.working_set_bytes.is_none());
    }

    #[test]
    fn missing_startup_line_is_an_error() {
        assert!(parse_metrics("no metrics here\n", 0).is_err());
    }
}
