//! Cold-start benchmark harness: builds each app under the requested cargo
//! profiles, runs it in benchmark mode, and reports startup time,
//! first-request latency, resident memory, and binary size.

mod report;
mod runner;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_APPS: &[&str] = &[
    "hello-tcp",
    "hello-hyper",
    "hello-axum",
    "todo-api-sqlite",
    "todo-api-rusqlite",
];

#[derive(Parser)]
#[command(name = "startup-bench")]
#[command(about = "Measure cold-start metrics for every hosting variant")]
struct Cli {
    /// Apps to benchmark (workspace package names)
    #[arg(long, value_delimiter = ',')]
    apps: Vec<String>,

    /// Cargo profiles to build under
    #[arg(long, value_delimiter = ',', default_values_t =
        ["release".to_string(), "release-lto".to_string(), "min-size".to_string()])]
    profiles: Vec<String>,

    /// Cold starts per app/profile cell
    #[arg(long, default_value_t = 10)]
    iterations: u32,

    /// Skip the self-issued first request (startup time only)
    #[arg(long)]
    suppress_first_request: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let apps: Vec<String> = if cli.apps.is_empty() {
        DEFAULT_APPS.iter().map(|s| s.to_string()).collect()
    } else {
        cli.apps.clone()
    };

    let workspace_root = workspace_root()?;

    // The todo APIs refuse to start without a signing key; give every run
    // one unless the caller already exported theirs.
    let signing_key = std::env::var(todo_auth::SIGNING_KEY_ENV)
        .unwrap_or_else(|_| todo_auth::generate_key_material());

    let headers = [
        "App",
        "Profile",
        "Size",
        "Startup (ms)",
        "First request (ms)",
        "RSS",
    ];
    let mut rows = Vec::new();

    for app in &apps {
        for profile in &cli.profiles {
            tracing::info!(app, profile, "building");
            let binary = runner::build(&workspace_root, app, profile)?;
            let size = std::fs::metadata(&binary).map(|m| m.len()).ok();

            // Scratch database per cell so runs never see each other's rows.
            let scratch = tempfile::tempdir().context("could not create scratch dir")?;
            let mut envs = vec![(
                todo_auth::SIGNING_KEY_ENV.to_string(),
                signing_key.clone(),
            )];
            if let Some(connection_string) = connection_string_for(app, scratch.path()) {
                envs.push(("CONNECTION_STRING".to_string(), connection_string));
            }
            if cli.suppress_first_request {
                envs.push(("SUPPRESS_FIRST_REQUEST".to_string(), "true".to_string()));
            }

            let mut startups = Vec::new();
            let mut first_requests = Vec::new();
            let mut working_set = None;
            for iteration in 0..cli.iterations {
                tracing::debug!(app, profile, iteration, "cold start");
                let metrics = runner::run_once(&binary, &envs)
                    .with_context(|| format!("benchmark run failed for '{app}' ({profile})"))?;
                startups.push(metrics.startup_ms);
                if let Some(ms) = metrics.first_request_ms {
                    first_requests.push(ms);
                }
                if let Some(bytes) = metrics.working_set_bytes {
                    working_set = Some(bytes);
                }
            }

            rows.push(vec![
                app.clone(),
                profile.clone(),
                report::format_bytes(size),
                report::format_millis(report::summarize(&startups)),
                report::format_millis(report::summarize(&first_requests)),
                report::format_bytes(working_set),
            ]);
        }
    }

    print!("{}", report::render_table(&headers, &rows));
    Ok(())
}

/// The workspace root, so the harness works from any member directory.
fn workspace_root() -> anyhow::Result<PathBuf> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf())
        .context("could not locate the workspace root")
}

/// Per-app scratch connection string; apps without a database get none.
fn connection_string_for(app: &str, scratch: &std::path::Path) -> Option<String> {
    let db_path = scratch.join("todos.db");
    match app {
        "todo-api-sqlite" | "todo-console" => {
            Some(format!("sqlite://{}", db_path.display()))
        }
        "todo-api-rusqlite" => Some(db_path.display().to_string()),
        _ => None,
    }
}
