//! Startup reporting and benchmark-mode self-test shared by every server app.
//!
//! Each app prints a machine-readable line as soon as its listener is bound,
//! then either runs until Ctrl+C (interactive mode) or, when
//! `SHUTDOWN_ON_START=true`, issues a single request against itself, reports
//! timing and memory metrics, and shuts down. The benchmark harness spawns the
//! apps in that second mode and parses the metric lines off stdout.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use sysinfo::{Pid, System};

pub const SERVER_STARTUP_COMPLETE: &str = "ServerStartupComplete";
pub const FIRST_REQUEST_COMPLETE: &str = "FirstRequestComplete";
pub const WORKING_SET: &str = "WorkingSet";

/// How the process was asked to behave at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Run until interrupted.
    Interactive,
    /// Issue one request against ourselves, report metrics, then exit.
    SelfTest { suppress_first_request: bool },
}

pub fn mode_from_env() -> StartMode {
    if env_flag("SHUTDOWN_ON_START") {
        StartMode::SelfTest {
            suppress_first_request: env_flag("SUPPRESS_FIRST_REQUEST"),
        }
    } else {
        StartMode::Interactive
    }
}

pub fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "true").unwrap_or(false)
}

/// Listen port: first CLI argument, then `PORT`, then the app's default.
pub fn port_from_args(default: u16) -> u16 {
    std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .or_else(|| std::env::var("PORT").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(default)
}

pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Announce that the listener is bound and serving at `url`.
pub fn report_startup_complete(url: &str) {
    println!("{},{},{}", SERVER_STARTUP_COMPLETE, now_micros(), url);
    let _ = std::io::stdout().flush();
}

/// Resident set size of the current process, if the platform reports one.
pub fn rss_bytes() -> Option<u64> {
    let pid = Pid::from_u32(std::process::id());
    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid).map(|p| p.memory())
}

/// Benchmark-mode self test: one GET against our own listener, then the
/// first-request and working-set metric lines.
pub async fn self_test(url: &str, first_request_path: &str) -> anyhow::Result<()> {
    let target = format!("{}{}", url, first_request_path);
    let response = reqwest::get(&target).await?;
    response.error_for_status()?;

    println!("{},{}", FIRST_REQUEST_COMPLETE, now_micros());
    if let Some(rss) = rss_bytes() {
        println!("{},{},{}", WORKING_SET, now_micros(), rss);
    }
    let _ = std::io::stdout().flush();
    Ok(())
}

/// One parsed metric line, as consumed by the benchmark harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metric {
    StartupComplete { at_micros: u64, url: String },
    FirstRequestComplete { at_micros: u64 },
    WorkingSet { at_micros: u64, bytes: u64 },
}

impl Metric {
    /// Parses a single stdout line, returning `None` for non-metric output.
    pub fn parse(line: &str) -> Option<Metric> {
        let mut parts = line.trim().split(',');
        let name = parts.next()?;
        let at_micros: u64 = parts.next()?.parse().ok()?;
        match name {
            SERVER_STARTUP_COMPLETE => Some(Metric::StartupComplete {
                at_micros,
                url: parts.next()?.to_string(),
            }),
            FIRST_REQUEST_COMPLETE => Some(Metric::FirstRequestComplete { at_micros }),
            WORKING_SET => Some(Metric::WorkingSet {
                at_micros,
                bytes: parts.next()?.parse().ok()?,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_startup_line() {
        let line = "ServerStartupComplete,1700000000000000,http://localhost:5003";
        assert_eq!(
            Metric::parse(line),
            Some(Metric::StartupComplete {
                at_micros: 1_700_000_000_000_000,
                url: "http://localhost:5003".to_string()
            })
        );
    }

    #[test]
    fn parses_first_request_and_working_set_lines() {
        assert_eq!(
            Metric::parse("FirstRequestComplete,42"),
            Some(Metric::FirstRequestComplete { at_micros: 42 })
        );
        assert_eq!(
            Metric::parse("WorkingSet,42,1048576"),
            Some(Metric::WorkingSet {
                at_micros: 42,
                bytes: 1_048_576
            })
        );
    }

    #[test]
    fn ignores_ordinary_output() {
        assert_eq!(Metric::parse("Server shut down successfully"), None);
        assert_eq!(Metric::parse(""), None);
        assert_eq!(Metric::parse("WorkingSet,notanumber,1"), None);
    }

    #[test]
    fn rss_is_reported() {
        // sysinfo should always find our own process.
        assert!(rss_bytes().unwrap_or(0) > 0);
    }
}
