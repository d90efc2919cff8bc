//! Raw socket hosting variant: a hand-rolled HTTP/1.1 loop over a TCP
//! listener, with cooperative shutdown and bounded request draining.
//!
//! One task accepts connections; every accepted connection is served on its
//! own task. On shutdown the accept loop stops, in-flight connections get up
//! to [`DRAIN_TIMEOUT`] to finish, and the tallies are reported.

use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 5003;
const DRAIN_TIMEOUT: Duration = Duration::from_millis(2000);
const RESPONSE_BODY: &[u8] = b"Hello World!";

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tally {
    received: u64,
    processed: u64,
    failed: u64,
}

impl Counters {
    fn tally(&self) -> Tally {
        Tally {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let port = startup_probe::port_from_args(DEFAULT_PORT);
    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(port, error = %err, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    let url = format!("http://localhost:{port}");

    startup_probe::report_startup_complete(&url);

    let counters = Arc::new(Counters::default());
    let (stop_tx, stop_rx) = watch::channel(false);
    let loop_task = tokio::spawn(request_loop(listener, counters.clone(), stop_rx));

    let mut exit_code = ExitCode::SUCCESS;
    match startup_probe::mode_from_env() {
        startup_probe::StartMode::Interactive => {
            println!("Press Ctrl+C to exit");
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
        }
        startup_probe::StartMode::SelfTest {
            suppress_first_request,
        } => {
            if !suppress_first_request {
                if let Err(err) = startup_probe::self_test(&url, "/").await {
                    tracing::error!(error = %err, "startup self test failed");
                    exit_code = ExitCode::FAILURE;
                }
            }
        }
    }

    println!("Shutting down");
    let _ = stop_tx.send(true);
    match loop_task.await {
        Ok(tally) => {
            println!("Server shut down successfully");
            println!("- {} requests received", tally.received);
            println!("- {} requests processed", tally.processed);
            println!("- {} requests failed", tally.failed);
        }
        Err(err) => {
            tracing::error!(error = %err, "request loop panicked");
            exit_code = ExitCode::FAILURE;
        }
    }

    exit_code
}

/// Accepts connections until cancelled, then drains in-flight connection
/// tasks for at most [`DRAIN_TIMEOUT`], counting the stragglers as failed.
async fn request_loop(
    listener: TcpListener,
    counters: Arc<Counters>,
    mut stop: watch::Receiver<bool>,
) -> Tally {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        counters.received.fetch_add(1, Ordering::Relaxed);
                        let counters = counters.clone();
                        connections.spawn(async move {
                            match process_request(stream).await {
                                Ok(()) => counters.processed.fetch_add(1, Ordering::Relaxed),
                                Err(err) => {
                                    tracing::debug!(error = %err, "request failed");
                                    counters.failed.fetch_add(1, Ordering::Relaxed)
                                }
                            };
                        });
                    }
                    Err(err) => tracing::warn!(error = %err, "accept failed"),
                }
            }
        }
    }

    // Drain requests
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        connections.abort_all();
        while let Some(result) = connections.join_next().await {
            // Aborted tasks never reached a counter; tally them as failed so
            // received == processed + failed still holds.
            if result.is_err() {
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    counters.tally()
}

/// Reads the request head and writes a fixed plain-text response.
async fn process_request(mut stream: TcpStream) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    let mut read = 0;
    while read < buf.len() {
        let n = stream.read(&mut buf[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let headers = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        RESPONSE_BODY.len()
    );
    stream.write_all(headers.as_bytes()).await?;
    stream.write_all(RESPONSE_BODY).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn start_server() -> (String, Arc<Counters>, watch::Sender<bool>, tokio::task::JoinHandle<Tally>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let counters = Arc::new(Counters::default());
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(request_loop(listener, counters.clone(), stop_rx));
        (format!("http://127.0.0.1:{port}"), counters, stop_tx, task)
    }

    #[tokio::test]
    async fn serves_hello_world() {
        let (url, _counters, stop_tx, task) = start_server().await;

        let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert_eq!(body, "Hello World!");

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_tally_is_consistent() {
        let (url, _counters, stop_tx, task) = start_server().await;

        for _ in 0..5 {
            let response = reqwest::get(&url).await.unwrap();
            assert!(response.status().is_success());
        }

        stop_tx.send(true).unwrap();
        let tally = tokio::time::timeout(DRAIN_TIMEOUT + Duration::from_millis(500), task)
            .await
            .expect("server must shut down within the drain timeout")
            .unwrap();

        assert_eq!(tally.received, 5);
        assert_eq!(tally.received, tally.processed + tally.failed);
    }

    #[tokio::test]
    async fn shutdown_with_no_traffic_reports_zeroes() {
        let (_url, _counters, stop_tx, task) = start_server().await;

        stop_tx.send(true).unwrap();
        let tally = task.await.unwrap();
        assert_eq!(
            tally,
            Tally {
                received: 0,
                processed: 0,
                failed: 0
            }
        );
    }
}
