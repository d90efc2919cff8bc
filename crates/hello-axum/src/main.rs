//! Full-framework hosting variant: the same hello-world endpoint behind the
//! whole axum stack, for comparison against hello-hyper and hello-tcp.

use std::net::SocketAddr;
use std::process::ExitCode;

use axum::{routing::get, Router};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 5000;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let port = startup_probe::port_from_args(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let url = format!("http://localhost:{port}");

    let app = Router::new().route("/", get(|| async { "Hello World!" }));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
    let server_task = tokio::spawn(server);

    startup_probe::report_startup_complete(&url);

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
    let _ = shutdown_tx.send(());
    match server_task.await {
        Ok(Ok(())) => println!("Server shut down successfully"),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "server error");
            exit_code = ExitCode::FAILURE;
        }
        Err(err) => {
            tracing::error!(error = %err, "server task panicked");
            exit_code = ExitCode::FAILURE;
        }
    }

    exit_code
}
