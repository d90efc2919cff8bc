//! Direct server-library hosting variant: hyper with no web framework on
//! top, the middle ground between the raw TCP loop and the axum stack.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::process::ExitCode;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 5001;

async fn hello(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
    Ok(Response::new(Body::from("Hello World!")))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let port = startup_probe::port_from_args(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let url = format!("http://localhost:{port}");

    let make_svc = make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(hello)) });
    let builder = match Server::try_bind(&addr) {
        Ok(builder) => builder,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = builder
        .serve(make_svc)
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
