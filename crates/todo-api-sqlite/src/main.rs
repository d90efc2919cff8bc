//! Todo API hosted on axum with sqlx/SQLite data access.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use dotenv::dotenv;
use todo_auth::JwtAuth;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use todo_api_sqlite::{db, route::create_router, AppState};

const DEFAULT_PORT: u16 = 5079;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Fail fast when the JWT options are not configured rather than serving
    // an API whose protected routes can never authorize anyone.
    let auth = match JwtAuth::from_env() {
        Ok(auth) => auth,
        Err(err) => {
            tracing::error!(error = %err, "JWT options are not configured");
            return ExitCode::FAILURE;
        }
    };

    let connection_string = db::connection_string();
    let pool = match db::ensure_db(&connection_string).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(connection_string, error = %err, "failed to connect to the database");
            return ExitCode::FAILURE;
        }
    };

    let app_state = Arc::new(AppState { db: pool });
    let app = create_router(app_state, auth);

    let port = startup_probe::port_from_args(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let url = format!("http://localhost:{port}");

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
                if let Err(err) = startup_probe::self_test(&url, "/api/todos").await {
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
