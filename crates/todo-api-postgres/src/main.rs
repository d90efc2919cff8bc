//! Todo API hosted on axum with sqlx/PostgreSQL data access.
//!
//! Same route surface as the SQLite variants; only the driver and the SQL
//! dialect differ.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{self, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use dotenv::dotenv;
use serde_json::json;
use sqlx::{migrate::MigrateDatabase, postgres::PgPoolOptions, query, query_as, Pool, Postgres};
use thiserror::Error;
use todo_auth::{require_admin, JwtAuth};
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 5081;
const DEFAULT_CONNECTION_STRING: &str = "postgres://localhost/slimtodo";

// Data model representing a Todo item
#[derive(Debug, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
struct Todo {
    id: i64,
    title: String,
    is_complete: bool,
}

#[derive(Debug, serde::Deserialize)]
struct CreateTodoSchema {
    title: String,
    #[serde(default)]
    is_complete: bool,
}

#[derive(Debug, serde::Deserialize)]
struct UpdateTodoSchema {
    title: String,
    is_complete: bool,
}

#[derive(Debug, serde::Deserialize)]
struct FindTodoParams {
    title: String,
    is_complete: Option<bool>,
}

struct AppState {
    db: Pool<Postgres>,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn not_found_id(id: i64) -> Self {
        ApiError::NotFound(format!("Todo with ID: {id} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({"status": "fail", "message": message}),
            ),
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                json!({"status": "fail", "message": message}),
            ),
            ApiError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"status": "error", "message": "Something bad happened while querying the database"}),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation(
            "The title field is required and must not be empty".to_string(),
        ));
    }
    Ok(())
}

async fn health_checker_handler() -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "message": "Todo CRUD API with Rust, axum, sqlx and PostgreSQL"
    }))
}

async fn get_todos(State(data): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let todos = query_as::<_, Todo>("SELECT id, title, is_complete FROM todos")
        .fetch_all(&data.db)
        .await?;
    Ok(Json(todos))
}

async fn get_complete_todos(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todos = query_as::<_, Todo>("SELECT id, title, is_complete FROM todos WHERE is_complete")
        .fetch_all(&data.db)
        .await?;
    Ok(Json(todos))
}

async fn get_incomplete_todos(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todos =
        query_as::<_, Todo>("SELECT id, title, is_complete FROM todos WHERE NOT is_complete")
            .fetch_all(&data.db)
            .await?;
    Ok(Json(todos))
}

async fn get_todo(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = query_as::<_, Todo>("SELECT id, title, is_complete FROM todos WHERE id = $1")
        .bind(id)
        .fetch_optional(&data.db)
        .await?
        .ok_or_else(|| ApiError::not_found_id(id))?;
    Ok(Json(todo))
}

async fn find_todo(
    Query(params): Query<FindTodoParams>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = query_as::<_, Todo>(
        "SELECT id, title, is_complete FROM todos \
         WHERE LOWER(title) = LOWER($1) AND ($2::boolean IS NULL OR is_complete = $2)",
    )
    .bind(&params.title)
    .bind(params.is_complete)
    .fetch_optional(&data.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("No todo with title '{}' was found", params.title)))?;
    Ok(Json(todo))
}

async fn create_todo(
    State(data): State<Arc<AppState>>,
    Json(body): Json<CreateTodoSchema>,
) -> Result<impl IntoResponse, ApiError> {
    validate_title(&body.title)?;

    let todo = query_as::<_, Todo>(
        "INSERT INTO todos (title, is_complete) VALUES ($1, $2) RETURNING id, title, is_complete",
    )
    .bind(&body.title)
    .bind(body.is_complete)
    .fetch_one(&data.db)
    .await?;

    let location = format!("/api/todos/{}", todo.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(todo),
    ))
}

async fn update_todo(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<UpdateTodoSchema>,
) -> Result<impl IntoResponse, ApiError> {
    validate_title(&body.title)?;

    let rows_affected = query("UPDATE todos SET title = $1, is_complete = $2 WHERE id = $3")
        .bind(&body.title)
        .bind(body.is_complete)
        .bind(id)
        .execute(&data.db)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(ApiError::not_found_id(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn set_complete(data: &AppState, id: i64, complete: bool) -> Result<StatusCode, ApiError> {
    let rows_affected = query("UPDATE todos SET is_complete = $1 WHERE id = $2")
        .bind(complete)
        .bind(id)
        .execute(&data.db)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(ApiError::not_found_id(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_complete(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    set_complete(&data, id, true).await
}

async fn mark_incomplete(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    set_complete(&data, id, false).await
}

async fn delete_todo(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows_affected = query("DELETE FROM todos WHERE id = $1")
        .bind(id)
        .execute(&data.db)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(ApiError::not_found_id(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_all_todos(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows_affected = query("DELETE FROM todos")
        .execute(&data.db)
        .await?
        .rows_affected();
    Ok(Json(rows_affected))
}

fn create_router(app_state: Arc<AppState>, auth: JwtAuth) -> Router {
    let admin_routes = Router::new()
        .route("/delete-all", delete(delete_all_todos))
        .route_layer(from_fn_with_state(auth, require_admin));

    let todo_routes = Router::new()
        .route("/", get(get_todos).post(create_todo))
        .route("/complete", get(get_complete_todos))
        .route("/incomplete", get(get_incomplete_todos))
        .route("/find", get(find_todo))
        .route("/:id", get(get_todo).put(update_todo).delete(delete_todo))
        .route("/:id/mark-complete", put(mark_complete))
        .route("/:id/mark-incomplete", put(mark_incomplete))
        .merge(admin_routes);

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    Router::new()
        .route("/", get(health_checker_handler))
        .nest("/api/todos", todo_routes)
        .with_state(app_state)
        .layer(cors)
}

async fn ensure_db(connection_string: &str) -> Result<Pool<Postgres>, sqlx::Error> {
    let suppress_init = startup_probe::env_flag("SUPPRESS_DB_INIT");

    if !suppress_init
        && !Postgres::database_exists(connection_string)
            .await
            .unwrap_or(false)
    {
        tracing::info!(connection_string, "creating database");
        Postgres::create_database(connection_string).await?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(connection_string)
        .await?;

    if suppress_init {
        tracing::info!(connection_string, "database initialization disabled");
        return Ok(pool);
    }

    tracing::info!(connection_string, "ensuring todos table exists");
    query(
        r#"CREATE TABLE IF NOT EXISTS todos (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        is_complete BOOLEAN NOT NULL DEFAULT FALSE
    );"#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let auth = match JwtAuth::from_env() {
        Ok(auth) => auth,
        Err(err) => {
            tracing::error!(error = %err, "JWT options are not configured");
            return ExitCode::FAILURE;
        }
    };

    let connection_string = std::env::var("CONNECTION_STRING")
        .unwrap_or_else(|_| DEFAULT_CONNECTION_STRING.to_string());
    let pool = match ensure_db(&connection_string).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(connection_string, error = %err, "failed to connect to the database");
            return ExitCode::FAILURE;
        }
    };

    let app = create_router(Arc::new(AppState { db: pool }), auth);

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
