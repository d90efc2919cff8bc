use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::{query, query_as};

use crate::{
    error::ApiError,
    model::Todo,
    schema::{CreateTodoSchema, FindTodoParams, UpdateTodoSchema},
    AppState,
};

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::empty_title());
    }
    Ok(())
}

// Handler for the health checker route
pub async fn health_checker_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "success",
        "message": "Todo CRUD API with Rust, axum, sqlx and SQLite"
    }))
}

// Handler for getting all Todo items
pub async fn get_todos(State(data): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let todos = query_as::<_, Todo>("SELECT id, title, is_complete FROM todos")
        .fetch_all(&data.db)
        .await?;
    Ok(Json(todos))
}

// Handler for getting all complete Todo items
pub async fn get_complete_todos(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todos = query_as::<_, Todo>("SELECT id, title, is_complete FROM todos WHERE is_complete = true")
        .fetch_all(&data.db)
        .await?;
    Ok(Json(todos))
}

// Handler for getting all incomplete Todo items
pub async fn get_incomplete_todos(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todos = query_as::<_, Todo>("SELECT id, title, is_complete FROM todos WHERE is_complete = false")
        .fetch_all(&data.db)
        .await?;
    Ok(Json(todos))
}

// Handler for getting a specific Todo by ID
pub async fn get_todo(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = query_as::<_, Todo>("SELECT id, title, is_complete FROM todos WHERE id = ?")
        .bind(id)
        .fetch_optional(&data.db)
        .await?
        .ok_or_else(|| ApiError::not_found_id(id))?;
    Ok(Json(todo))
}

// Handler for finding a Todo by title, optionally filtered on completeness
pub async fn find_todo(
    Query(params): Query<FindTodoParams>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = query_as::<_, Todo>(
        "SELECT id, title, is_complete FROM todos \
         WHERE title = ?1 COLLATE NOCASE AND (?2 IS NULL OR is_complete = ?2)",
    )
    .bind(&params.title)
    .bind(params.is_complete)
    .fetch_optional(&data.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("No todo with title '{}' was found", params.title)))?;
    Ok(Json(todo))
}

// Handler for creating a new Todo
pub async fn create_todo(
    State(data): State<Arc<AppState>>,
    Json(body): Json<CreateTodoSchema>,
) -> Result<impl IntoResponse, ApiError> {
    validate_title(&body.title)?;

    let todo = query_as::<_, Todo>(
        "INSERT INTO todos (title, is_complete) VALUES (?, ?) RETURNING id, title, is_complete",
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

// Handler for updating a Todo by ID
pub async fn update_todo(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<UpdateTodoSchema>,
) -> Result<impl IntoResponse, ApiError> {
    validate_title(&body.title)?;

    let rows_affected = query("UPDATE todos SET title = ?, is_complete = ? WHERE id = ?")
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

// Handler for marking a Todo complete
pub async fn mark_complete(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    set_complete(&data, id, true).await
}

// Handler for marking a Todo incomplete
pub async fn mark_incomplete(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    set_complete(&data, id, false).await
}

async fn set_complete(data: &AppState, id: i64, complete: bool) -> Result<StatusCode, ApiError> {
    let rows_affected = query("UPDATE todos SET is_complete = ? WHERE id = ?")
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

// Handler for deleting a Todo by ID
pub async fn delete_todo(
    Path(id): Path<i64>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows_affected = query("DELETE FROM todos WHERE id = ?")
        .bind(id)
        .execute(&data.db)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(ApiError::not_found_id(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Handler for deleting every Todo; guarded by the admin middleware
pub async fn delete_all_todos(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rows_affected = query("DELETE FROM todos")
        .execute(&data.db)
        .await?
        .rows_affected();
    Ok(Json(rows_affected))
}
