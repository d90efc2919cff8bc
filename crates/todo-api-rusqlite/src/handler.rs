use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    error::ApiError,
    schema::{CreateTodoSchema, FindTodoParams, UpdateTodoSchema},
    store::TodoStore,
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
        "message": "Todo CRUD API with Rust, axum and the raw rusqlite driver"
    }))
}

pub async fn get_todos(State(store): State<TodoStore>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(store.list(None).await?))
}

pub async fn get_complete_todos(
    State(store): State<TodoStore>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(store.list(Some(true)).await?))
}

pub async fn get_incomplete_todos(
    State(store): State<TodoStore>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(store.list(Some(false)).await?))
}

pub async fn get_todo(
    Path(id): Path<i64>,
    State(store): State<TodoStore>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found_id(id))?;
    Ok(Json(todo))
}

pub async fn find_todo(
    Query(params): Query<FindTodoParams>,
    State(store): State<TodoStore>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = store
        .find(params.title.clone(), params.is_complete)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("No todo with title '{}' was found", params.title))
        })?;
    Ok(Json(todo))
}

pub async fn create_todo(
    State(store): State<TodoStore>,
    Json(body): Json<CreateTodoSchema>,
) -> Result<impl IntoResponse, ApiError> {
    validate_title(&body.title)?;

    let todo = store.insert(body.title, body.is_complete).await?;
    let location = format!("/api/todos/{}", todo.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(todo),
    ))
}

pub async fn update_todo(
    Path(id): Path<i64>,
    State(store): State<TodoStore>,
    Json(body): Json<UpdateTodoSchema>,
) -> Result<impl IntoResponse, ApiError> {
    validate_title(&body.title)?;

    if !store.update(id, body.title, body.is_complete).await? {
        return Err(ApiError::not_found_id(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_complete(
    Path(id): Path<i64>,
    State(store): State<TodoStore>,
) -> Result<impl IntoResponse, ApiError> {
    if !store.set_complete(id, true).await? {
        return Err(ApiError::not_found_id(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_incomplete(
    Path(id): Path<i64>,
    State(store): State<TodoStore>,
) -> Result<impl IntoResponse, ApiError> {
    if !store.set_complete(id, false).await? {
        return Err(ApiError::not_found_id(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_todo(
    Path(id): Path<i64>,
    State(store): State<TodoStore>,
) -> Result<impl IntoResponse, ApiError> {
    if !store.delete(id).await? {
        return Err(ApiError::not_found_id(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Guarded by the admin middleware
pub async fn delete_all_todos(
    State(store): State<TodoStore>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(store.delete_all().await?))
}
