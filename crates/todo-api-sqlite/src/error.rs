use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn not_found_id(id: i64) -> Self {
        ApiError::NotFound(format!("Todo with ID: {id} not found"))
    }

    pub fn empty_title() -> Self {
        ApiError::Validation("The title field is required and must not be empty".to_string())
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
