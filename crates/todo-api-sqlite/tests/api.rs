//! Route-level tests against an in-memory SQLite database.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use todo_api_sqlite::{model::Todo, route::create_router, AppState};
use todo_auth::JwtAuth;
use tower::ServiceExt;

fn signing_key() -> String {
    general_purpose::STANDARD.encode([7u8; 32])
}

async fn test_app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query(
        r#"CREATE TABLE todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        title TEXT NOT NULL,
        is_complete INTEGER NOT NULL DEFAULT 0 CHECK (is_complete IN (0, 1))
    );"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let auth = JwtAuth::from_key_material(&signing_key()).unwrap();
    create_router(Arc::new(AppState { db: pool }), auth)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn admin_token() -> String {
    todo_auth::create_token(
        &signing_key(),
        "test-admin",
        &[todo_auth::ADMIN_ROLE.to_string()],
        600,
    )
    .unwrap()
}

#[tokio::test]
async fn crud_round_trip_leaves_zero_rows() {
    let app = test_app().await;

    // create
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/todos",
            json!({"title": "Wash the car"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/api/todos/1"
    );
    let created: Todo = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(created.title, "Wash the car");
    assert!(!created.is_complete);

    // list
    let response = app.clone().oneshot(get("/api/todos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let todos: Vec<Todo> = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(todos.len(), 1);

    // mark complete
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(format!("/api/todos/{}/mark-complete", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.clone().oneshot(get("/api/todos/complete")).await.unwrap();
    let complete: Vec<Todo> = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(complete.len(), 1);

    // delete all (admin)
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/todos/delete-all")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!(1));

    let response = app.clone().oneshot(get("/api/todos")).await.unwrap();
    let todos: Vec<Todo> = serde_json::from_value(body_json(response).await).unwrap();
    assert!(todos.is_empty());
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let app = test_app().await;

    for title in ["", "   "] {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/todos",
                json!({"title": title}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn delete_all_requires_admin_role() {
    let app = test_app().await;

    // no token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/todos/delete-all")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // valid token, wrong role
    let token =
        todo_auth::create_token(&signing_key(), "reader", &["reader".to_string()], 600).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/todos/delete-all")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // garbage token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/todos/delete-all")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_todo_is_a_404() {
    let app = test_app().await;

    let response = app.clone().oneshot(get("/api/todos/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/todos/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn find_matches_title_case_insensitively() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/todos",
            json!({"title": "Give the dog a bath"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(get("/api/todos/find?title=give%20the%20dog%20a%20bath"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let todo: Todo = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(todo.title, "Give the dog a bath");

    let response = app
        .clone()
        .oneshot(get("/api/todos/find?title=give%20the%20dog%20a%20bath&is_complete=true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
