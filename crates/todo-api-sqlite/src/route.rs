use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::{delete, get, put},
    Router,
};
use todo_auth::{require_admin, JwtAuth};
use tower_http::cors::CorsLayer;

use crate::{handler::*, AppState};

pub fn create_router(app_state: Arc<AppState>, auth: JwtAuth) -> Router {
    // delete-all is the one admin-only route
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
