//! Todo API over sqlx + SQLite: the query-mapper data-access variant.

use sqlx::{Pool, Sqlite};

pub mod db;
pub mod error;
pub mod handler;
pub mod model;
pub mod route;
pub mod schema;

// Struct representing the application state
pub struct AppState {
    pub db: Pool<Sqlite>,
}
