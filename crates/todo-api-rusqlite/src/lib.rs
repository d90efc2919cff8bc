//! Todo API over the raw rusqlite driver: no query mapper, just hand-written
//! SQL behind a blocking-task boundary.

pub mod error;
pub mod handler;
pub mod model;
pub mod route;
pub mod schema;
pub mod store;
