//! SQLite access through the raw rusqlite driver.
//!
//! rusqlite connections are synchronous, so every operation hops onto a
//! blocking task and takes the connection lock there.

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::Todo;

pub const DEFAULT_DB_PATH: &str = "todos.db";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub fn db_path() -> String {
    std::env::var("CONNECTION_STRING").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
}

fn row_to_todo(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        is_complete: row.get(2)?,
    })
}

#[derive(Clone)]
pub struct TodoStore {
    conn: Arc<Mutex<Connection>>,
}

impl TodoStore {
    /// Opens (or creates) the database file and ensures the schema, unless
    /// `SUPPRESS_DB_INIT=true`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        Ok(store)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        if !startup_probe::env_flag("SUPPRESS_DB_INIT") {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS todos (
                    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                    title TEXT NOT NULL,
                    is_complete INTEGER NOT NULL DEFAULT 0 CHECK (is_complete IN (0, 1))
                );
                "#,
            )?;
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await??;
        Ok(result)
    }

    pub async fn list(&self, is_complete: Option<bool>) -> Result<Vec<Todo>, StoreError> {
        self.with_conn(move |conn| {
            let (sql, filter): (&str, Vec<bool>) = match is_complete {
                None => ("SELECT id, title, is_complete FROM todos", vec![]),
                Some(value) => (
                    "SELECT id, title, is_complete FROM todos WHERE is_complete = ?1",
                    vec![value],
                ),
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(filter), row_to_todo)?;
            rows.collect()
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Todo>, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, title, is_complete FROM todos WHERE id = ?1",
                params![id],
                row_to_todo,
            )
            .optional()
        })
        .await
    }

    pub async fn find(
        &self,
        title: String,
        is_complete: Option<bool>,
    ) -> Result<Option<Todo>, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, title, is_complete FROM todos \
                 WHERE title = ?1 COLLATE NOCASE AND (?2 IS NULL OR is_complete = ?2)",
                params![title, is_complete],
                row_to_todo,
            )
            .optional()
        })
        .await
    }

    pub async fn insert(&self, title: String, is_complete: bool) -> Result<Todo, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "INSERT INTO todos (title, is_complete) VALUES (?1, ?2) \
                 RETURNING id, title, is_complete",
                params![title, is_complete],
                row_to_todo,
            )
        })
        .await
    }

    /// Returns false when no row with `id` exists.
    pub async fn update(
        &self,
        id: i64,
        title: String,
        is_complete: bool,
    ) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE todos SET title = ?1, is_complete = ?2 WHERE id = ?3",
                params![title, is_complete, id],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    pub async fn set_complete(&self, id: i64, is_complete: bool) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE todos SET is_complete = ?1 WHERE id = ?2",
                params![is_complete, id],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
            Ok(changed == 1)
        })
        .await
    }

    pub async fn delete_all(&self) -> Result<u64, StoreError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM todos", [])?;
            Ok(deleted as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TodoStore {
        TodoStore::from_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = store();
        let first = store.insert("Do the groceries".into(), false).await.unwrap();
        let second = store.insert("Wash the car".into(), false).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn round_trip_leaves_zero_rows() {
        let store = store();
        let todo = store.insert("Wash the car".into(), false).await.unwrap();

        assert_eq!(store.list(None).await.unwrap().len(), 1);

        assert!(store.set_complete(todo.id, true).await.unwrap());
        assert_eq!(store.list(Some(true)).await.unwrap().len(), 1);
        assert_eq!(store.list(Some(false)).await.unwrap().len(), 0);

        assert_eq!(store.delete_all().await.unwrap(), 1);
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_is_case_insensitive() {
        let store = store();
        store.insert("Give the dog a bath".into(), false).await.unwrap();

        let found = store
            .find("GIVE THE DOG A BATH".into(), None)
            .await
            .unwrap();
        assert!(found.is_some());

        let none = store
            .find("Give the dog a bath".into(), Some(true))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn missing_rows_report_not_found() {
        let store = store();
        assert!(store.get(42).await.unwrap().is_none());
        assert!(!store.delete(42).await.unwrap());
        assert!(!store.set_complete(42, true).await.unwrap());
        assert!(!store.update(42, "x".into(), false).await.unwrap());
    }
}
