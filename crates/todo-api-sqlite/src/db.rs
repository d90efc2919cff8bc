use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Pool, Sqlite};

pub const DEFAULT_CONNECTION_STRING: &str = "sqlite://todos.db";

pub fn connection_string() -> String {
    std::env::var("CONNECTION_STRING").unwrap_or_else(|_| DEFAULT_CONNECTION_STRING.to_string())
}

/// Creates the database and the todos table if they don't exist, unless
/// `SUPPRESS_DB_INIT=true` (set by benchmark runs against a pre-seeded db).
pub async fn ensure_db(connection_string: &str) -> Result<Pool<Sqlite>, sqlx::Error> {
    let suppress_init = startup_probe::env_flag("SUPPRESS_DB_INIT");

    if !suppress_init && !Sqlite::database_exists(connection_string).await.unwrap_or(false) {
        tracing::info!(connection_string, "creating database");
        Sqlite::create_database(connection_string).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(connection_string)
        .await?;

    if suppress_init {
        tracing::info!(connection_string, "database initialization disabled");
        return Ok(pool);
    }

    tracing::info!(connection_string, "ensuring todos table exists");
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        title TEXT NOT NULL,
        is_complete INTEGER NOT NULL DEFAULT 0 CHECK (is_complete IN (0, 1))
    );"#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}
