//! Console data-access variant: the scripted CRUD round trip straight
//! against SQLite, no HTTP hosting at all.

use anyhow::bail;
use dotenv::dotenv;
use sqlx::{Pool, Sqlite};
use tracing_subscriber::EnvFilter;

use todo_api_sqlite::{db, model::Todo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let connection_string = db::connection_string();
    let pool = db::ensure_db(&connection_string).await?;

    list_current_todos(&pool).await?;

    add_todo(&pool, "Do the groceries").await?;
    add_todo(&pool, "Give the dog a bath").await?;
    add_todo(&pool, "Wash the car").await?;

    println!();

    list_current_todos(&pool).await?;

    mark_complete(&pool, "Wash the car").await?;

    list_current_todos(&pool).await?;

    let deleted_count = delete_all_todos(&pool).await?;
    println!("Deleted all {deleted_count} todos!");
    println!();

    Ok(())
}

async fn list_current_todos(pool: &Pool<Sqlite>) -> anyhow::Result<()> {
    let todos = sqlx::query_as::<_, Todo>(
        "SELECT id, title, is_complete FROM todos WHERE is_complete = false",
    )
    .fetch_all(pool)
    .await?;

    print!("{}", format_todo_table(&todos));
    Ok(())
}

async fn add_todo(pool: &Pool<Sqlite>, title: &str) -> anyhow::Result<()> {
    let todo = sqlx::query_as::<_, Todo>(
        "INSERT INTO todos (title, is_complete) VALUES (?, false) RETURNING id, title, is_complete",
    )
    .bind(title)
    .fetch_one(pool)
    .await?;
    println!("Added todo {}", todo.id);
    Ok(())
}

async fn mark_complete(pool: &Pool<Sqlite>, title: &str) -> anyhow::Result<()> {
    let rows_affected =
        sqlx::query("UPDATE todos SET is_complete = true WHERE title = ? AND is_complete = false")
            .bind(title)
            .execute(pool)
            .await?
            .rows_affected();

    if rows_affected == 0 {
        bail!("No incomplete todo with title '{title}' was found!");
    }

    println!("Todo '{title}' completed!");
    println!();
    Ok(())
}

async fn delete_all_todos(pool: &Pool<Sqlite>) -> anyhow::Result<u64> {
    Ok(sqlx::query("DELETE FROM todos")
        .execute(pool)
        .await?
        .rows_affected())
}

/// Renders the Id/Title table shown between the scripted steps.
fn format_todo_table(todos: &[Todo]) -> String {
    if todos.is_empty() {
        return "There are currently no todos!\n\n".to_string();
    }

    let id_heading = "Id";
    let title_heading = "Title";
    let id_width = todos
        .iter()
        .map(|t| t.id.to_string().len())
        .max()
        .unwrap_or(0)
        .max(id_heading.len());
    let title_width = todos
        .iter()
        .map(|t| t.title.len())
        .max()
        .unwrap_or(0)
        .max(title_heading.len());

    let mut out = String::new();
    out.push_str(&format!(
        "{id_heading:<id_width$} {title_heading:<title_width$}\n"
    ));
    out.push_str(&"-".repeat(id_width + 1 + title_width));
    out.push('\n');
    for todo in todos {
        out.push_str(&format!(
            "{:<id_width$} {:<title_width$}\n",
            todo.id, todo.title
        ));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_prints_placeholder() {
        assert_eq!(format_todo_table(&[]), "There are currently no todos!\n\n");
    }

    #[test]
    fn table_pads_columns_to_the_widest_value() {
        let todos = vec![
            Todo {
                id: 1,
                title: "Do the groceries".to_string(),
                is_complete: false,
            },
            Todo {
                id: 102,
                title: "Wash the car".to_string(),
                is_complete: false,
            },
        ];

        let table = format_todo_table(&todos);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Id  Title           ");
        assert_eq!(lines[1], "--------------------");
        assert_eq!(lines[2], "1   Do the groceries");
        assert_eq!(lines[3], "102 Wash the car    ");
    }
}
