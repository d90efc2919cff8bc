//! Scripted CRUD round trip against a running todo API, exercising the same
//! steps as todo-console but over HTTP.

use tracing_subscriber::EnvFilter;

use todo_client::{auth_token, Todo, TodoApiClient, DEFAULT_BASE_ADDRESS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let base_address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BASE_ADDRESS.to_string());

    let token = auth_token()?;
    let client = TodoApiClient::new(&base_address)?.with_auth_token(token);

    list_current_todos(&client).await?;

    add_todo(&client, "Do the groceries").await?;
    add_todo(&client, "Give the dog a bath").await?;
    add_todo(&client, "Wash the car").await?;

    println!();

    list_current_todos(&client).await?;

    client.mark_complete("Wash the car").await?;
    println!("Todo 'Wash the car' completed!");
    println!();

    list_current_todos(&client).await?;

    let deleted_count = client.delete_all_todos().await?;
    println!("Deleted all {deleted_count} todos!");
    println!();

    Ok(())
}

async fn list_current_todos(client: &TodoApiClient) -> anyhow::Result<()> {
    let todos = client.get_current_todos().await?;
    print!("{}", format_todo_table(&todos));
    Ok(())
}

async fn add_todo(client: &TodoApiClient, title: &str) -> anyhow::Result<()> {
    let todo = client.create_todo(title).await?;
    println!("Added todo {}", todo.id);
    Ok(())
}

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
