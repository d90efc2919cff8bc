//! Typed HTTP client for the todo APIs.

use std::path::Path;

use reqwest::{header, StatusCode, Url};
use thiserror::Error;

pub const DEFAULT_BASE_ADDRESS: &str = "http://localhost:5079/api/todos/";
pub const AUTH_TOKEN_ENV: &str = "TODO_AUTH_TOKEN";
pub const AUTH_TOKEN_FILE: &str = ".authtoken";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub is_complete: bool,
}

#[derive(Debug, serde::Serialize)]
struct CreateTodo<'a> {
    title: &'a str,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base address '{0}'. Ensure the base address is passed as the only argument, e.g. todo-client {DEFAULT_BASE_ADDRESS}")]
    InvalidBaseAddress(String),

    #[error("no todo with title '{0}' was found")]
    TodoNotFound(String),

    #[error("unexpected status {0} from the todo API")]
    UnexpectedStatus(StatusCode),

    #[error(
        "auth token not found. Set {AUTH_TOKEN_ENV} or run \
         'cargo run -p todo-auth --bin make-token -- --role admin --out {AUTH_TOKEN_FILE}' \
         and place the file next to the todo-client executable."
    )]
    MissingToken,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// The bearer token used for the admin-only delete-all route: the
/// `TODO_AUTH_TOKEN` environment variable, or an `.authtoken` file in `dir`.
pub fn auth_token_from(dir: &Path) -> Result<String, ClientError> {
    if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
        return Ok(token.trim().to_string());
    }
    let path = dir.join(AUTH_TOKEN_FILE);
    match std::fs::read_to_string(&path) {
        Ok(token) => Ok(token.trim().to_string()),
        Err(_) => Err(ClientError::MissingToken),
    }
}

/// Like [`auth_token_from`], looking next to the running executable.
pub fn auth_token() -> Result<String, ClientError> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    auth_token_from(&exe_dir)
}

pub struct TodoApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl TodoApiClient {
    /// `base_address` must point at the todo route group, e.g.
    /// `http://localhost:5079/api/todos/`; a missing trailing slash is added.
    pub fn new(base_address: &str) -> Result<Self, ClientError> {
        let normalized = if base_address.ends_with('/') {
            base_address.to_string()
        } else {
            format!("{base_address}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|_| ClientError::InvalidBaseAddress(base_address.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseAddress(base_address.to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, token: String) -> Self {
        self.auth_token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, relative: &str) -> Url {
        // Safe: `relative` is always one of our fixed route suffixes.
        self.base_url.join(relative).expect("valid route suffix")
    }

    /// All todos not yet complete.
    pub async fn get_current_todos(&self) -> Result<Vec<Todo>, ClientError> {
        let response = self.http.get(self.url("incomplete")).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn create_todo(&self, title: &str) -> Result<Todo, ClientError> {
        let response = self
            .http
            .post(self.base_url.clone())
            .json(&CreateTodo { title })
            .send()
            .await?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn find_todo(&self, title: &str) -> Result<Todo, ClientError> {
        let response = self
            .http
            .get(self.url("find"))
            .query(&[("title", title)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::TodoNotFound(title.to_string()));
        }
        Ok(response.error_for_status()?.json().await?)
    }

    /// Finds the todo by title and marks it complete.
    pub async fn mark_complete(&self, title: &str) -> Result<(), ClientError> {
        let todo = self.find_todo(title).await?;
        let response = self
            .http
            .put(self.url(&format!("{}/mark-complete", todo.id)))
            .send()
            .await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => Err(ClientError::UnexpectedStatus(status)),
        }
    }

    /// Deletes every todo; requires an admin bearer token.
    pub async fn delete_all_todos(&self) -> Result<u64, ClientError> {
        let token = self.auth_token.as_ref().ok_or(ClientError::MissingToken)?;
        let response = self
            .http
            .delete(self.url("delete-all"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;
        Ok(response.error_for_status()?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_address_gets_a_trailing_slash() {
        let client = TodoApiClient::new("http://localhost:5079/api/todos").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5079/api/todos/");
        assert_eq!(
            client.url("incomplete").as_str(),
            "http://localhost:5079/api/todos/incomplete"
        );
    }

    #[test]
    fn garbage_base_address_is_rejected() {
        assert!(matches!(
            TodoApiClient::new("not a url"),
            Err(ClientError::InvalidBaseAddress(_))
        ));
    }

    #[test]
    fn auth_token_is_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(AUTH_TOKEN_FILE), "abc.def.ghi\n").unwrap();
        assert_eq!(auth_token_from(dir.path()).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_auth_token_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            auth_token_from(dir.path()),
            Err(ClientError::MissingToken)
        ));
    }
}
