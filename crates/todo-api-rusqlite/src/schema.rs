// Struct representing the request body for creating a new Todo
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct CreateTodoSchema {
    pub title: String,
    #[serde(default)]
    pub is_complete: bool,
}

// Struct representing the request body for updating a Todo
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct UpdateTodoSchema {
    pub title: String,
    pub is_complete: bool,
}

// Query parameters for the find route
#[derive(Debug, serde::Deserialize)]
pub struct FindTodoParams {
    pub title: String,
    pub is_complete: Option<bool>,
}
