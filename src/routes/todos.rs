use crate::{
    auth::CurrentIdentity,
    error::AppError,
    models::{TodoForm, TodoInput},
    routes::{redirect, DASHBOARD_PATH},
    state::AppState,
    views::{render, DashboardPage},
};
use actix_web::{get, http::StatusCode, post, web, HttpResponse};

/// Renders the todo list of the active identity.
#[get("/dashboard", wrap = "crate::auth::RequireIdentity")]
pub async fn dashboard(
    state: web::Data<AppState>,
    identity: CurrentIdentity,
) -> Result<HttpResponse, AppError> {
    let todos = state.todos.list(&identity.owner_key()).await?;
    render(
        StatusCode::OK,
        &DashboardPage::new(todos, state.strategy.uses_session()),
    )
}

/// Creates a todo from the posted `title`.
///
/// ## Responses:
/// - `303 See Other` to `/dashboard` once the todo is stored.
/// - `400 Bad Request` if the title is empty, blank or longer than 200 characters.
///
/// The notification email is sent after the insert; its outcome never
/// changes the response.
#[post("/add_todo", wrap = "crate::auth::RequireIdentity")]
pub async fn add_todo(
    state: web::Data<AppState>,
    identity: CurrentIdentity,
    form: web::Form<TodoForm>,
) -> Result<HttpResponse, AppError> {
    let owner = identity.owner_key();
    let todo = state
        .todos
        .create(&owner, TodoInput::from(form.into_inner()))
        .await?;
    log::info!("Todo {} created for {}", todo.id, owner);

    state.notifier.todo_created(&identity, &todo.title).await;

    Ok(redirect(DASHBOARD_PATH))
}

/// Flips the completion flag of one of the identity's todos.
///
/// ## Responses:
/// - `303 See Other` to `/dashboard`.
/// - `404 Not Found` if no todo with this id belongs to the identity.
#[post("/toggle_todo/{id}", wrap = "crate::auth::RequireIdentity")]
pub async fn toggle_todo(
    state: web::Data<AppState>,
    identity: CurrentIdentity,
    todo_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let todo = state
        .todos
        .toggle(&identity.owner_key(), todo_id.into_inner())
        .await?;
    log::debug!("Todo {} completed={}", todo.id, todo.completed);
    Ok(redirect(DASHBOARD_PATH))
}

/// Permanently deletes one of the identity's todos.
///
/// ## Responses:
/// - `303 See Other` to `/dashboard`.
/// - `404 Not Found` if no todo with this id belongs to the identity.
#[post("/delete_todo/{id}", wrap = "crate::auth::RequireIdentity")]
pub async fn delete_todo(
    state: web::Data<AppState>,
    identity: CurrentIdentity,
    todo_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let todo_id = todo_id.into_inner();
    state.todos.delete(&identity.owner_key(), todo_id).await?;
    log::info!("Todo {} deleted", todo_id);
    Ok(redirect(DASHBOARD_PATH))
}
