//! `/users` and `/users/:id`
//!
//! Both POST routes take `application/x-www-form-urlencoded` bodies with the
//! same field names the HTML forms used. `POST /users` dispatches on the
//! `action` field.

use axum::extract::rejection::{FormRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tally_core::{NewUser, UserPatch};
use tracing::{debug, info};

use crate::error::AppError;
use crate::state::AppState;

/// Body of `POST /users`
#[derive(Debug, Default, Deserialize)]
pub struct UserActionForm {
    /// `create` or `delete`
    #[serde(default)]
    pub action: Option<String>,
    /// Name for `create`
    #[serde(default)]
    pub name: Option<String>,
    /// Email for `create`
    #[serde(default)]
    pub email: Option<String>,
    /// User ID for `delete`
    #[serde(default)]
    pub id: Option<String>,
}

/// Body of `POST /users/:id`
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdateForm {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New email
    #[serde(default)]
    pub email: Option<String>,
}

/// All users ordered by name
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let users = state
        .users
        .list()
        .await
        .map_err(AppError::store("fetch users"))?;
    Ok(Json(json!({ "users": users })))
}

/// Create or delete a user depending on `action`
pub async fn user_action(
    State(state): State<AppState>,
    form: Result<Form<UserActionForm>, FormRejection>,
) -> Result<Json<Value>, AppError> {
    let Form(form) = form?;

    match form.action.as_deref() {
        Some("create") => {
            let new_user = NewUser::new(
                form.name.unwrap_or_default(),
                form.email.unwrap_or_default(),
            );
            let user = state
                .users
                .create(new_user)
                .await
                .map_err(AppError::store("perform action"))?;
            info!(id = user.id, "User created");
            Ok(Json(json!({ "user": user })))
        }
        Some("delete") => {
            let id = parse_id(form.id.as_deref())?;
            let removed = state
                .users
                .delete(id)
                .await
                .map_err(AppError::store("perform action"))?;
            if removed {
                info!(id, "User deleted");
            } else {
                debug!(id, "Delete of unknown user ignored");
            }
            Ok(Json(json!({ "success": true })))
        }
        _ => Err(AppError::InvalidAction),
    }
}

/// One user by ID
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    let user = state
        .users
        .get(id)
        .await
        .map_err(AppError::store("fetch user"))?
        .ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "user": user })))
}

/// Update a user's name and email
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    form: Result<Form<UserUpdateForm>, FormRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    let Form(form) = form?;

    let patch = UserPatch {
        name: form.name,
        email: form.email,
        age: None,
    };
    let user = state
        .users
        .update(id, patch)
        .await
        .map_err(AppError::store("update user"))?
        .ok_or(AppError::NotFound)?;
    info!(id, "User updated");
    Ok(Json(json!({ "user": user })))
}

fn parse_id(raw: Option<&str>) -> Result<i64, AppError> {
    raw.and_then(|id| id.trim().parse().ok())
        .ok_or_else(|| AppError::MalformedPayload("id must be an integer".into()))
}
