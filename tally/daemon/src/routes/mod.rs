//! HTTP Routes
//!
//! ```text
//! GET  /stream-resource   timer event stream (text/event-stream)
//! GET  /example-api/get   visit counter
//! POST /example-api/post  JSON echo
//! GET  /users             list users
//! POST /users             form action: create | delete
//! GET  /users/:id         one user
//! POST /users/:id         form update
//! GET  /health            liveness and stream statistics
//! ```

mod example;
mod health;
mod stream;
mod users;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stream-resource", get(stream::stream_resource))
        .route("/example-api/get", get(example::get_example))
        .route("/example-api/post", post(example::post_example))
        .route("/users", get(users::list_users).post(users::user_action))
        .route("/users/:id", get(users::get_user).post(users::update_user))
        .route("/health", get(health::health))
        .with_state(state)
}
