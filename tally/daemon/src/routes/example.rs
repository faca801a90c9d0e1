//! `/example-api/*`: demo endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// Count the visit and report the running total
pub async fn get_example(State(state): State<AppState>) -> Json<Value> {
    let count = state.record_visit();
    Json(json!({
        "message": "This is response for GET method API",
        "count": count,
    }))
}

/// Echo the JSON body back under `data`
pub async fn post_example(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(data) = body?;
    Ok(Json(json!({ "data": data })))
}
