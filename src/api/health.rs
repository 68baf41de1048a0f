use axum::{Extension, response::Json};
use serde_json::{Value, json};

use super::CallbackState;

pub async fn health(Extension(state): Extension<CallbackState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "awaiting_login": !state.redirects.is_closed(),
    }))
}
