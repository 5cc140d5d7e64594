mod keys;

pub use keys::*;

use axum::{
    Router,
    routing::{get, post},
};

use crate::db::AppState;

/// Key management routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/keys", get(list_keys))
        .route("/generate", post(generate_keys))
        .route("/extend", post(extend_key))
        .route("/compensate", post(compensate_keys))
        .route("/enable", post(enable_key))
        .route("/disable", post(disable_key))
        .route("/delete", post(delete_key))
        .route("/set-name", post(set_key_name))
}
