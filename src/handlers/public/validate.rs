use axum::{extract::State, http::HeaderMap};
use serde::Deserialize;

use crate::db::AppState;
use crate::engine;
use crate::error::Result;
use crate::extractors::Json;
use crate::handlers::DecisionResponse;
use crate::util::{client_ip, now};

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub key: String,
    pub hwid: String,
    /// Display name recorded on the key if it has none yet
    #[serde(default)]
    pub name: Option<String>,
}

/// POST /validate - check a key for a device, binding the device on first use.
pub async fn validate_license(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<DecisionResponse>> {
    let conn = state.db.get()?;

    let decision = engine::validate(&conn, &req.key, &req.hwid, req.name.as_deref(), now())?;

    tracing::debug!(
        ip = client_ip(&headers).as_deref().unwrap_or("-"),
        accepted = decision.is_accepted(),
        "validate: {}",
        decision.message()
    );

    Ok(Json(decision.into()))
}
