use axum::{extract::State, http::HeaderMap};
use serde::Deserialize;

use crate::db::AppState;
use crate::engine;
use crate::error::Result;
use crate::extractors::Json;
use crate::handlers::DecisionResponse;
use crate::util::{client_ip, now};

#[derive(Debug, Deserialize)]
pub struct AutoLoginRequest {
    pub hwid: String,
}

/// POST /auto-login - log in by HWID alone (no key input).
pub async fn auto_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AutoLoginRequest>,
) -> Result<Json<DecisionResponse>> {
    let conn = state.db.get()?;

    let decision = engine::auto_login(&conn, &req.hwid, now())?;

    tracing::debug!(
        ip = client_ip(&headers).as_deref().unwrap_or("-"),
        accepted = decision.is_accepted(),
        "auto-login: {}",
        decision.message()
    );

    Ok(Json(decision.into()))
}
