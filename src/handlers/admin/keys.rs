use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::engine;
use crate::error::Result;
use crate::extractors::Json;
use crate::handlers::StatusResponse;
use crate::models::{DurationPolicy, LicenseKey};
use crate::util::now;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub count: i64,
    /// Days until the batch expires. Absent or null mints keys that never expire.
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub status: &'static str,
    pub message: String,
    pub new_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub key: String,
    pub days: i64,
}

#[derive(Debug, Serialize)]
pub struct ExtendResponse {
    pub status: &'static str,
    pub message: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompensateRequest {
    pub days: i64,
}

#[derive(Debug, Serialize)]
pub struct CompensateResponse {
    pub status: &'static str,
    pub message: String,
    pub updated: usize,
}

#[derive(Debug, Deserialize)]
pub struct SetNameRequest {
    pub key: String,
    pub name: String,
}

/// GET /keys - every key with its binding, expiry and state.
pub async fn list_keys(State(state): State<AppState>) -> Result<Json<Vec<LicenseKey>>> {
    let conn = state.db.get()?;
    Ok(Json(engine::list(&conn)?))
}

/// POST /generate - mint a batch of keys sharing one expiry.
pub async fn generate_keys(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    let mut conn = state.db.get()?;

    let new_keys = engine::generate(
        &mut conn,
        req.count,
        DurationPolicy::from_days(req.days),
        state.max_generate_count,
        now(),
    )?;

    Ok(Json(GenerateResponse {
        status: "success",
        message: format!("Generated {} license key(s)", new_keys.len()),
        new_keys,
    }))
}

/// POST /extend - move one key's expiry by a number of days.
pub async fn extend_key(
    State(state): State<AppState>,
    Json(req): Json<ExtendRequest>,
) -> Result<Json<ExtendResponse>> {
    let mut conn = state.db.get()?;
    let expires_at = engine::extend(&mut conn, &req.key, req.days, now())?;

    Ok(Json(ExtendResponse {
        status: "success",
        message: format!("License key extended by {} day(s)", req.days),
        expires_at,
    }))
}

/// POST /compensate - extend every active, expiring key at once.
pub async fn compensate_keys(
    State(state): State<AppState>,
    Json(req): Json<CompensateRequest>,
) -> Result<Json<CompensateResponse>> {
    let mut conn = state.db.get()?;
    let updated = engine::compensate(&mut conn, req.days)?;

    Ok(Json(CompensateResponse {
        status: "success",
        message: format!("Compensated {} license key(s) by {} day(s)", updated, req.days),
        updated,
    }))
}

/// POST /enable
pub async fn enable_key(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<StatusResponse>> {
    let conn = state.db.get()?;
    engine::enable(&conn, &req.key)?;
    Ok(Json(StatusResponse::success("License key enabled")))
}

/// POST /disable
pub async fn disable_key(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<StatusResponse>> {
    let conn = state.db.get()?;
    engine::disable(&conn, &req.key)?;
    Ok(Json(StatusResponse::success("License key disabled")))
}

/// POST /delete - hard delete; the bound HWID becomes free.
pub async fn delete_key(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<StatusResponse>> {
    let conn = state.db.get()?;
    engine::delete(&conn, &req.key)?;
    Ok(Json(StatusResponse::success("License key deleted")))
}

/// POST /set-name - overwrite the key's display name.
pub async fn set_key_name(
    State(state): State<AppState>,
    Json(req): Json<SetNameRequest>,
) -> Result<Json<StatusResponse>> {
    let conn = state.db.get()?;
    engine::set_name(&conn, &req.key, &req.name)?;
    Ok(Json(StatusResponse::success("License key name updated")))
}
