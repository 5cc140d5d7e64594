pub mod admin;
pub mod public;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::CorsOrigins;
use crate::db::AppState;
use crate::models::{Acceptance, Decision};

/// Plain `{status, message}` body for admin acknowledgements.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

/// Body for validate and auto-login. Rejections still answer 200 with
/// `status: "error"` so existing clients keep working.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Machine-readable outcome, e.g. `bound_now` or `hwid_mismatch`
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        let message = decision.message();
        match decision {
            Decision::Accepted(acceptance) => {
                let (result, key) = match acceptance {
                    Acceptance::BoundNow => ("bound_now", None),
                    Acceptance::AlreadyBound => ("already_bound", None),
                    Acceptance::Login { key } => ("login", Some(key)),
                };
                Self {
                    status: "success",
                    message,
                    result: result.to_string(),
                    key,
                }
            }
            Decision::Rejected(reason) => Self {
                status: "error",
                message,
                result: reason.as_ref().to_string(),
                key: None,
            },
        }
    }
}

/// Every route, without state or layers.
pub fn router() -> Router<AppState> {
    Router::new().merge(public::router()).merge(admin::router())
}

/// CORS policy: any origin unless an explicit list is configured.
pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}
