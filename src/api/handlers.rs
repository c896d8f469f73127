//! HTTP request handlers.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use super::error::ApiError;
use crate::core::Conversion;

/// Smallest amount accepted over HTTP.
pub const MIN_AMOUNT: f64 = 0.01;

/// Raw query string of `GET /api/v1/convert`; every field is checked by hand
/// so the error can name it.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct ConvertRequest {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{field}: field is required"))),
    }
}

fn currency_field(field: &str, value: &Option<String>) -> Result<String, ApiError> {
    let value = required(field, value)?;
    if value.chars().count() != 3 {
        return Err(ApiError::BadRequest(format!(
            "{field}: must be exactly 3 characters, got {value:?}"
        )));
    }
    Ok(value.to_string())
}

impl ConvertParams {
    pub fn validate(&self) -> Result<ConvertRequest, ApiError> {
        let from = currency_field("from", &self.from)?;
        let to = currency_field("to", &self.to)?;
        let raw_amount = required("amount", &self.amount)?;
        let amount: f64 = raw_amount
            .parse()
            .ok()
            .filter(|a: &f64| a.is_finite())
            .ok_or_else(|| ApiError::BadRequest(format!("amount: not a number: {raw_amount:?}")))?;
        if amount < MIN_AMOUNT {
            return Err(ApiError::BadRequest(format!(
                "amount: must be at least {MIN_AMOUNT}, got {amount}"
            )));
        }
        Ok(ConvertRequest { from, to, amount })
    }
}

/// GET /api/v1/convert - Convert an amount between two currencies.
pub async fn convert(
    State(state): State<AppState>,
    params: Result<Query<ConvertParams>, QueryRejection>,
) -> Result<Json<Conversion>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = params.validate()?;
    debug!(?request, "Convert request");

    let ctx = state.root.child(Some(state.request_timeout));
    let conversion = state
        .service
        .convert(&ctx, &request.from, &request.to, request.amount)
        .await?;
    Ok(Json(conversion))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheHealth {
    pub backend: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub cache: CacheHealth,
    pub timestamp: String,
}

/// GET /health - Liveness plus cache reachability; a down cache is not unhealthy.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache_status = match state.store.health_check().await {
        Ok(()) => "up",
        Err(e) => {
            debug!(error = %e, "Cache health check failed");
            "down"
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: CacheHealth {
            backend: state.store.name().to_string(),
            status: cache_status.to_string(),
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
