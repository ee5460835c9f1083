use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::{alerts_store::StoreError, coinmarketcap::ProviderError};

pub mod home_controller;
pub mod market_controller;
pub mod alerts_controller;

/// `{"detail": msg}` error body, the shape clients read messages from.
pub fn detail(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": msg.into() }))).into_response()
}

fn provider_error(e: ProviderError) -> Response {
    tracing::warn!(error = %e, "market data request failed");
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    detail(status, e.to_string())
}

fn store_error(e: StoreError) -> Response {
    tracing::error!(error = %e, "alert store write failed");
    detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
