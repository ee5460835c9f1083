use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{controllers::detail, AppState};

pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

// Lets a deployment confirm its env and CORS config. No secrets.
pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "currency_default": state.settings.cmc_currency,
        "cors_origins": state.settings.allowed_origins,
        "has_cmc_key": state.settings.has_cmc_key(),
    }))
}

pub async fn not_found() -> impl IntoResponse {
    detail(StatusCode::NOT_FOUND, "Not Found")
}
