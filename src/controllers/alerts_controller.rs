use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    controllers::{detail, provider_error, store_error},
    models::NewAlert,
    services::alerts_service::{self, CreateAlertError},
    AppState,
};

// Bad field values are 422; content-type and syntax errors keep axum's status.
fn json_rejection(rejection: JsonRejection) -> Response {
    let status = match &rejection {
        JsonRejection::JsonDataError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        other => other.status(),
    };
    detail(status, rejection.body_text())
}

#[derive(Deserialize)]
pub struct CheckQuery {
    pub convert: Option<String>,
}

// GET /api/alerts
pub async fn get_alerts(State(state): State<AppState>) -> Response {
    let alerts = alerts_service::list_alerts(&state).await;
    (StatusCode::OK, Json(alerts)).into_response()
}

// POST /api/alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    payload: Result<Json<NewAlert>, JsonRejection>,
) -> Response {
    let Json(new_alert) = match payload {
        Ok(p) => p,
        Err(rejection) => return json_rejection(rejection),
    };

    if let Err(msg) = alerts_service::validate_new_alert(&new_alert) {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, msg);
    }

    match alerts_service::create_alert(&state, new_alert).await {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(CreateAlertError::Store(e)) => store_error(e),
        Err(e) => {
            tracing::error!(error = %e, "created alert failed to normalize");
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// DELETE /api/alerts/:id
pub async fn delete_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match alerts_service::delete_alert(&state, &id).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Ok(false) => detail(StatusCode::NOT_FOUND, "Alert not found"),
        Err(e) => store_error(e),
    }
}

// GET /api/alerts/check
pub async fn get_check_alerts(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Response {
    let currency = state.settings.currency_or_default(query.convert.as_deref());

    match alerts_service::check_alerts(&state, &currency).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => provider_error(e),
    }
}
