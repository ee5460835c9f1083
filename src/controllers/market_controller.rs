use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    controllers::{detail, provider_error},
    services::market_service,
    AppState,
};

#[derive(Deserialize)]
pub struct ConvertQuery {
    pub convert: Option<String>,
}

#[derive(Deserialize)]
pub struct ListingsQuery {
    pub limit: Option<u32>,
    pub convert: Option<String>,
}

#[derive(Deserialize)]
pub struct QuoteQuery {
    pub symbol: Option<String>,
    pub convert: Option<String>,
}

#[derive(Deserialize)]
pub struct QuotesQuery {
    pub symbols: Option<String>,
    pub convert: Option<String>,
}

// GET /api/global
pub async fn get_global(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> Response {
    let currency = state.settings.currency_or_default(query.convert.as_deref());

    match market_service::global_metrics(&state, &currency).await {
        Ok(g) => (StatusCode::OK, Json(g)).into_response(),
        Err(e) => provider_error(e),
    }
}

// GET /api/listings
pub async fn get_listings(
    State(state): State<AppState>,
    query: Result<Query<ListingsQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return detail(rejection.status(), rejection.body_text()),
    };
    let currency = state.settings.currency_or_default(query.convert.as_deref());
    let limit = query.limit.unwrap_or(300).clamp(1, 5000);

    match market_service::listings(&state, limit, &currency).await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(e) => provider_error(e),
    }
}

// GET /api/quote?symbol=BTC
pub async fn get_quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Response {
    let currency = state.settings.currency_or_default(query.convert.as_deref());
    let symbol = query.symbol.unwrap_or_default().trim().to_uppercase();
    if symbol.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "symbol is required");
    }

    match market_service::quote(&state, &symbol, &currency).await {
        Ok(Some(q)) => (StatusCode::OK, Json(q)).into_response(),
        Ok(None) => detail(StatusCode::NOT_FOUND, format!("No quote for {symbol}")),
        Err(e) => provider_error(e),
    }
}

// GET /api/quotes?symbols=BTC,ETH
pub async fn get_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuotesQuery>,
) -> Response {
    let currency = state.settings.currency_or_default(query.convert.as_deref());
    let symbols = market_service::parse_symbol_list(query.symbols.as_deref().unwrap_or_default());
    if symbols.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "symbols is required (comma-separated)");
    }

    match market_service::quotes(&state, &symbols, &currency).await {
        Ok(data) => (StatusCode::OK, Json(json!({ "currency": currency, "data": data }))).into_response(),
        Err(e) => provider_error(e),
    }
}
