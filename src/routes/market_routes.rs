use axum::{Router, routing::get};
use crate::{AppState, controllers::market_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/global", get(market_controller::get_global))
        .route("/api/listings", get(market_controller::get_listings))
        .route("/api/quote", get(market_controller::get_quote))
        .route("/api/quotes", get(market_controller::get_quotes))
}
