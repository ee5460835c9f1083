use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{controllers::home_controller, AppState};

pub mod home_routes;
pub mod market_routes;
pub mod alerts_routes;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = market_routes::add_routes(router);
    let router = alerts_routes::add_routes(router);

    router
        .fallback(home_controller::not_found)
        .layer(cors_layer(&state.settings.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
