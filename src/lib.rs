//! Library entrypoint for EasyStonks.
//!
//! Split from `main.rs` so integration tests under `tests/` can build the
//! router against their own app state.

use std::sync::Arc;

pub mod config;
pub mod models;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub market: Arc<dyn services::coinmarketcap::MarketData>,
    pub alerts: Arc<dyn services::alerts_store::AlertStore>,
}
