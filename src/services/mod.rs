pub mod coinmarketcap;
pub mod alert_rules;
pub mod alerts_store;

pub mod alerts_service;
pub mod market_service;
