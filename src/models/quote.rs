use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Trigger;

/// The two quote fields alerts can watch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteFields {
    pub price: Option<f64>,
    pub percent_change_24h: Option<f64>,
}

/// Uppercase symbol -> quote fields, fetched fresh for every check.
pub type QuoteSnapshot = HashMap<String, QuoteFields>;

/// One coin quote as returned by the provider, already reduced to a single
/// conversion currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinQuote {
    pub symbol: String,
    pub name: Option<String>,
    pub currency: String,
    pub price: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub last_updated: Option<String>,
}

impl CoinQuote {
    pub fn fields(&self) -> QuoteFields {
        QuoteFields {
            price: self.price,
            percent_change_24h: self.percent_change_24h,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub currency: String,
    pub btc_dominance: Option<f64>,
    pub eth_dominance: Option<f64>,
    pub total_market_cap: Option<f64>,
    pub total_volume_24h: Option<f64>,
    pub last_updated: Option<String>,
}

/// Response of `GET /api/alerts/check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub triggered: Vec<Trigger>,
    pub checked: usize,
    pub currency: String,
}
