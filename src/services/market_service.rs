use std::collections::BTreeSet;

use serde_json::Value;

use crate::{
    models::{CoinQuote, GlobalMetrics},
    services::coinmarketcap::ProviderError,
    AppState,
};

/// `"btc, eth,,SOL"` -> `["BTC", "ETH", "SOL"]`, request order kept.
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Quote for a single symbol, `None` when the provider does not know it.
pub async fn quote(
    state: &AppState,
    symbol: &str,
    currency: &str,
) -> Result<Option<CoinQuote>, ProviderError> {
    let symbols = BTreeSet::from([symbol.to_string()]);
    let mut quotes = state.market.quotes(&symbols, currency).await?;
    Ok(quotes.remove(symbol))
}

/// Quotes in request order; unknown symbols are dropped.
pub async fn quotes(
    state: &AppState,
    symbols: &[String],
    currency: &str,
) -> Result<Vec<CoinQuote>, ProviderError> {
    let wanted: BTreeSet<String> = symbols.iter().cloned().collect();
    let found = state.market.quotes(&wanted, currency).await?;

    Ok(symbols
        .iter()
        .filter_map(|s| found.get(s).cloned())
        .collect())
}

pub async fn global_metrics(state: &AppState, currency: &str) -> Result<GlobalMetrics, ProviderError> {
    state.market.global_metrics(currency).await
}

pub async fn listings(state: &AppState, limit: u32, currency: &str) -> Result<Value, ProviderError> {
    state.market.listings(limit, currency).await
}
