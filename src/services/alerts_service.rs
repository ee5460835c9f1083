use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    models::{Alert, CheckReport, NewAlert, QuoteSnapshot, Trigger},
    services::{
        alert_rules,
        alerts_store::StoreError,
        coinmarketcap::{MarketData, ProviderError},
    },
    AppState,
};

const MAX_SYMBOL_LEN: usize = 15;

#[derive(Debug, Error)]
pub enum CreateAlertError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stored alert could not be read back")]
    Unreadable,
}

/// Boundary checks for a create request. Returns a user-facing message.
pub fn validate_new_alert(alert: &NewAlert) -> Result<(), String> {
    let len = alert.symbol.chars().count();
    if alert.symbol.trim().is_empty() || len > MAX_SYMBOL_LEN {
        return Err(format!("symbol must be 1-{MAX_SYMBOL_LEN} characters"));
    }
    if !alert.value.is_finite() {
        return Err("value must be a finite number".to_string());
    }
    Ok(())
}

/// All stored alerts in canonical form. Records that fail normalization are
/// left out.
pub async fn list_alerts(state: &AppState) -> Vec<Alert> {
    state
        .alerts
        .list()
        .await
        .iter()
        .filter_map(alert_rules::normalize)
        .collect()
}

pub async fn create_alert(state: &AppState, alert: NewAlert) -> Result<Alert, CreateAlertError> {
    let mut candidate = Map::new();
    candidate.insert("symbol".to_string(), Value::from(alert.symbol.trim().to_uppercase()));
    candidate.insert("type".to_string(), Value::from(alert.kind.as_str()));
    candidate.insert("op".to_string(), Value::from(alert.op.as_str()));
    candidate.insert("value".to_string(), Value::from(alert.value));

    let stored = state.alerts.add(candidate).await?;
    let alert = alert_rules::normalize(&Value::Object(stored)).ok_or(CreateAlertError::Unreadable)?;

    tracing::info!(id = ?alert.id, symbol = %alert.symbol, "alert created");
    Ok(alert)
}

/// Returns false when no alert had that id.
pub async fn delete_alert(state: &AppState, id: &str) -> Result<bool, StoreError> {
    let removed = state.alerts.delete(id).await?;
    if removed {
        tracing::info!(id, "alert deleted");
    }
    Ok(removed)
}

/// Distinct uppercase symbols across raw records, sorted.
pub fn distinct_symbols(records: &[Value]) -> BTreeSet<String> {
    records
        .iter()
        .filter_map(|r| r.get("symbol").and_then(Value::as_str))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

async fn fetch_snapshot(
    market: &dyn MarketData,
    symbols: &BTreeSet<String>,
    currency: &str,
) -> Result<QuoteSnapshot, ProviderError> {
    if symbols.is_empty() {
        return Ok(QuoteSnapshot::new());
    }

    let quotes = market.quotes(symbols, currency).await?;
    Ok(quotes
        .into_iter()
        .map(|(sym, q)| (sym.to_uppercase(), q.fields()))
        .collect())
}

fn check_one(raw: &Value, snapshot: &QuoteSnapshot) -> Option<Trigger> {
    let alert = alert_rules::normalize(raw)?;
    let quote = snapshot.get(&alert.symbol)?;
    alert_rules::evaluate(&alert, quote)
}

/// Evaluates every stored alert against one fresh quote snapshot.
///
/// Only a provider failure aborts the check. Malformed records and symbols
/// the provider does not know are skipped, but still count as checked.
pub async fn check_alerts(state: &AppState, currency: &str) -> Result<CheckReport, ProviderError> {
    let records = state.alerts.list().await;
    if records.is_empty() {
        return Ok(CheckReport {
            triggered: Vec::new(),
            checked: 0,
            currency: currency.to_string(),
        });
    }

    let symbols = distinct_symbols(&records);
    let snapshot = fetch_snapshot(state.market.as_ref(), &symbols, currency).await?;

    let triggered: Vec<Trigger> = records
        .iter()
        .filter_map(|raw| check_one(raw, &snapshot))
        .collect();

    tracing::info!(
        checked = records.len(),
        triggered = triggered.len(),
        currency,
        "alerts checked"
    );

    Ok(CheckReport {
        triggered,
        checked: records.len(),
        currency: currency.to_string(),
    })
}
