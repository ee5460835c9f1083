//! Pure alert logic: reducing stored records to the canonical [`Alert`]
//! and checking a canonical alert against a quote.
//!
//! Stored records may predate the current schema. Older ones encode type and
//! direction jointly (`"price_above"`, `"pct24_below"`) and carry no `op`.
//! Normalization happens at read time and never rewrites the file.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::{Alert, AlertKind, AlertOp, QuoteFields, Trigger};

/// A JSON number, or a string holding one, as a finite `f64`.
pub fn as_finite_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Splits a legacy `<base>_above` / `<base>_below` type.
fn split_legacy(kind: &str) -> Option<(AlertKind, AlertOp)> {
    let (base, direction) = kind.rsplit_once('_')?;
    let kind = AlertKind::parse(base)?;
    let op = match direction {
        "above" => AlertOp::Above,
        "below" => AlertOp::Below,
        _ => return None,
    };
    Some((kind, op))
}

/// Stored ids may be strings or numbers; both read as the same string.
pub fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonical form of a stored record, or `None` when the record cannot be
/// interpreted as an alert.
pub fn normalize(raw: &Value) -> Option<Alert> {
    let obj = raw.as_object()?;

    let symbol = obj
        .get("symbol")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())?;

    let kind = obj.get("type").and_then(Value::as_str)?;
    let op = obj.get("op").filter(|v| !v.is_null());

    let (kind, op) = match op {
        None => split_legacy(kind)?,
        Some(op) => (AlertKind::parse(kind)?, AlertOp::parse(op.as_str()?)?),
    };

    let value = obj.get("value").and_then(as_finite_f64)?;

    Some(Alert {
        id: obj.get("id").and_then(id_string),
        symbol,
        kind,
        op,
        value,
        created_at: obj
            .get("created_at")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

pub fn evaluate(alert: &Alert, quote: &QuoteFields) -> Option<Trigger> {
    evaluate_at(alert, quote, Utc::now())
}

/// Same as [`evaluate`] with an explicit clock.
pub fn evaluate_at(alert: &Alert, quote: &QuoteFields, now: DateTime<Utc>) -> Option<Trigger> {
    let current = match alert.kind {
        AlertKind::Price => quote.price,
        AlertKind::Pct24 => quote.percent_change_24h,
    }
    .filter(|c| c.is_finite())?;

    if !alert.op.matches(current, alert.value) {
        return None;
    }

    let unit = alert.kind.unit();
    let message = format!(
        "{} {} is {:.2}{unit} {} {:.2}{unit}",
        alert.symbol,
        alert.kind.label(),
        current,
        alert.op.as_str(),
        alert.value,
    );

    Some(Trigger {
        time: now.format("%H:%M").to_string(),
        symbol: alert.symbol.clone(),
        kind: alert.kind,
        message,
        current,
        op: alert.op,
        value: alert.value,
        id: alert.id.clone(),
    })
}
