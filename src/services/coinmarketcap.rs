use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use thiserror::Error;

use crate::{
    config::Settings,
    models::{CoinQuote, GlobalMetrics},
    services::alert_rules::as_finite_f64,
};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Missing COINMARKETCAP_API_KEY in environment")]
    MissingKey,

    #[error("CMC request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Malformed(String),
}

impl ProviderError {
    /// HTTP status the failure should be reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingKey => 500,
            Self::Network(_) | Self::Malformed(_) => 502,
            Self::Status { status, .. } => *status,
        }
    }
}

/// The market-data collaborator. Implemented by [`CoinMarketCapClient`];
/// tests substitute their own.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Batched quote fetch. Symbols the provider does not know are omitted
    /// from the result. Keys are uppercase symbols.
    async fn quotes(
        &self,
        symbols: &BTreeSet<String>,
        currency: &str,
    ) -> Result<HashMap<String, CoinQuote>, ProviderError>;

    async fn global_metrics(&self, currency: &str) -> Result<GlobalMetrics, ProviderError>;

    /// Raw listings payload, passed through untouched.
    async fn listings(&self, limit: u32, currency: &str) -> Result<Value, ProviderError>;
}

#[derive(Clone)]
pub struct CoinMarketCapClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl CoinMarketCapClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        Self::new(
            settings.cmc_api_key.clone(),
            settings.cmc_base_url.clone(),
            Duration::from_secs(settings.cmc_timeout_secs),
        )
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ProviderError> {
        if !self.has_key() {
            return Err(ProviderError::MissingKey);
        }

        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(&url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|_| ProviderError::Malformed("CMC returned non-JSON response".to_string()))
    }
}

#[async_trait]
impl MarketData for CoinMarketCapClient {
    async fn quotes(
        &self,
        symbols: &BTreeSet<String>,
        currency: &str,
    ) -> Result<HashMap<String, CoinQuote>, ProviderError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let joined = symbols.iter().cloned().collect::<Vec<_>>().join(",");
        tracing::debug!(symbols = %joined, currency, "fetching CMC quotes");

        let payload = self
            .get_json(
                "/v1/cryptocurrency/quotes/latest",
                &[("convert", currency.to_string()), ("symbol", joined)],
            )
            .await?;

        parse_quotes(&payload, currency)
    }

    async fn global_metrics(&self, currency: &str) -> Result<GlobalMetrics, ProviderError> {
        let payload = self
            .get_json(
                "/v1/global-metrics/quotes/latest",
                &[("convert", currency.to_string())],
            )
            .await?;

        parse_global(&payload, currency)
    }

    async fn listings(&self, limit: u32, currency: &str) -> Result<Value, ProviderError> {
        self.get_json(
            "/v1/cryptocurrency/listings/latest",
            &[("convert", currency.to_string()), ("limit", limit.to_string())],
        )
        .await
    }
}

/// Best human-readable message from a non-success CMC body.
fn error_message(body: &str) -> String {
    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    payload
        .pointer("/status/error_message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("message").and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn data_object<'a>(payload: &'a Value) -> Result<&'a serde_json::Map<String, Value>, ProviderError> {
    let data = payload.get("data").unwrap_or(&Value::Null);
    data.as_object().ok_or_else(|| {
        ProviderError::Malformed(format!(
            "Unexpected CMC response shape. data_type={}",
            json_type_name(data)
        ))
    })
}

fn opt_string(v: &Value) -> Option<String> {
    v.as_str().map(str::to_string)
}

/// Reshapes a `quotes/latest` payload into one entry per symbol.
pub fn parse_quotes(payload: &Value, currency: &str) -> Result<HashMap<String, CoinQuote>, ProviderError> {
    let data = data_object(payload)?;

    let mut out = HashMap::with_capacity(data.len());
    for (key, entry) in data {
        // v2 responses carry an array of matches per symbol
        let entry = match entry {
            Value::Array(items) => match items.first() {
                Some(first) => first,
                None => continue,
            },
            other => other,
        };
        if !entry.is_object() {
            continue;
        }

        let symbol = key.trim().to_uppercase();
        let quote = entry
            .get("quote")
            .and_then(|q| q.get(currency))
            .unwrap_or(&Value::Null);

        out.insert(
            symbol.clone(),
            CoinQuote {
                symbol,
                name: entry.get("name").and_then(opt_string),
                currency: currency.to_string(),
                price: quote.get("price").and_then(as_finite_f64),
                percent_change_24h: quote.get("percent_change_24h").and_then(as_finite_f64),
                market_cap: quote.get("market_cap").and_then(as_finite_f64),
                last_updated: quote.get("last_updated").and_then(opt_string),
            },
        );
    }

    Ok(out)
}

pub fn parse_global(payload: &Value, currency: &str) -> Result<GlobalMetrics, ProviderError> {
    let data = data_object(payload)?;
    let quote = data
        .get("quote")
        .and_then(|q| q.get(currency))
        .unwrap_or(&Value::Null);

    let last_updated = quote
        .get("last_updated")
        .and_then(opt_string)
        .or_else(|| data.get("last_updated").and_then(opt_string));

    Ok(GlobalMetrics {
        currency: currency.to_string(),
        btc_dominance: data.get("btc_dominance").and_then(as_finite_f64),
        eth_dominance: data.get("eth_dominance").and_then(as_finite_f64),
        total_market_cap: quote.get("total_market_cap").and_then(as_finite_f64),
        total_volume_24h: quote.get("total_volume_24h").and_then(as_finite_f64),
        last_updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quotes_are_keyed_by_uppercase_symbol() {
        let payload = json!({
            "status": { "error_code": 0 },
            "data": {
                "btc": {
                    "name": "Bitcoin",
                    "quote": { "USD": {
                        "price": 64000.5,
                        "percent_change_24h": -1.25,
                        "market_cap": 1.2e12,
                        "last_updated": "2024-05-01T00:00:00.000Z"
                    }}
                },
                "ETH": [{
                    "name": "Ethereum",
                    "quote": { "USD": { "price": "3100.10", "percent_change_24h": null } }
                }]
            }
        });

        let quotes = parse_quotes(&payload, "USD").unwrap();
        let btc = &quotes["BTC"];
        assert_eq!(btc.name.as_deref(), Some("Bitcoin"));
        assert_eq!(btc.price, Some(64000.5));
        assert_eq!(btc.percent_change_24h, Some(-1.25));

        let eth = &quotes["ETH"];
        assert_eq!(eth.price, Some(3100.10));
        assert_eq!(eth.percent_change_24h, None);
        assert_eq!(eth.currency, "USD");
    }

    #[test]
    fn quotes_in_other_currency_leave_fields_empty() {
        let payload = json!({ "data": { "BTC": { "quote": { "USD": { "price": 1.0 } } } } });
        let quotes = parse_quotes(&payload, "EUR").unwrap();
        assert_eq!(quotes["BTC"].price, None);
    }

    #[test]
    fn non_object_data_is_malformed() {
        let err = parse_quotes(&json!({ "data": [] }), "USD").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
        assert!(err.to_string().contains("data_type=array"));
        assert_eq!(err.status_code(), 502);

        let err = parse_quotes(&json!({ "status": {} }), "USD").unwrap_err();
        assert!(err.to_string().contains("data_type=null"));
    }

    #[test]
    fn global_metrics_fall_back_to_data_timestamp() {
        let payload = json!({
            "data": {
                "btc_dominance": 52.1,
                "eth_dominance": 17.3,
                "last_updated": "2024-05-01T00:00:00Z",
                "quote": { "USD": { "total_market_cap": 2.4e12, "total_volume_24h": 8.0e10 } }
            }
        });

        let g = parse_global(&payload, "USD").unwrap();
        assert_eq!(g.btc_dominance, Some(52.1));
        assert_eq!(g.total_market_cap, Some(2.4e12));
        assert_eq!(g.last_updated.as_deref(), Some("2024-05-01T00:00:00Z"));
    }

    #[test]
    fn error_message_prefers_cmc_status_field() {
        let body = r#"{"status":{"error_code":1001,"error_message":"This API Key is invalid."}}"#;
        assert_eq!(error_message(body), "This API Key is invalid.");
        assert_eq!(error_message(r#"{"message":"rate limited"}"#), "rate limited");
        assert_eq!(error_message("<html>bad gateway</html>"), "<html>bad gateway</html>");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = CoinMarketCapClient::new(
            "  ".to_string(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();

        let err = client.global_metrics("USD").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingKey));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn empty_symbol_set_is_not_fetched() {
        let client = CoinMarketCapClient::new(
            String::new(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();

        let quotes = client.quotes(&BTreeSet::new(), "USD").await.unwrap();
        assert!(quotes.is_empty());
    }
}
