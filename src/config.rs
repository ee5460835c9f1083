use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub cmc_api_key: String,
    pub cmc_base_url: String,
    pub cmc_currency: String,
    pub cmc_timeout_secs: u64,

    pub alerts_path: String,
    pub allowed_origins: Vec<String>,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8000);

    let cmc_api_key = env::var("COINMARKETCAP_API_KEY").unwrap_or_default();
    let cmc_base_url = env::var("CMC_BASE_URL")
        .unwrap_or_else(|_| "https://pro-api.coinmarketcap.com".to_string());
    let cmc_currency = env::var("CMC_CURRENCY")
        .ok()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "USD".to_string());
    let cmc_timeout_secs = env::var("CMC_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(20);

    let alerts_path = env::var("ALERTS_PATH").unwrap_or_else(|_| "alerts.json".to_string());
    let allowed_origins = parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default());

    Settings {
        host,
        port,
        cmc_api_key,
        cmc_base_url,
        cmc_currency,
        cmc_timeout_secs,
        alerts_path,
        allowed_origins,
    }
}

/// Splits a comma-separated origin list. An empty list falls back to the
/// local dev server origins.
pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        return vec![
            "http://localhost:5173".to_string(),
            "http://127.0.0.1:5173".to_string(),
        ];
    }
    origins
}

impl Settings {
    pub fn has_cmc_key(&self) -> bool {
        !self.cmc_api_key.trim().is_empty()
    }

    /// The `convert` query value, or the configured default.
    pub fn currency_or_default(&self, convert: Option<&str>) -> String {
        convert
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.cmc_currency.clone())
    }
}
