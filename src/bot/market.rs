//! Spot FX rates and crypto prices, one fetch per command.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

const FX_URL: &str = "https://api.frankfurter.app/latest";
const CRYPTO_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

pub const DEFAULT_FX_CODES: &[&str] = &["USD", "EUR"];
pub const DEFAULT_CRYPTO_IDS: &[&str] = &["bitcoin", "ethereum"];

#[derive(Debug)]
pub enum MarketError {
    /// User gave a currency code the API doesn't know.
    UnknownCurrency(String),
    Upstream(String),
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCurrency(code) => write!(f, "unknown currency: {code}"),
            Self::Upstream(e) => write!(f, "market fetch failed: {e}"),
        }
    }
}

/// A currency code is three ASCII letters.
pub fn normalize_code(token: &str) -> Option<String> {
    let token = token.trim();
    if token.len() == 3 && token.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(token.to_ascii_uppercase())
    } else {
        None
    }
}

#[derive(Deserialize)]
struct FxResponse {
    rates: HashMap<String, f64>,
}

pub struct MarketClient {
    http: reqwest::Client,
}

impl MarketClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }

    /// Rates for the given codes against TRY, one line each.
    pub async fn fx_rates(&self, codes: &[String]) -> Result<String, MarketError> {
        let url = format!("{}?from=TRY&to={}", FX_URL, codes.join(","));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketError::Upstream(e.to_string()))?;

        // Frankfurter answers unknown codes with a client error
        if response.status().is_client_error() {
            return Err(MarketError::UnknownCurrency(codes.join(", ")));
        }
        if !response.status().is_success() {
            return Err(MarketError::Upstream(format!("status {}", response.status())));
        }

        let parsed: FxResponse = response
            .json()
            .await
            .map_err(|e| MarketError::Upstream(e.to_string()))?;

        let mut lines = Vec::new();
        for code in codes {
            let rate = parsed
                .rates
                .get(code)
                .copied()
                .ok_or_else(|| MarketError::UnknownCurrency(code.clone()))?;
            if rate <= 0.0 {
                return Err(MarketError::Upstream(format!("bad rate for {code}")));
            }
            // Rates come as TRY->code; invert for the familiar direction
            lines.push(format!("1 {} = {:.2} TRY", code, 1.0 / rate));
        }
        Ok(lines.join("\n"))
    }

    /// USD spot prices for the given CoinGecko ids.
    pub async fn crypto_prices(&self, ids: &[String]) -> Result<String, MarketError> {
        let url = format!(
            "{}?ids={}&vs_currencies=usd",
            CRYPTO_URL,
            urlencoding::encode(&ids.join(","))
        );

        let parsed: HashMap<String, HashMap<String, f64>> = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| MarketError::Upstream(e.to_string()))?;

        let mut lines = Vec::new();
        for id in ids {
            match parsed.get(id).and_then(|prices| prices.get("usd")) {
                Some(price) => lines.push(format!("{}: ${:.2}", id, price)),
                None => lines.push(format!("{}: bulunamadı", id)),
            }
        }
        Ok(lines.join("\n"))
    }
}

impl Default for MarketClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("usd"), Some("USD".to_string()));
        assert_eq!(normalize_code(" eur "), Some("EUR".to_string()));
        assert_eq!(normalize_code("dolar"), None);
        assert_eq!(normalize_code("us"), None);
        assert_eq!(normalize_code("u$d"), None);
    }

    #[test]
    fn test_fx_response_parses() {
        let body = r#"{"amount":1.0,"base":"TRY","date":"2026-08-05","rates":{"USD":0.0243,"EUR":0.0221}}"#;
        let parsed: FxResponse = serde_json::from_str(body).unwrap();
        assert!((parsed.rates["USD"] - 0.0243).abs() < 1e-9);
        // Inverted direction is what lands in the chat
        assert!((1.0 / parsed.rates["USD"] - 41.15).abs() < 0.01);
    }

    #[test]
    fn test_crypto_response_parses() {
        let body = r#"{"bitcoin":{"usd":65000.5},"ethereum":{"usd":3000.0}}"#;
        let parsed: HashMap<String, HashMap<String, f64>> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed["bitcoin"]["usd"], 65000.5);
    }
}
