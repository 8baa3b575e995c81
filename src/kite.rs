use crate::candle_utils::{normalize_trading_symbol, parse_candle_time};
use crate::market_data::{CandleRequest, CandleSource};
use crate::models::{Candle, TIME_FORMAT};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const KITE_API_URL_SETTING: &str = "KITE_API_URL";
const KITE_API_KEY_SETTING: &str = "KITE_API_KEY";
const KITE_ACCESS_TOKEN_SETTING: &str = "KITE_ACCESS_TOKEN";
const DEFAULT_KITE_API_URL: &str = "https://api.kite.trade";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<HistoricalData>,
}

#[derive(Debug, Deserialize)]
struct HistoricalData {
    #[serde(default)]
    candles: Vec<Vec<Value>>,
}

/// Market data client for the Kite Connect REST API. Login is handled elsewhere;
/// this only needs an API key and an already issued access token.
pub struct KiteClient {
    http: Client,
    base_url: String,
    headers: HeaderMap,
}

impl KiteClient {
    pub fn new(api_key: &str, access_token: &str, base_url: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Kite-Version", HeaderValue::from_static("3"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}:{}", api_key.trim(), access_token.trim()))
                .context("invalid Kite credentials")?,
        );

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to create Kite HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_KITE_API_URL)
                .trim_end_matches('/')
                .to_string(),
            headers,
        })
    }

    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self> {
        let api_key = require_setting(settings, KITE_API_KEY_SETTING)?;
        let access_token = require_setting(settings, KITE_ACCESS_TOKEN_SETTING)?;
        let base_url = settings
            .get(KITE_API_URL_SETTING)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty());
        Self::new(api_key, access_token, base_url)
    }

    /// Looks up the numeric instrument token for a trading symbol in the exchange's instrument dump.
    pub async fn instrument_token(&self, exchange: &str, trading_symbol: &str) -> Result<u64> {
        let symbol = normalize_trading_symbol(trading_symbol)
            .ok_or_else(|| anyhow!("Trading symbol must not be empty"))?;
        let body = self
            .get_text(&format!("/instruments/{}", exchange.trim().to_uppercase()))
            .await?;
        find_instrument_token(&body, &symbol)?
            .ok_or_else(|| anyhow!("Instrument {} not found on {}", symbol, exchange))
    }

    pub async fn historical_candles(
        &self,
        instrument_token: u64,
        request: &CandleRequest,
    ) -> Result<Vec<Candle>> {
        let path = format!(
            "/instruments/historical/{}/{}",
            instrument_token,
            request.interval.as_str()
        );
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .query(&[
                ("from", request.from.format(TIME_FORMAT).to_string()),
                ("to", request.to.format(TIME_FORMAT).to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned error", url))?;
        let payload = response
            .json::<HistoricalResponse>()
            .await
            .context("failed to parse Kite historical response")?;

        parse_historical_response(payload)
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned error", url))?;
        response
            .text()
            .await
            .with_context(|| format!("failed to read body of {}", url))
    }
}

impl CandleSource for KiteClient {
    fn name(&self) -> &str {
        "kite"
    }

    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<Candle>> {
        let token = self
            .instrument_token(&request.exchange, &request.trading_symbol)
            .await?;
        debug!(
            "Resolved {} on {} to instrument token {}",
            request.trading_symbol, request.exchange, token
        );
        let candles = self.historical_candles(token, request).await?;
        info!(
            "Fetched {} {} candles for {}",
            candles.len(),
            request.interval.as_str(),
            request.trading_symbol
        );
        Ok(candles)
    }
}

fn require_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("Missing required setting {}", key))
}

fn find_instrument_token(instruments_csv: &str, trading_symbol: &str) -> Result<Option<u64>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(instruments_csv.as_bytes());
    let headers = rdr
        .headers()
        .context("instrument dump has no header")?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let token_col =
        column("instrument_token").ok_or_else(|| anyhow!("instrument dump lacks instrument_token"))?;
    let symbol_col =
        column("tradingsymbol").ok_or_else(|| anyhow!("instrument dump lacks tradingsymbol"))?;

    for record in rdr.records() {
        let record = record.context("malformed instrument dump row")?;
        if record
            .get(symbol_col)
            .map(|value| value.trim().eq_ignore_ascii_case(trading_symbol))
            .unwrap_or(false)
        {
            let raw = record.get(token_col).unwrap_or("").trim();
            let token = raw
                .parse::<u64>()
                .map_err(|_| anyhow!("invalid instrument token '{}' for {}", raw, trading_symbol))?;
            return Ok(Some(token));
        }
    }

    Ok(None)
}

fn parse_historical_response(payload: HistoricalResponse) -> Result<Vec<Candle>> {
    if !payload.status.eq_ignore_ascii_case("success") {
        return Err(anyhow!(
            "Kite historical request failed: {}",
            payload.message.unwrap_or_else(|| payload.status.clone())
        ));
    }

    let rows = payload.data.map(|data| data.candles).unwrap_or_default();
    rows.iter()
        .enumerate()
        .map(|(idx, row)| parse_candle_row(row).with_context(|| format!("bad candle row {}", idx)))
        .collect()
}

/// Row layout: `[timestamp, open, high, low, close, volume, (oi)]`.
fn parse_candle_row(row: &[Value]) -> Result<Candle> {
    if row.len() < 5 {
        return Err(anyhow!("expected at least 5 fields, got {}", row.len()));
    }
    let time = row[0]
        .as_str()
        .ok_or_else(|| anyhow!("timestamp is not a string"))
        .and_then(parse_candle_time)?;
    let number = |idx: usize| {
        row[idx]
            .as_f64()
            .filter(|value| value.is_finite())
            .ok_or_else(|| anyhow!("field {} is not a number", idx))
    };
    Ok(Candle::new(time, number(1)?, number(2)?, number(3)?, number(4)?))
}
