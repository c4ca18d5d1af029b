use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::entities::instrument::InstrumentClass;
use crate::domain::entities::time_series::{Granularity, Period, TimeSeries};
use crate::domain::errors::ProviderError;
use crate::domain::repositories::market_data::{MarketDataProvider, ProviderResult};
use crate::infrastructure::throttle::RequestThrottle;

/// Coinbase Exchange public market-data endpoints
const COINBASE_API_BASE: &str = "https://api.exchange.coinbase.com";

/// Transient failures are retried this many times before the instrument
/// is given up on.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Product entry from `/products`
#[derive(Debug, Deserialize)]
struct ProductDto {
    id: String,
    quote_currency: String,
}

/// Daily candle from `/products/{id}/candles`:
/// `[ time, low, high, open, close, volume ]`, newest first.
type CandleDto = (i64, f64, f64, f64, f64, f64);

/// Market data adapter over the Coinbase Exchange public API.
///
/// Serves the crypto class only; requests pass through a shared
/// client-side throttle so scan concurrency cannot outrun the
/// provider's rate limits.
pub struct CoinbaseMarketData {
    client: Client,
    api_base: String,
    throttle: RequestThrottle,
}

impl CoinbaseMarketData {
    pub fn new(throttle: RequestThrottle) -> Self {
        CoinbaseMarketData {
            client: Client::new(),
            api_base: COINBASE_API_BASE.to_string(),
            throttle,
        }
    }

    /// Point the adapter at a different base URL (sandbox, test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ProviderResult<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.throttle.acquire().await;
            match self.request(url).await {
                Err(ProviderError::Unavailable(reason)) if attempt < MAX_ATTEMPTS => {
                    warn!(url, attempt, reason = %reason, "Transient provider failure, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                other => return other,
            }
        }
    }

    async fn request<T: DeserializeOwned>(&self, url: &str) -> ProviderResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        if let Some(err) = map_error_status(response.status()) {
            return Err(err);
        }
        response
            .json::<T>()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))
    }
}

/// HTTP status → provider error; `None` for success statuses.
fn map_error_status(status: StatusCode) -> Option<ProviderError> {
    if status == StatusCode::NOT_FOUND {
        return Some(ProviderError::NotFound(String::new()));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some(ProviderError::RateLimited);
    }
    if !status.is_success() {
        return Some(ProviderError::Unavailable(format!(
            "unexpected status {status}"
        )));
    }
    None
}

/// Assemble an ascending series from wire candles (newest first on the
/// wire).
fn series_from_candles(symbol: &str, mut candles: Vec<CandleDto>) -> ProviderResult<TimeSeries> {
    candles.sort_by_key(|candle| candle.0);

    let mut periods = Vec::with_capacity(candles.len());
    for (time, low, high, open, close, volume) in candles {
        let timestamp = Utc
            .timestamp_opt(time, 0)
            .single()
            .ok_or_else(|| ProviderError::Unavailable(format!("invalid candle timestamp {time}")))?;
        let period = Period::new(timestamp, open, high, low, close, volume)
            .map_err(ProviderError::Unavailable)?;
        periods.push(period);
    }

    TimeSeries::new(symbol, periods).map_err(|err| ProviderError::Unavailable(err.to_string()))
}

#[async_trait]
impl MarketDataProvider for CoinbaseMarketData {
    fn name(&self) -> &str {
        "coinbase"
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        lookback_periods: usize,
        granularity: Granularity,
    ) -> ProviderResult<TimeSeries> {
        let span_days = lookback_periods as i64 * i64::from(granularity.days());
        let end = Utc::now();
        let start = end - chrono::Duration::days(span_days);
        let url = format!(
            "{}/products/{}/candles?granularity=86400&start={}&end={}",
            self.api_base,
            symbol,
            start.to_rfc3339(),
            end.to_rfc3339()
        );

        let candles: Vec<CandleDto> = self.get_json(&url).await.map_err(|err| match err {
            ProviderError::NotFound(_) => ProviderError::NotFound(symbol.to_string()),
            other => other,
        })?;

        let series = series_from_candles(symbol, candles)?;
        debug!(symbol = %symbol, periods = series.len(), "Fetched price history");
        Ok(series)
    }

    async fn fetch_universe(&self, class: InstrumentClass) -> ProviderResult<Vec<String>> {
        if class == InstrumentClass::Equity {
            warn!("Coinbase serves crypto pairs only; returning an empty equity universe");
            return Ok(Vec::new());
        }

        let url = format!("{}/products", self.api_base);
        let products: Vec<ProductDto> = self.get_json(&url).await?;
        let universe: Vec<String> = products
            .into_iter()
            .filter(|product| product.quote_currency == "USD")
            .map(|product| product.id)
            .collect();
        debug!(pairs = universe.len(), "Fetched crypto universe");
        Ok(universe)
    }
}
