use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::SeriesError;
use crate::domain::value_objects::price::Price;

/// Resampling bucket used when deriving periodic change series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Daily,
    Weekly,
}

impl Granularity {
    /// Bucket key for a timestamp. Two observations share a bucket iff
    /// they share a key; buckets with no observations produce no key at
    /// all, which is how gaps stay gaps.
    pub(crate) fn bucket_key(&self, timestamp: DateTime<Utc>) -> (i32, u32) {
        match self {
            Granularity::Daily => (timestamp.year(), timestamp.ordinal()),
            Granularity::Weekly => {
                let week = timestamp.iso_week();
                (week.year(), week.week())
            }
        }
    }

    /// Number of raw daily observations one bucket spans.
    pub fn days(&self) -> u32 {
        match self {
            Granularity::Daily => 1,
            Granularity::Weekly => 7,
        }
    }

    pub fn parse(value: &str) -> Option<Granularity> {
        match value.trim().to_lowercase().as_str() {
            "daily" => Some(Granularity::Daily),
            "weekly" => Some(Granularity::Weekly),
            _ => None,
        }
    }
}

/// One periodic OHLCV observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub timestamp: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: f64,
}

impl Period {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, String> {
        Ok(Period {
            timestamp,
            open: Price::new(open)?,
            high: Price::new(high)?,
            low: Price::new(low)?,
            close: Price::new(close)?,
            volume,
        })
    }
}

/// Ordered price/volume history for a single instrument.
///
/// Timestamps are strictly ascending and unique. Gaps (missing trading
/// periods) are permitted and carry no observation; they are never
/// treated as zero-change. Built fresh per scan request, immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    symbol: String,
    periods: Vec<Period>,
}

impl TimeSeries {
    pub fn new(symbol: impl Into<String>, periods: Vec<Period>) -> Result<Self, SeriesError> {
        for i in 1..periods.len() {
            if periods[i].timestamp == periods[i - 1].timestamp {
                return Err(SeriesError::DuplicateTimestamp(i));
            }
            if periods[i].timestamp < periods[i - 1].timestamp {
                return Err(SeriesError::OutOfOrder(i));
            }
        }
        Ok(TimeSeries {
            symbol: symbol.into(),
            periods,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.periods.iter().map(|p| p.close.value()).collect()
    }

    pub fn first_close(&self) -> Option<Price> {
        self.periods.first().map(|p| p.close)
    }

    pub fn latest_close(&self) -> Option<Price> {
        self.periods.last().map(|p| p.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(offset)
    }

    fn period(offset: i64, close: f64) -> Period {
        Period::new(day(offset), close, close, close, close, 1000.0).unwrap()
    }

    #[test]
    fn test_time_series_accepts_ascending_periods() {
        let series = TimeSeries::new("BTC-USD", vec![period(0, 100.0), period(1, 101.0)]);
        assert!(series.is_ok());
        let series = series.unwrap();
        assert_eq!(series.symbol(), "BTC-USD");
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest_close().unwrap().value(), 101.0);
    }

    #[test]
    fn test_time_series_rejects_duplicate_timestamps() {
        let result = TimeSeries::new("BTC-USD", vec![period(0, 100.0), period(0, 101.0)]);
        assert_eq!(result.unwrap_err(), SeriesError::DuplicateTimestamp(1));
    }

    #[test]
    fn test_time_series_rejects_out_of_order_timestamps() {
        let result = TimeSeries::new(
            "BTC-USD",
            vec![period(0, 100.0), period(3, 101.0), period(2, 102.0)],
        );
        assert_eq!(result.unwrap_err(), SeriesError::OutOfOrder(2));
    }

    #[test]
    fn test_time_series_permits_gaps() {
        let result = TimeSeries::new("BTC-USD", vec![period(0, 100.0), period(14, 101.0)]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_weekly_bucket_key_groups_same_iso_week() {
        // 2024-01-01 is a Monday; the following Sunday closes the week.
        let monday = day(0);
        let sunday = day(6);
        let next_monday = day(7);
        assert_eq!(
            Granularity::Weekly.bucket_key(monday),
            Granularity::Weekly.bucket_key(sunday)
        );
        assert_ne!(
            Granularity::Weekly.bucket_key(monday),
            Granularity::Weekly.bucket_key(next_monday)
        );
    }

    #[test]
    fn test_daily_bucket_key_distinguishes_days() {
        assert_ne!(
            Granularity::Daily.bucket_key(day(0)),
            Granularity::Daily.bucket_key(day(1))
        );
    }

    #[test]
    fn test_period_rejects_negative_price() {
        assert!(Period::new(day(0), 100.0, 100.0, -1.0, 100.0, 0.0).is_err());
    }
}
