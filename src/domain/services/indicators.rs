use crate::domain::entities::time_series::{Granularity, TimeSeries};
use crate::domain::errors::IndicatorError;
use crate::domain::value_objects::price::Price;

/// Relative Strength Index over a trailing window, Wilder smoothing.
pub struct Rsi {
    pub window: usize,
}

impl Rsi {
    /// # Panics
    /// Panics if `window` is zero.
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "RSI window must be positive");
        Rsi { window }
    }

    /// Compute the RSI of the most recent close. Needs `window + 1`
    /// closes; anything less is `InsufficientHistory`. A window with no
    /// losses is defined as 100. The result is always in [0, 100].
    pub fn compute(&self, closes: &[f64]) -> Result<f64, IndicatorError> {
        if closes.len() < self.window + 1 {
            return Err(IndicatorError::InsufficientHistory {
                required: self.window + 1,
                available: closes.len(),
            });
        }

        let mut gains = Vec::with_capacity(closes.len() - 1);
        let mut losses = Vec::with_capacity(closes.len() - 1);
        for pair in closes.windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                gains.push(change);
                losses.push(0.0);
            } else {
                gains.push(0.0);
                losses.push(-change);
            }
        }

        // Wilder smoothing: seed with a simple mean over the first
        // window, then fold each remaining change into the average.
        let window = self.window as f64;
        let mut avg_gain = gains[..self.window].iter().sum::<f64>() / window;
        let mut avg_loss = losses[..self.window].iter().sum::<f64>() / window;
        for i in self.window..gains.len() {
            avg_gain = (avg_gain * (window - 1.0) + gains[i]) / window;
            avg_loss = (avg_loss * (window - 1.0) + losses[i]) / window;
        }

        if avg_loss == 0.0 {
            return Ok(100.0);
        }
        let rs = avg_gain / avg_loss;
        Ok(100.0 - 100.0 / (1.0 + rs))
    }
}

/// Simple moving average over a trailing window of closes.
pub struct Sma {
    pub window: usize,
}

impl Sma {
    /// # Panics
    /// Panics if `window` is zero.
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "SMA window must be positive");
        Sma { window }
    }

    pub fn compute(&self, closes: &[f64]) -> Result<f64, IndicatorError> {
        if closes.len() < self.window {
            return Err(IndicatorError::InsufficientHistory {
                required: self.window,
                available: closes.len(),
            });
        }
        let tail = &closes[closes.len() - self.window..];
        Ok(tail.iter().sum::<f64>() / self.window as f64)
    }
}

/// Percentage changes between consecutive non-empty granularity buckets.
///
/// Each bucket contributes the last close observed inside it. Buckets
/// with no observations are skipped outright so that a gap never shows
/// up as a false small-magnitude change. Needs at least two non-empty
/// buckets; a non-positive close ahead of a ratio is `DegenerateSeries`.
pub fn periodic_change_series(
    series: &TimeSeries,
    granularity: Granularity,
) -> Result<Vec<f64>, IndicatorError> {
    let mut bucket_closes: Vec<f64> = Vec::new();
    let mut current_key = None;
    for period in series.periods() {
        let key = Some(granularity.bucket_key(period.timestamp));
        if key == current_key {
            if let Some(last) = bucket_closes.last_mut() {
                *last = period.close.value();
            }
        } else {
            bucket_closes.push(period.close.value());
            current_key = key;
        }
    }

    if bucket_closes.len() < 2 {
        return Err(IndicatorError::InsufficientHistory {
            required: 2,
            available: bucket_closes.len(),
        });
    }

    let mut changes = Vec::with_capacity(bucket_closes.len() - 1);
    for pair in bucket_closes.windows(2) {
        if pair[0] <= 0.0 {
            return Err(IndicatorError::DegenerateSeries(format!(
                "non-positive close {} ahead of a percentage change",
                pair[0]
            )));
        }
        changes.push((pair[1] - pair[0]) / pair[0] * 100.0);
    }
    Ok(changes)
}

/// Mean magnitude of week-over-week change, in percent.
pub fn average_weekly_change(series: &TimeSeries) -> Result<f64, IndicatorError> {
    let changes = periodic_change_series(series, Granularity::Weekly)?;
    Ok(changes.iter().map(|c| c.abs()).sum::<f64>() / changes.len() as f64)
}

/// Growth of the latest close over the first close of the series, in percent.
pub fn overall_growth(series: &TimeSeries) -> Result<f64, IndicatorError> {
    if series.len() < 2 {
        return Err(IndicatorError::InsufficientHistory {
            required: 2,
            available: series.len(),
        });
    }
    let first = series.first_close().map(|p| p.value()).unwrap_or_default();
    let last = series.latest_close().map(|p| p.value()).unwrap_or_default();
    if first <= 0.0 {
        return Err(IndicatorError::DegenerateSeries(format!(
            "non-positive first close {first}"
        )));
    }
    Ok((last - first) / first * 100.0)
}

/// Buy/sell reference prices bracketing the current price by the average
/// weekly move, rounded to the instrument's natural quote precision.
pub fn reference_prices(
    current: Price,
    average_weekly_change_pct: f64,
) -> Result<(Price, Price), IndicatorError> {
    let swing = average_weekly_change_pct / 100.0;
    let buy = Price::new(current.value() * (1.0 - swing)).map_err(IndicatorError::DegenerateSeries)?;
    let sell =
        Price::new(current.value() * (1.0 + swing)).map_err(IndicatorError::DegenerateSeries)?;
    Ok((buy.round_natural(), sell.round_natural()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::time_series::Period;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(offset)
    }

    fn daily_series(closes: &[f64]) -> TimeSeries {
        let periods = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                Period::new(day(i as i64), close, close, close, close, 1000.0).unwrap()
            })
            .collect();
        TimeSeries::new("TEST-USD", periods).unwrap()
    }

    /// One observation per week, Mondays.
    fn weekly_series(closes: &[f64]) -> TimeSeries {
        let periods = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                Period::new(day(7 * i as i64), close, close, close, close, 1000.0).unwrap()
            })
            .collect();
        TimeSeries::new("TEST-USD", periods).unwrap()
    }

    #[test]
    fn test_sma_known_value() {
        let sma = Sma::new(5);
        let result = sma.compute(&[10.0, 12.0, 11.0, 13.0, 14.0]).unwrap();
        assert_eq!(result, 12.0);
    }

    #[test]
    fn test_sma_insufficient_history() {
        let sma = Sma::new(6);
        let result = sma.compute(&[10.0, 12.0, 11.0, 13.0, 14.0]);
        assert_eq!(
            result.unwrap_err(),
            IndicatorError::InsufficientHistory {
                required: 6,
                available: 5
            }
        );
    }

    #[test]
    fn test_sma_uses_trailing_window() {
        let sma = Sma::new(2);
        let result = sma.compute(&[1.0, 2.0, 10.0, 20.0]).unwrap();
        assert_eq!(result, 15.0);
    }

    #[test]
    fn test_rsi_bounded_for_mixed_series() {
        let rsi = Rsi::new(3);
        let closes = [10.0, 10.5, 10.2, 10.8, 10.4, 10.9, 10.6];
        let value = rsi.compute(&closes).unwrap();
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn test_rsi_is_100_with_no_losses() {
        let rsi = Rsi::new(3);
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        assert_eq!(rsi.compute(&closes).unwrap(), 100.0);
    }

    #[test]
    fn test_rsi_is_0_with_no_gains() {
        let rsi = Rsi::new(3);
        let closes = [14.0, 13.0, 12.0, 11.0, 10.0];
        assert_eq!(rsi.compute(&closes).unwrap(), 0.0);
    }

    #[test]
    fn test_rsi_insufficient_history() {
        let rsi = Rsi::new(14);
        let result = rsi.compute(&[10.0, 11.0, 12.0]);
        assert_eq!(
            result.unwrap_err(),
            IndicatorError::InsufficientHistory {
                required: 15,
                available: 3
            }
        );
    }

    #[test]
    fn test_rsi_balanced_gains_and_losses_is_50() {
        let rsi = Rsi::new(4);
        // Alternating +1/-1 keeps average gain equal to average loss.
        let closes = [10.0, 11.0, 10.0, 11.0, 10.0];
        let value = rsi.compute(&closes).unwrap();
        assert!((value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_change_series_from_weekly_observations() {
        let series = weekly_series(&[100.0, 110.0, 99.0]);
        let changes = periodic_change_series(&series, Granularity::Weekly).unwrap();
        assert_eq!(changes.len(), 2);
        assert!((changes[0] - 10.0).abs() < 1e-9);
        assert!((changes[1] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_change_series_takes_last_close_per_week() {
        // Two observations in week one; the Friday close wins.
        let periods = vec![
            Period::new(day(0), 100.0, 100.0, 100.0, 100.0, 0.0).unwrap(),
            Period::new(day(4), 100.0, 100.0, 100.0, 105.0, 0.0).unwrap(),
            Period::new(day(7), 100.0, 100.0, 100.0, 110.25, 0.0).unwrap(),
        ];
        let series = TimeSeries::new("TEST-USD", periods).unwrap();
        let changes = periodic_change_series(&series, Granularity::Weekly).unwrap();
        assert_eq!(changes.len(), 1);
        assert!((changes[0] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_change_series_skips_empty_buckets() {
        // Weeks 1 and 3 observed, week 2 missing: one change spanning
        // the gap, not two changes and not a zero entry.
        let periods = vec![
            Period::new(day(0), 0.0, 0.0, 0.0, 100.0, 0.0).unwrap(),
            Period::new(day(14), 0.0, 0.0, 0.0, 121.0, 0.0).unwrap(),
        ];
        let series = TimeSeries::new("TEST-USD", periods).unwrap();
        let changes = periodic_change_series(&series, Granularity::Weekly).unwrap();
        assert_eq!(changes.len(), 1);
        assert!((changes[0] - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_change_series_insufficient_buckets() {
        let series = weekly_series(&[100.0]);
        let result = periodic_change_series(&series, Granularity::Weekly);
        assert_eq!(
            result.unwrap_err(),
            IndicatorError::InsufficientHistory {
                required: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_change_series_zero_prior_close_is_degenerate() {
        let series = weekly_series(&[0.0, 100.0]);
        let result = periodic_change_series(&series, Granularity::Weekly);
        assert!(matches!(
            result,
            Err(IndicatorError::DegenerateSeries(_))
        ));
    }

    #[test]
    fn test_daily_granularity_changes() {
        let series = daily_series(&[100.0, 102.0, 99.96]);
        let changes = periodic_change_series(&series, Granularity::Daily).unwrap();
        assert_eq!(changes.len(), 2);
        assert!((changes[0] - 2.0).abs() < 1e-9);
        assert!((changes[1] + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_weekly_change_uses_magnitudes() {
        let series = weekly_series(&[100.0, 110.0, 99.0]);
        // Changes are +10% and -10%; the signed mean would be ~0.
        let average = average_weekly_change(&series).unwrap();
        assert!((average - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_growth() {
        let series = weekly_series(&[100.0, 104.0, 112.0]);
        let growth = overall_growth(&series).unwrap();
        assert!((growth - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_growth_single_point_is_insufficient() {
        let series = weekly_series(&[100.0]);
        assert!(matches!(
            overall_growth(&series),
            Err(IndicatorError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn test_reference_prices_bracket_current() {
        let current = Price::new(200.0).unwrap();
        let (buy, sell) = reference_prices(current, 5.0).unwrap();
        assert_eq!(buy.value(), 190.0);
        assert_eq!(sell.value(), 210.0);
    }

    #[test]
    fn test_reference_prices_round_to_natural_precision() {
        let current = Price::new(0.5).unwrap();
        let (buy, sell) = reference_prices(current, 3.333333).unwrap();
        assert_eq!(buy.value(), 0.483333);
        assert_eq!(sell.value(), 0.516667);
    }
}
