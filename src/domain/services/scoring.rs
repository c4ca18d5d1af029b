use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScanConfiguration;
use crate::domain::entities::scan_result::{FluctuationMatch, IndicatorSnapshot};
use crate::domain::entities::time_series::TimeSeries;
use crate::domain::errors::IndicatorError;
use crate::domain::services::indicators::{self, Rsi, Sma};

/// Scoring criterion for a scan run.
///
/// A deployment selects exactly one criterion per run; scores from
/// different criteria are never ranked together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanCriterion {
    /// RSI oversold while the price holds near its short moving average.
    OversoldReversion,
    /// N consecutive periods inside the configured fluctuation band.
    FluctuationPattern,
}

impl ScanCriterion {
    pub fn parse(value: &str) -> Option<ScanCriterion> {
        match value.trim().to_lowercase().as_str() {
            "oversold" | "oversold_reversion" => Some(ScanCriterion::OversoldReversion),
            "fluctuation" | "fluctuation_pattern" => Some(ScanCriterion::FluctuationPattern),
            _ => None,
        }
    }
}

/// Build the indicator readout for one instrument.
///
/// The latest close is required — an empty series fails with
/// `InsufficientHistory`. Every other indicator maps its own
/// `InsufficientHistory` to `None` ("undefined") while degenerate data
/// still fails the instrument.
pub fn build_snapshot(
    series: &TimeSeries,
    config: &ScanConfiguration,
) -> Result<IndicatorSnapshot, IndicatorError> {
    let latest_close = series
        .latest_close()
        .ok_or(IndicatorError::InsufficientHistory {
            required: 1,
            available: 0,
        })?;
    let closes = series.closes();

    let rsi = optional(Rsi::new(config.rsi_window).compute(&closes))?;
    let sma_short = optional(Sma::new(config.sma_short_window).compute(&closes))?;
    let sma_long = optional(Sma::new(config.sma_long_window).compute(&closes))?;
    let average_weekly_change_pct = optional(indicators::average_weekly_change(series))?;
    let overall_growth_pct = optional(indicators::overall_growth(series))?;

    let (buy_reference, sell_reference) = match average_weekly_change_pct {
        Some(average) => {
            let (buy, sell) = indicators::reference_prices(latest_close, average)?;
            (Some(buy), Some(sell))
        }
        None => (None, None),
    };

    debug!(
        symbol = %series.symbol(),
        close = latest_close.value(),
        rsi = ?rsi,
        sma_short = ?sma_short,
        "Built indicator snapshot"
    );

    Ok(IndicatorSnapshot {
        symbol: series.symbol().to_string(),
        latest_close,
        rsi,
        sma_short,
        sma_long,
        average_weekly_change_pct,
        overall_growth_pct,
        buy_reference,
        sell_reference,
    })
}

/// Missing history means "indicator undefined"; degenerate data stays an error.
fn optional(result: Result<f64, IndicatorError>) -> Result<Option<f64>, IndicatorError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(IndicatorError::InsufficientHistory { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Converts a snapshot and fluctuation match into an opportunity score
/// under the active criterion.
///
/// `None` means the instrument is disqualified and must be dropped from
/// the ranking. `Some(0.0)` is a valid score and is ranked normally.
pub struct InstrumentScorer {
    criterion: ScanCriterion,
    rsi_oversold_threshold: f64,
    sma_proximity_ratio: f64,
}

impl InstrumentScorer {
    pub fn from_config(config: &ScanConfiguration) -> Self {
        InstrumentScorer {
            criterion: config.criterion,
            rsi_oversold_threshold: config.rsi_oversold_threshold,
            sma_proximity_ratio: config.sma_proximity_ratio,
        }
    }

    pub fn score(
        &self,
        snapshot: &IndicatorSnapshot,
        fluctuation: &FluctuationMatch,
    ) -> Option<f64> {
        match self.criterion {
            ScanCriterion::OversoldReversion => self.score_oversold(snapshot),
            ScanCriterion::FluctuationPattern => Self::score_fluctuation(fluctuation),
        }
    }

    /// Potential gain to the sell reference, provided RSI is under the
    /// oversold threshold and the price holds at or above the proximity
    /// ratio of the short moving average.
    fn score_oversold(&self, snapshot: &IndicatorSnapshot) -> Option<f64> {
        let rsi = snapshot.rsi?;
        let sma_short = snapshot.sma_short?;
        let sell_reference = snapshot.sell_reference?;
        let price = snapshot.latest_close.value();

        if rsi >= self.rsi_oversold_threshold || price < self.sma_proximity_ratio * sma_short {
            return None;
        }
        if price <= 0.0 {
            return None;
        }
        Some((sell_reference.value() - price) / price * 100.0)
    }

    /// Magnitude of the most recent matched change.
    fn score_fluctuation(fluctuation: &FluctuationMatch) -> Option<f64> {
        if !fluctuation.matched {
            return None;
        }
        fluctuation.evidence.last().map(|change| change.abs())
    }
}
