use serde::{Deserialize, Serialize};

use crate::domain::errors::InstrumentFailure;
use crate::domain::value_objects::price::Price;

/// Point-in-time indicator readout for one instrument.
///
/// Indicators that lack enough history are `None` ("undefined"), never
/// zero — zero is a legitimate indicator value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub latest_close: Price,
    pub rsi: Option<f64>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    /// Mean magnitude of week-over-week change across the lookback.
    pub average_weekly_change_pct: Option<f64>,
    /// Growth of the latest close over the first close of the lookback.
    pub overall_growth_pct: Option<f64>,
    /// Suggested entry, `latest_close` discounted by the average weekly move.
    pub buy_reference: Option<Price>,
    /// Suggested exit, `latest_close` marked up by the average weekly move.
    pub sell_reference: Option<Price>,
}

/// Outcome of evaluating a change series against the fluctuation band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluctuationMatch {
    pub matched: bool,
    /// The evaluated most-recent sub-sequence, oldest first. Empty when
    /// the series is shorter than the required consecutive count.
    pub evidence: Vec<f64>,
}

impl FluctuationMatch {
    pub fn no_match() -> Self {
        FluctuationMatch {
            matched: false,
            evidence: Vec::new(),
        }
    }
}

/// One qualifying instrument with its opportunity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    pub snapshot: IndicatorSnapshot,
    pub fluctuation: FluctuationMatch,
    pub score: f64,
}

/// Instrument excluded from a scan, with the reason it was excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub symbol: String,
    pub reason: InstrumentFailure,
}

/// Complete output of one scan: the ranked shortlist plus diagnostics
/// for every instrument that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanOutcome {
    pub results: Vec<ScanResult>,
    pub skipped: Vec<SkippedInstrument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_has_empty_evidence() {
        let result = FluctuationMatch::no_match();
        assert!(!result.matched);
        assert!(result.evidence.is_empty());
    }

    #[test]
    fn test_scan_outcome_default_is_empty() {
        let outcome = ScanOutcome::default();
        assert!(outcome.results.is_empty());
        assert!(outcome.skipped.is_empty());
    }
}
