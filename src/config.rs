use std::time::Duration;

use crate::domain::entities::instrument::InstrumentClass;
use crate::domain::entities::time_series::Granularity;
use crate::domain::errors::ScanError;
use crate::domain::services::scoring::ScanCriterion;

/// How the universe portion of the work list is reduced to the
/// `max_instruments` cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniverseSelection {
    /// Keep the first N identifiers in provided order.
    Truncate,
    /// Draw a seeded random sample; reproducible for a fixed seed.
    Sample { seed: u64 },
}

/// Configuration for one scan run.
///
/// Constructed once at startup and passed by reference through every
/// layer; nothing mutates it afterwards and no module-level state backs
/// it.
#[derive(Debug, Clone)]
pub struct ScanConfiguration {
    pub instrument_class: InstrumentClass,
    pub criterion: ScanCriterion,
    /// Lower edge of the fluctuation band, percent, inclusive.
    pub min_fluctuation_pct: f64,
    /// Upper edge of the fluctuation band, percent, inclusive.
    pub max_fluctuation_pct: f64,
    /// How many consecutive periods must sit inside the band.
    pub consecutive_periods: usize,
    /// Number of granularity buckets of history to analyze.
    pub lookback_periods: usize,
    pub granularity: Granularity,
    /// Cap on universe identifiers submitted to scoring; `None` = no cap.
    /// Manual symbols are exempt.
    pub max_instruments: Option<usize>,
    pub selection: UniverseSelection,
    pub rsi_window: usize,
    pub rsi_oversold_threshold: f64,
    pub sma_short_window: usize,
    pub sma_long_window: usize,
    /// Price must hold at or above this ratio of the short SMA.
    pub sma_proximity_ratio: f64,
    /// Always-included identifiers, exempt from class filtering and caps.
    pub manual_symbols: Vec<String>,
    /// Display truncation of the ranked shortlist; `None` = all results.
    pub max_results: Option<usize>,
    /// Upper bound on concurrent in-flight provider calls.
    pub max_concurrent_fetches: usize,
    /// Overall scan deadline; in-flight work past it is discarded.
    pub scan_timeout: Option<Duration>,
    pub verbose: bool,
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        ScanConfiguration {
            instrument_class: InstrumentClass::Both,
            criterion: ScanCriterion::FluctuationPattern,
            min_fluctuation_pct: 2.0,
            max_fluctuation_pct: 10.0,
            consecutive_periods: 3,
            lookback_periods: 13,
            granularity: Granularity::Weekly,
            max_instruments: Some(100),
            selection: UniverseSelection::Truncate,
            rsi_window: 14,
            rsi_oversold_threshold: 40.0,
            sma_short_window: 50,
            sma_long_window: 200,
            sma_proximity_ratio: 0.95,
            manual_symbols: Vec::new(),
            max_results: Some(10),
            max_concurrent_fetches: 10,
            scan_timeout: None,
            verbose: false,
        }
    }
}

impl ScanConfiguration {
    /// Load configuration from environment variables, falling back to
    /// the defaults for anything absent or out of range.
    pub fn from_env() -> ScanConfiguration {
        let mut config = ScanConfiguration::default();

        if let Ok(class) = std::env::var("SCAN_INSTRUMENT_CLASS") {
            match InstrumentClass::parse(&class) {
                Some(value) => config.instrument_class = value,
                None => tracing::warn!(
                    "Invalid SCAN_INSTRUMENT_CLASS '{}' (expected crypto, equity or both), using default",
                    class
                ),
            }
        }

        if let Ok(criterion) = std::env::var("SCAN_CRITERION") {
            match ScanCriterion::parse(&criterion) {
                Some(value) => config.criterion = value,
                None => tracing::warn!(
                    "Invalid SCAN_CRITERION '{}' (expected oversold or fluctuation), using default",
                    criterion
                ),
            }
        }

        if let Ok(granularity) = std::env::var("SCAN_GRANULARITY") {
            match Granularity::parse(&granularity) {
                Some(value) => config.granularity = value,
                None => tracing::warn!(
                    "Invalid SCAN_GRANULARITY '{}' (expected daily or weekly), using default",
                    granularity
                ),
            }
        }

        if let Ok(min_pct) = std::env::var("SCAN_MIN_FLUCTUATION_PCT") {
            match min_pct.parse::<f64>() {
                Ok(value) if value >= 0.0 => config.min_fluctuation_pct = value,
                _ => tracing::warn!(
                    "Invalid SCAN_MIN_FLUCTUATION_PCT '{}', using default: {}",
                    min_pct,
                    config.min_fluctuation_pct
                ),
            }
        }

        if let Ok(max_pct) = std::env::var("SCAN_MAX_FLUCTUATION_PCT") {
            match max_pct.parse::<f64>() {
                Ok(value) if value >= 0.0 => config.max_fluctuation_pct = value,
                _ => tracing::warn!(
                    "Invalid SCAN_MAX_FLUCTUATION_PCT '{}', using default: {}",
                    max_pct,
                    config.max_fluctuation_pct
                ),
            }
        }

        if let Ok(consecutive) = std::env::var("SCAN_CONSECUTIVE_PERIODS") {
            match consecutive.parse::<usize>() {
                Ok(value) if value >= 1 => config.consecutive_periods = value,
                _ => tracing::warn!(
                    "Invalid SCAN_CONSECUTIVE_PERIODS '{}', using default: {}",
                    consecutive,
                    config.consecutive_periods
                ),
            }
        }

        if let Ok(lookback) = std::env::var("SCAN_LOOKBACK_PERIODS") {
            match lookback.parse::<usize>() {
                Ok(value) if value >= 2 => config.lookback_periods = value,
                _ => tracing::warn!(
                    "Invalid SCAN_LOOKBACK_PERIODS '{}', using default: {}",
                    lookback,
                    config.lookback_periods
                ),
            }
        }

        if let Ok(max_instruments) = std::env::var("SCAN_MAX_INSTRUMENTS") {
            // Zero means "no cap", matching the original scripts' None.
            match max_instruments.parse::<usize>() {
                Ok(0) => config.max_instruments = None,
                Ok(value) => config.max_instruments = Some(value),
                Err(_) => tracing::warn!(
                    "Invalid SCAN_MAX_INSTRUMENTS '{}', using default",
                    max_instruments
                ),
            }
        }

        if let Ok(seed) = std::env::var("SCAN_SAMPLE_SEED") {
            match seed.parse::<u64>() {
                Ok(value) => config.selection = UniverseSelection::Sample { seed: value },
                Err(_) => {
                    tracing::warn!("Invalid SCAN_SAMPLE_SEED '{}', keeping deterministic truncation", seed)
                }
            }
        }

        if let Ok(threshold) = std::env::var("SCAN_RSI_OVERSOLD_THRESHOLD") {
            match threshold.parse::<f64>() {
                Ok(value) if (0.0..=100.0).contains(&value) => {
                    config.rsi_oversold_threshold = value
                }
                _ => tracing::warn!(
                    "Invalid SCAN_RSI_OVERSOLD_THRESHOLD '{}' (must be between 0 and 100), using default: {}",
                    threshold,
                    config.rsi_oversold_threshold
                ),
            }
        }

        if let Ok(ratio) = std::env::var("SCAN_SMA_PROXIMITY_RATIO") {
            match ratio.parse::<f64>() {
                Ok(value) if value > 0.0 && value.is_finite() => {
                    config.sma_proximity_ratio = value
                }
                _ => tracing::warn!(
                    "Invalid SCAN_SMA_PROXIMITY_RATIO '{}', using default: {}",
                    ratio,
                    config.sma_proximity_ratio
                ),
            }
        }

        if let Ok(symbols) = std::env::var("SCAN_MANUAL_SYMBOLS") {
            config.manual_symbols = symbols
                .split(',')
                .map(|symbol| symbol.trim().to_string())
                .filter(|symbol| !symbol.is_empty())
                .collect();
        }

        if let Ok(max_results) = std::env::var("SCAN_MAX_RESULTS") {
            match max_results.parse::<usize>() {
                Ok(0) => config.max_results = None,
                Ok(value) => config.max_results = Some(value),
                Err(_) => {
                    tracing::warn!("Invalid SCAN_MAX_RESULTS '{}', using default", max_results)
                }
            }
        }

        if let Ok(fetches) = std::env::var("SCAN_MAX_CONCURRENT_FETCHES") {
            match fetches.parse::<usize>() {
                Ok(value) if (1..=100).contains(&value) => config.max_concurrent_fetches = value,
                _ => tracing::warn!(
                    "Invalid SCAN_MAX_CONCURRENT_FETCHES '{}' (must be 1-100), using default: {}",
                    fetches,
                    config.max_concurrent_fetches
                ),
            }
        }

        if let Ok(timeout) = std::env::var("SCAN_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(0) => config.scan_timeout = None,
                Ok(value) => config.scan_timeout = Some(Duration::from_secs(value)),
                Err(_) => {
                    tracing::warn!("Invalid SCAN_TIMEOUT_SECONDS '{}', using default", timeout)
                }
            }
        }

        if let Ok(verbose) = std::env::var("SCAN_VERBOSE") {
            config.verbose = verbose.to_lowercase() == "true" || verbose == "1";
        }

        config
    }

    /// Reject configurations no scan can honor. Called once by the
    /// coordinator constructor; per-instrument data problems are never
    /// configuration errors.
    pub fn validate(&self) -> Result<(), ScanError> {
        if !self.min_fluctuation_pct.is_finite() || !self.max_fluctuation_pct.is_finite() {
            return Err(ScanError::InvalidConfiguration(
                "fluctuation band edges must be finite".to_string(),
            ));
        }
        if self.min_fluctuation_pct < 0.0 || self.max_fluctuation_pct < 0.0 {
            return Err(ScanError::InvalidConfiguration(
                "fluctuation band edges must be non-negative".to_string(),
            ));
        }
        if self.min_fluctuation_pct > self.max_fluctuation_pct {
            return Err(ScanError::InvalidConfiguration(format!(
                "min fluctuation {} exceeds max fluctuation {}",
                self.min_fluctuation_pct, self.max_fluctuation_pct
            )));
        }
        if self.consecutive_periods < 1 {
            return Err(ScanError::InvalidConfiguration(
                "consecutive periods must be at least 1".to_string(),
            ));
        }
        if self.lookback_periods < 2 {
            return Err(ScanError::InvalidConfiguration(
                "lookback must cover at least 2 periods".to_string(),
            ));
        }
        if self.rsi_window == 0 || self.sma_short_window == 0 || self.sma_long_window == 0 {
            return Err(ScanError::InvalidConfiguration(
                "indicator windows must be positive".to_string(),
            ));
        }
        if !(self.sma_proximity_ratio > 0.0) {
            return Err(ScanError::InvalidConfiguration(
                "SMA proximity ratio must be positive".to_string(),
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ScanError::InvalidConfiguration(
                "worker pool needs at least one concurrent fetch".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScanConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.consecutive_periods, 3);
        assert_eq!(config.min_fluctuation_pct, 2.0);
        assert_eq!(config.max_fluctuation_pct, 10.0);
        assert_eq!(config.selection, UniverseSelection::Truncate);
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let config = ScanConfiguration {
            min_fluctuation_pct: 10.0,
            max_fluctuation_pct: 2.0,
            ..ScanConfiguration::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_consecutive_periods() {
        let config = ScanConfiguration {
            consecutive_periods: 0,
            ..ScanConfiguration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_worker_pool() {
        let config = ScanConfiguration {
            max_concurrent_fetches: 0,
            ..ScanConfiguration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_band_edge() {
        let config = ScanConfiguration {
            min_fluctuation_pct: -1.0,
            ..ScanConfiguration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_equal_band_edges() {
        let config = ScanConfiguration {
            min_fluctuation_pct: 5.0,
            max_fluctuation_pct: 5.0,
            ..ScanConfiguration::default()
        };
        assert!(config.validate().is_ok());
    }
}
