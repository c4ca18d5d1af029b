//! Market Data Provider Trait
//!
//! This module defines the `MarketDataProvider` trait, the port through
//! which the screening engine obtains price history and instrument
//! universes. The scan pipeline never talks to a concrete data source
//! directly, which keeps indicator and ranking logic testable against
//! in-memory fixtures and lets deployments swap providers freely.

use async_trait::async_trait;

use crate::domain::entities::instrument::InstrumentClass;
use crate::domain::entities::time_series::{Granularity, TimeSeries};
use crate::domain::errors::ProviderError;

/// Common result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Source of price history and instrument universes.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Name of this provider, for logs and diagnostics.
    fn name(&self) -> &str;

    /// Fetch price history for one instrument covering `lookback_periods`
    /// buckets of the requested granularity.
    ///
    /// # Errors
    /// `NotFound` for unknown identifiers, `RateLimited` when the caller
    /// must back off, `Unavailable` for transient faults.
    async fn fetch_history(
        &self,
        symbol: &str,
        lookback_periods: usize,
        granularity: Granularity,
    ) -> ProviderResult<TimeSeries>;

    /// List the identifiers of the given instrument class.
    ///
    /// The list may be partial; callers must tolerate fewer identifiers
    /// than expected.
    async fn fetch_universe(&self, class: InstrumentClass) -> ProviderResult<Vec<String>>;
}
