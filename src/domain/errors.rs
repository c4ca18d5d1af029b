use thiserror::Error;

/// Failures while deriving an indicator from a time series.
///
/// `InsufficientHistory` is an expected outcome — the indicator is
/// undefined for the instrument, not broken. Callers decide whether a
/// missing indicator is fatal for the instrument being analyzed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("insufficient history: need at least {required} periods, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("degenerate series: {0}")]
    DegenerateSeries(String),
}

/// Malformed period data rejected by the `TimeSeries` constructor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("timestamps must be strictly ascending (violation at index {0})")]
    OutOfOrder(usize),

    #[error("duplicate timestamp at index {0}")]
    DuplicateTimestamp(usize),
}

/// Errors originating from the market data provider.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("unknown instrument: {0}")]
    NotFound(String),

    #[error("rate limited by market data provider")]
    RateLimited,

    #[error("market data provider unavailable: {0}")]
    Unavailable(String),
}

/// Any per-instrument failure caught at the worker boundary.
///
/// These never unwind past the scan coordinator; they are converted to
/// skipped-instrument diagnostics and the scan carries on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InstrumentFailure {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Hard failures surfaced to the scan caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScanError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("scan exhausted: none of the {attempted} attempted instruments could be evaluated")]
    ScanExhausted { attempted: usize },
}
