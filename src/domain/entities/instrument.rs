use serde::{Deserialize, Serialize};

/// Class of tradable instruments a scan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentClass {
    Crypto,
    Equity,
    Both,
}

impl InstrumentClass {
    /// Parse the configuration spelling ("crypto", "equity"/"stocks",
    /// "both"). Unknown values are rejected so a typo cannot silently
    /// scan the wrong universe.
    pub fn parse(value: &str) -> Option<InstrumentClass> {
        match value.trim().to_lowercase().as_str() {
            "crypto" => Some(InstrumentClass::Crypto),
            "equity" | "stocks" => Some(InstrumentClass::Equity),
            "both" => Some(InstrumentClass::Both),
            _ => None,
        }
    }
}

/// Normalize an instrument identifier for deduplication: surrounding
/// whitespace dropped, uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
