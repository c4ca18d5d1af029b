use serde::{Deserialize, Serialize};

/// A validated, non-negative, finite price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Price(f64);

impl Price {
    pub fn new(value: f64) -> Result<Self, String> {
        if !value.is_finite() {
            return Err("Price must be finite".to_string());
        }
        if value < 0.0 {
            return Err("Price must be non-negative".to_string());
        }
        Ok(Price(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Round to the instrument's natural quote precision: two decimals
    /// at or above 1.0, six decimals for sub-unit prices.
    pub fn round_natural(&self) -> Price {
        let decimals = if self.0 >= 1.0 { 2 } else { 6 };
        let factor = 10f64.powi(decimals);
        Price((self.0 * factor).round() / factor)
    }
}
