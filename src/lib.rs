//! Bandscan Screening Engine
//!
//! Screens large universes of tradable instruments (equities, crypto
//! pairs) for recurring fluctuation patterns and technical-indicator
//! setups, producing a ranked, reproducible shortlist of candidates.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
