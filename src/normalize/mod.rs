//! Normalization of scraped label/value pairs into typed, unit-consistent records.

pub mod aliases;
pub mod coerce;
mod engine;
mod types;
pub mod units;

pub use aliases::{fold_label, AliasIndex, AliasScope};
pub use coerce::coerce;
pub use engine::normalize;
pub use types::*;
