//! Pricing module
//!
//! Provides per-frame pricing:
//! - find_match: first-match rule resolution over label-gated groups
//! - convert: closed table of unit conversions
//! - rate: rate × quantity, or unpriced

pub mod conversion;
pub mod matcher;
pub mod rate;

pub use conversion::{convert, convert_to};
pub use matcher::{find_match, RuleMatch};
pub use rate::rate;
