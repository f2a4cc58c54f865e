//! Batch key resolution - concurrent fan-out of single-key lookups

mod fan_out;
mod outcome;

pub use fan_out::FanOutResolver;
pub use outcome::{BatchLookupError, KeyFailure, LookupResult, Resolution};
