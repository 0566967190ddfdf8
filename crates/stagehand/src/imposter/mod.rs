//! Imposter descriptors and recorded-interaction matching.

mod criteria;
mod types;

pub use criteria::matches_criteria;
pub use types::{Imposter, RecordedRequest};
