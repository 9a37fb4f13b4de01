pub mod category;
pub mod normalize;
pub mod ratio;
pub mod types;

pub use category::{categorize, ActionCategory};
pub use normalize::{dedup, normalize_batch};
pub use types::{DedupKey, EffectiveDate, FractionalHandling, RawSplitRecord, SplitRatio, SplitRecord};

#[cfg(test)]
mod types_tests;
