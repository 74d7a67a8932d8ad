//! Ground truth catalog of known bugs.
//!
//! The catalog is a static JSON document loaded once per evaluator. Every
//! entry is uniquely keyed by `bug_id` and never mutated after load.

mod store;

pub(crate) use store::bucket_key;
pub use store::{GroundTruthBug, GroundTruthStore, LoadError};
