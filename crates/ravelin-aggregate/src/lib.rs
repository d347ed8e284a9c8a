//! The aggregation pipeline.
//!
//! Takes fetched documents through reachability-based pruning, per-service
//! schema renaming and the final merge, and orchestrates the whole run with
//! fan-out fetching and tag-invalidatable caching.

pub mod merge;
pub mod pipeline;
pub mod prune;
pub mod rename;

pub use merge::{merge, MergeConflict, MergeError};
pub use pipeline::{AggregateError, AggregateResult, Aggregator, AggregatorConfig};
pub use prune::prune;
pub use rename::apply_prefix;
