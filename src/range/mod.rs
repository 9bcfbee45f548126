//! Range reads and multi-source store-aggregate for sorted sets.

pub mod aggregate;
pub mod query;

pub use aggregate::{aggregate, store_command, Aggregate, StoreArgs, StoreMode};
pub use query::{range_page, range_stream, RangeBy, RangeQuery};
