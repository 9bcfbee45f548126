//! Reference in-memory store.
//!
//! Executes the hash and sorted-set command set against a shared keyspace and
//! answers with the same reply shapes a remote store produces, so the clients
//! can run against it directly:
//!
//! - `store`: keyspace, argument reader and command dispatch.
//! - `hash`: hash command handlers.
//! - `zset`: sorted-set command handlers, including store-aggregate.
//! - `scan`: offset-cursor `HSCAN` / `ZSCAN`.
//! - `sorted_set`: the sorted-set value type.

mod hash;
mod scan;
mod sorted_set;
mod store;
mod zset;

pub use sorted_set::SortedSet;
pub use store::{InMemoryStore, Value};
