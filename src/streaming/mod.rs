//! Push-style delivery of page elements.

pub mod channel;
pub mod delivery;
pub mod element;

pub use channel::{Collector, StreamingChannel};
pub use delivery::{collect, deliver};
pub use element::{KeyValue, ReplyElement, ScoredValue};
