/// Client surfaces, transports and completion handles.
pub mod client;
/// Prepared commands: structured command plus reply decoder.
pub mod command;
/// Settings loading (defaults, file, `KVSCAN_` environment).
pub mod config;
/// Scan cursors, scan arguments and the cursor walk state machine.
pub mod cursor;
/// Reference in-memory store for hashes and sorted sets.
pub mod engine;
/// Logging setup (filters, console layouts, rolling file sink).
pub mod logging;
/// Commands, replies and score notation.
pub mod protocol;
/// Sorted-set range queries and store-aggregate.
pub mod range;
/// Streaming delivery of reply elements into caller channels.
pub mod streaming;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Blocking and async clients.
pub use client::{
    AsyncClient, AsyncTransport, BlockingDispatcher, Client, ClientOptions, Completion,
    CompletionSender, ScanPages, Transport,
};
/// Prepared commands.
pub use command::Prepared;
/// Settings.
pub use config::Settings;
/// Cursor walks.
pub use cursor::{
    CursorState, HashScan, MapScanPage, ScanArgs, ScanCursor, ScanKind, ScanPage, ScanWalk,
    ScoredValueScanPage, SortedSetScan, StreamScanCursor,
};
/// Reference store.
pub use engine::{InMemoryStore, SortedSet, Value};
/// Error types shared by the whole workspace.
pub use kvscan_error::{CommandError, KvResult, StackError, StatusCode};
/// Logging.
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
/// Wire-level types.
pub use protocol::{Command, CommandArgs, CommandType, LexBound, LexRange, Reply, ScoreBound, ScoreRange};
/// Range queries and aggregation.
pub use range::{Aggregate, RangeBy, RangeQuery, StoreArgs, StoreMode};
/// Streaming delivery.
pub use streaming::{Collector, KeyValue, ReplyElement, ScoredValue, StreamingChannel};
