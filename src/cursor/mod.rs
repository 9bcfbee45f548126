//! Cursor-based incremental walks.

pub mod scan_cursor;
pub mod step;

pub use scan_cursor::{
    CursorState, MapScanPage, ScanArgs, ScanCursor, ScanPage, ScoredValueScanPage,
    StreamScanCursor,
};
pub use step::{scan_command, scan_page, scan_stream, HashScan, ScanKind, ScanWalk, SortedSetScan};
