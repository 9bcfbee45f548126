use std::fmt;

use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};
use serde::{Deserialize, Serialize};

use crate::{
    protocol::CommandArgs,
    streaming::{KeyValue, ScoredValue},
};

/// Resume position of an incremental walk.
///
/// `position` is an opaque token issued by the store. It is never built on the
/// client side, only sent back as received. The one exception is the protocol
/// start token `"0"`, which opens a walk and, when the store hands it back,
/// marks the walk as finished.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanCursor {
    position: Bytes,
    finished: bool,
}

impl ScanCursor {
    /// Protocol token that starts a walk and signals its end.
    pub const START_TOKEN: &'static [u8] = b"0";

    /// Cursor for a fresh walk.
    pub fn initial() -> Self {
        Self {
            position: Bytes::from_static(Self::START_TOKEN),
            finished: false,
        }
    }

    /// Rebuilds a cursor previously obtained from the store, e.g. after it was
    /// persisted between two steps of the same walk.
    pub fn new(
        position: impl Into<Bytes>,
        finished: bool,
    ) -> Self {
        Self {
            position: position.into(),
            finished,
        }
    }

    /// Cursor as returned by the store in a scan reply.
    pub(crate) fn from_store(position: Bytes) -> Self {
        let finished = position.as_ref() == Self::START_TOKEN;
        Self { position, finished }
    }

    pub fn position(&self) -> &Bytes {
        &self.position
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl fmt::Display for ScanCursor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{}{}",
            String::from_utf8_lossy(&self.position),
            if self.finished { " (finished)" } else { "" }
        )
    }
}

/// Optional scan parameters: `MATCH` pattern and `COUNT` hint.
///
/// The pattern is applied by the store. The count is a hint only: the store
/// picks the actual page length, which may be larger, smaller or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanArgs {
    match_pattern: Option<Bytes>,
    count: Option<u64>,
}

impl ScanArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(
        mut self,
        pattern: impl Into<Bytes>,
    ) -> Self {
        self.match_pattern = Some(pattern.into());
        self
    }

    pub fn limit(
        mut self,
        count: u64,
    ) -> Self {
        self.count = Some(count);
        self
    }

    pub fn match_pattern(&self) -> Option<&Bytes> {
        self.match_pattern.as_ref()
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub(crate) fn apply(
        &self,
        mut args: CommandArgs,
    ) -> KvResult<CommandArgs> {
        if let Some(pattern) = &self.match_pattern {
            args = args.add_keyword("MATCH").add(pattern.clone());
        }
        if let Some(count) = self.count {
            if count == 0 {
                return Err(CommandError::invalid_argument("COUNT must be positive").into());
            }
            let count = i64::try_from(count)
                .map_err(|_| CommandError::invalid_argument("COUNT out of range"))?;
            args = args.add_keyword("COUNT").add_int(count);
        }
        Ok(args)
    }
}

/// Where a walk stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    /// No request issued yet.
    Initial,
    /// At least one page received, more pages available.
    InProgress(ScanCursor),
    /// The store reported the end of the walk.
    Done(ScanCursor),
}

impl CursorState {
    /// Classifies a caller-held cursor; `None` is the initial state.
    pub fn of(cursor: Option<&ScanCursor>) -> Self {
        match cursor {
            None => CursorState::Initial,
            Some(c) if c.is_finished() => CursorState::Done(c.clone()),
            Some(c) => CursorState::InProgress(c.clone()),
        }
    }

    /// State reached after the store returned `cursor`.
    pub fn after(cursor: &ScanCursor) -> Self {
        if cursor.is_finished() {
            CursorState::Done(cursor.clone())
        } else {
            CursorState::InProgress(cursor.clone())
        }
    }

    pub fn cursor(&self) -> Option<&ScanCursor> {
        match self {
            CursorState::Initial => None,
            CursorState::InProgress(c) | CursorState::Done(c) => Some(c),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, CursorState::Done(_))
    }
}

/// One page of a bulk scan with the cursor to continue from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage<E> {
    pub cursor: ScanCursor,
    pub elements: Vec<E>,
}

impl<E> ScanPage<E> {
    pub fn is_finished(&self) -> bool {
        self.cursor.is_finished()
    }
}

/// Hash scan page. Entries stay in a `Vec`: a field seen twice during a walk
/// is reported twice.
pub type MapScanPage = ScanPage<KeyValue>;
pub type ScoredValueScanPage = ScanPage<ScoredValue>;

/// Result of a streamed scan step: elements already went to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamScanCursor {
    pub cursor: ScanCursor,
    pub count: u64,
}

impl StreamScanCursor {
    pub fn is_finished(&self) -> bool {
        self.cursor.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use kvscan_error::StatusCode;

    use super::*;

    #[test]
    fn test_initial_is_not_finished() {
        let c = ScanCursor::initial();
        assert_eq!(c.position().as_ref(), b"0");
        assert!(!c.is_finished());
    }

    #[test]
    fn test_store_start_token_finishes() {
        assert!(ScanCursor::from_store(Bytes::from_static(b"0")).is_finished());
        assert!(!ScanCursor::from_store(Bytes::from_static(b"17")).is_finished());
        assert!(!ScanCursor::from_store(Bytes::from_static(b"00")).is_finished());
    }

    #[test]
    fn test_cursor_state_transitions() {
        assert_eq!(CursorState::of(None), CursorState::Initial);
        let mid = ScanCursor::new("abc", false);
        assert_eq!(CursorState::of(Some(&mid)), CursorState::InProgress(mid.clone()));
        let end = ScanCursor::new("0", true);
        assert!(CursorState::after(&end).is_done());
        assert_eq!(CursorState::after(&mid).cursor(), Some(&mid));
    }

    #[test]
    fn test_scan_args_apply() {
        let args = ScanArgs::new().matches("user:*").limit(50);
        let out = args.apply(CommandArgs::new()).unwrap();
        let tokens: Vec<String> = out
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect();
        assert_eq!(tokens, vec!["MATCH", "user:*", "COUNT", "50"]);
    }

    #[test]
    fn test_zero_count_rejected() {
        let err = ScanArgs::new().limit(0).apply(CommandArgs::new()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }

    #[test]
    fn test_cursor_serde_round_trip() {
        let c = ScanCursor::new("opaque/token", false);
        let json = serde_json::to_string(&c).unwrap();
        let back: ScanCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
