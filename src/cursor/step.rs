//! One step of a cursor walk, as pure functions.
//!
//! Building the request and interpreting the reply are separate so the same
//! logic serves blocking transports and completion handles alike.

use std::marker::PhantomData;

use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};
use tracing::trace;

use super::{CursorState, ScanArgs, ScanCursor, ScanPage, StreamScanCursor};
use crate::{
    protocol::{Command, CommandArgs, CommandType, Reply},
    streaming::{collect, deliver, KeyValue, ReplyElement, ScoredValue, StreamingChannel},
};

/// A kind of collection that can be walked with a cursor.
pub trait ScanKind: 'static {
    type Element: ReplyElement;

    const COMMAND: CommandType;
}

/// `HSCAN`: fields and values of a hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashScan;

impl ScanKind for HashScan {
    type Element = KeyValue;

    const COMMAND: CommandType = CommandType::Hscan;
}

/// `ZSCAN`: members and scores of a sorted set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortedSetScan;

impl ScanKind for SortedSetScan {
    type Element = ScoredValue;

    const COMMAND: CommandType = CommandType::Zscan;
}

/// Builds the request for the next step.
///
/// `None` starts a new walk. A finished cursor is rejected with
/// `InvalidCursor` and no command is produced.
pub fn scan_command<S: ScanKind>(
    key: &Bytes,
    cursor: Option<&ScanCursor>,
    args: Option<&ScanArgs>,
) -> KvResult<Command> {
    let position = match CursorState::of(cursor) {
        CursorState::Initial => Bytes::from_static(ScanCursor::START_TOKEN),
        CursorState::InProgress(c) => c.position().clone(),
        CursorState::Done(c) => {
            return Err(CommandError::InvalidCursor {
                reason: format!(
                    "{} cursor {c} is finished, start a new walk instead",
                    S::COMMAND
                ),
            }
            .into());
        }
    };

    let mut cmd_args = CommandArgs::new().add_key(key).add(position);
    if let Some(args) = args {
        cmd_args = args.apply(cmd_args)?;
    }
    Ok(Command::new(S::COMMAND, cmd_args))
}

/// Interprets a step reply as a bulk page.
pub fn scan_page<S: ScanKind>(reply: Reply) -> KvResult<ScanPage<S::Element>> {
    let command = S::COMMAND.name();
    let (cursor, tokens) = split_scan_reply(reply, command)?;
    let elements = collect::<S::Element>(tokens, command)?;
    trace!(command, cursor = %cursor, page_len = elements.len(), "Scan step");
    Ok(ScanPage { cursor, elements })
}

/// Interprets a step reply by pushing each element into `channel`.
pub fn scan_stream<S, C>(
    reply: Reply,
    channel: &mut C,
) -> KvResult<StreamScanCursor>
where
    S: ScanKind,
    C: StreamingChannel<S::Element> + ?Sized,
{
    let command = S::COMMAND.name();
    let (cursor, tokens) = split_scan_reply(reply, command)?;
    let count = deliver::<S::Element, C>(tokens, channel, command)?;
    trace!(command, cursor = %cursor, count, "Streamed scan step");
    Ok(StreamScanCursor { cursor, count })
}

/// Splits `[cursor, [tokens...]]`.
fn split_scan_reply(
    reply: Reply,
    command: &'static str,
) -> KvResult<(ScanCursor, Vec<Reply>)> {
    if let Reply::Error(message) = &reply {
        if is_cursor_rejection(message) {
            return Err(CommandError::InvalidCursor {
                reason: message.clone(),
            }
            .into());
        }
    }

    let mut parts = reply.into_array(command)?;
    if parts.len() != 2 {
        return Err(CommandError::malformed(
            command,
            format!("expected [cursor, elements], got {} parts", parts.len()),
        )
        .into());
    }
    let tokens = parts.pop().map_or(Ok(Vec::new()), |r| r.into_array(command))?;
    let position = parts
        .pop()
        .map_or(Ok(None), |r| r.into_bulk(command))?
        .ok_or_else(|| CommandError::malformed(command, "nil cursor"))?;

    Ok((ScanCursor::from_store(position), tokens))
}

fn is_cursor_rejection(message: &str) -> bool {
    message.to_ascii_lowercase().contains("invalid cursor")
}

/// Walk over a whole collection.
///
/// Holds the key, the scan arguments and the current [`CursorState`]. Each
/// round is `next_command` followed by `advance` (or `advance_streaming`) with
/// the reply. The walk never re-sends a step on its own: if a step fails the
/// state is left untouched and the error goes to the caller.
#[derive(Debug, Clone)]
pub struct ScanWalk<S: ScanKind> {
    key: Bytes,
    args: Option<ScanArgs>,
    state: CursorState,
    steps: u64,
    _kind: PhantomData<fn() -> S>,
}

impl<S: ScanKind> ScanWalk<S> {
    pub fn new(
        key: impl Into<Bytes>,
        args: Option<ScanArgs>,
    ) -> Self {
        Self {
            key: key.into(),
            args,
            state: CursorState::Initial,
            steps: 0,
            _kind: PhantomData,
        }
    }

    /// Continues a walk from a cursor obtained earlier.
    pub fn resume(
        key: impl Into<Bytes>,
        cursor: ScanCursor,
        args: Option<ScanArgs>,
    ) -> Self {
        Self {
            key: key.into(),
            args,
            state: CursorState::after(&cursor),
            steps: 0,
            _kind: PhantomData,
        }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// Steps completed by this walk object.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Request for the next step, `None` once the walk is done.
    pub fn next_command(&self) -> KvResult<Option<Command>> {
        if self.is_done() {
            return Ok(None);
        }
        scan_command::<S>(&self.key, self.state.cursor(), self.args.as_ref()).map(Some)
    }

    pub fn advance(
        &mut self,
        reply: Reply,
    ) -> KvResult<Vec<S::Element>> {
        let page = scan_page::<S>(reply)?;
        self.record(&page.cursor);
        Ok(page.elements)
    }

    pub fn advance_streaming<C>(
        &mut self,
        reply: Reply,
        channel: &mut C,
    ) -> KvResult<u64>
    where
        C: StreamingChannel<S::Element> + ?Sized,
    {
        let step = scan_stream::<S, C>(reply, channel)?;
        self.record(&step.cursor);
        Ok(step.count)
    }

    fn record(
        &mut self,
        cursor: &ScanCursor,
    ) {
        self.steps += 1;
        self.state = CursorState::after(cursor);
    }
}

#[cfg(test)]
mod tests {
    use kvscan_error::StatusCode;

    use super::*;

    fn reply(
        cursor: &str,
        tokens: &[&str],
    ) -> Reply {
        Reply::array([
            Reply::from(cursor),
            Reply::array(tokens.iter().map(|t| Reply::from(*t))),
        ])
    }

    fn key() -> Bytes {
        Bytes::from_static(b"h")
    }

    #[test]
    fn test_initial_command_uses_start_token() {
        let cmd = scan_command::<HashScan>(&key(), None, None).unwrap();
        assert_eq!(cmd.to_string(), "HSCAN h 0");
    }

    #[test]
    fn test_command_round_trips_cursor_token() {
        let c = ScanCursor::new("x:9/ab", false);
        let args = ScanArgs::new().limit(3);
        let cmd = scan_command::<SortedSetScan>(&key(), Some(&c), Some(&args)).unwrap();
        assert_eq!(cmd.to_string(), "ZSCAN h x:9/ab COUNT 3");
    }

    #[test]
    fn test_finished_cursor_rejected() {
        let c = ScanCursor::new("0", true);
        let err = scan_command::<HashScan>(&key(), Some(&c), None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidCursor);
    }

    #[test]
    fn test_page_parsing() {
        let page = scan_page::<HashScan>(reply("12", &["a", "1", "b", "2"])).unwrap();
        assert!(!page.is_finished());
        assert_eq!(page.cursor.position().as_ref(), b"12");
        assert_eq!(page.elements, vec![KeyValue::new("a", "1"), KeyValue::new("b", "2")]);

        let last = scan_page::<SortedSetScan>(reply("0", &["m", "inf"])).unwrap();
        assert!(last.is_finished());
        assert_eq!(last.elements[0].score, f64::INFINITY);
    }

    #[test]
    fn test_store_cursor_rejection() {
        let err = scan_page::<HashScan>(Reply::Error("ERR invalid cursor".into())).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidCursor);

        let err = scan_page::<HashScan>(Reply::Error("ERR other".into())).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ServerError);
    }

    #[test]
    fn test_malformed_shapes() {
        let err = scan_page::<HashScan>(Reply::array([Reply::from("0")])).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::MalformedReply);

        let err = scan_page::<HashScan>(reply("0", &["a"])).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::MalformedReply);

        let err = scan_page::<HashScan>(Reply::array([Reply::Bulk(None), Reply::array([])]))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::MalformedReply);
    }

    #[test]
    fn test_walk_state_machine() {
        let mut walk = ScanWalk::<HashScan>::new("h", None);
        assert_eq!(walk.state(), &CursorState::Initial);

        let cmd = walk.next_command().unwrap().unwrap();
        assert_eq!(cmd.to_string(), "HSCAN h 0");
        walk.advance(reply("5", &["a", "1"])).unwrap();
        assert!(matches!(walk.state(), CursorState::InProgress(_)));

        let cmd = walk.next_command().unwrap().unwrap();
        assert_eq!(cmd.to_string(), "HSCAN h 5");
        walk.advance(reply("0", &[])).unwrap();
        assert!(walk.is_done());
        assert_eq!(walk.steps(), 2);
        assert!(walk.next_command().unwrap().is_none());
    }

    #[test]
    fn test_walk_state_unchanged_on_error() {
        let mut walk = ScanWalk::<HashScan>::new("h", None);
        walk.advance(reply("5", &["a", "1"])).unwrap();
        assert!(walk.advance(Reply::Integer(1)).is_err());
        assert_eq!(walk.state().cursor().unwrap().position().as_ref(), b"5");
        assert_eq!(walk.steps(), 1);
    }
}
