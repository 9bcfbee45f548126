use bytes::Bytes;
use kvscan_error::KvResult;

use super::Prepared;
use crate::{
    cursor::{
        scan_command, scan_page, scan_stream, HashScan, MapScanPage, ScanArgs, ScanCursor,
        ScanKind, ScanPage, ScoredValueScanPage, SortedSetScan, StreamScanCursor,
    },
    streaming::{KeyValue, ScoredValue, StreamingChannel},
};

/// One bulk scan step. `cursor` is `None` to start a walk.
pub fn scan<S>(
    key: impl Into<Bytes>,
    cursor: Option<&ScanCursor>,
    args: Option<&ScanArgs>,
) -> KvResult<Prepared<'static, ScanPage<S::Element>>>
where
    S: ScanKind,
    S::Element: 'static,
{
    let command = scan_command::<S>(&key.into(), cursor, args)?;
    Ok(Prepared::new(command, scan_page::<S>))
}

/// One streamed scan step.
pub fn scan_streaming<'a, S, C>(
    channel: &'a mut C,
    key: impl Into<Bytes>,
    cursor: Option<&ScanCursor>,
    args: Option<&ScanArgs>,
) -> KvResult<Prepared<'a, StreamScanCursor>>
where
    S: ScanKind,
    C: StreamingChannel<S::Element> + Send + ?Sized,
{
    let command = scan_command::<S>(&key.into(), cursor, args)?;
    Ok(Prepared::new(command, move |reply| {
        scan_stream::<S, C>(reply, channel)
    }))
}

pub fn hscan(
    key: impl Into<Bytes>,
    cursor: Option<&ScanCursor>,
    args: Option<&ScanArgs>,
) -> KvResult<Prepared<'static, MapScanPage>> {
    scan::<HashScan>(key, cursor, args)
}

pub fn hscan_stream<'a, C>(
    channel: &'a mut C,
    key: impl Into<Bytes>,
    cursor: Option<&ScanCursor>,
    args: Option<&ScanArgs>,
) -> KvResult<Prepared<'a, StreamScanCursor>>
where
    C: StreamingChannel<KeyValue> + Send + ?Sized,
{
    scan_streaming::<HashScan, C>(channel, key, cursor, args)
}

pub fn zscan(
    key: impl Into<Bytes>,
    cursor: Option<&ScanCursor>,
    args: Option<&ScanArgs>,
) -> KvResult<Prepared<'static, ScoredValueScanPage>> {
    scan::<SortedSetScan>(key, cursor, args)
}

pub fn zscan_stream<'a, C>(
    channel: &'a mut C,
    key: impl Into<Bytes>,
    cursor: Option<&ScanCursor>,
    args: Option<&ScanArgs>,
) -> KvResult<Prepared<'a, StreamScanCursor>>
where
    C: StreamingChannel<ScoredValue> + Send + ?Sized,
{
    scan_streaming::<SortedSetScan, C>(channel, key, cursor, args)
}

#[cfg(test)]
mod tests {
    use kvscan_error::StatusCode;

    use super::*;
    use crate::protocol::Reply;

    #[test]
    fn test_hscan_step() {
        let args = ScanArgs::new().matches("f*");
        let p = hscan("h", None, Some(&args)).unwrap();
        assert_eq!(p.command().to_string(), "HSCAN h 0 MATCH f*");
        let page = p
            .decode(Reply::array([
                Reply::from("7"),
                Reply::array([Reply::from("f1"), Reply::from("v1")]),
            ]))
            .unwrap();
        assert!(!page.is_finished());
        assert_eq!(page.elements, vec![KeyValue::new("f1", "v1")]);
    }

    #[test]
    fn test_finished_cursor_builds_nothing() {
        let done = ScanCursor::new("0", true);
        let err = zscan("z", Some(&done), None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidCursor);
    }

    #[test]
    fn test_zscan_stream_step() {
        let mut members = Vec::new();
        let mut channel = |sv: ScoredValue| -> KvResult<()> {
            members.push(sv.value);
            Ok(())
        };
        let step = zscan_stream(&mut channel, "z", None, None)
            .unwrap()
            .decode(Reply::array([
                Reply::from("0"),
                Reply::array([Reply::from("m"), Reply::from("2")]),
            ]))
            .unwrap();
        assert!(step.is_finished());
        assert_eq!(step.count, 1);
        assert_eq!(members, vec![Bytes::from_static(b"m")]);
    }
}
