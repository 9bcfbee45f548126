use std::collections::BTreeMap;

use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};

use super::{collected, streamed, Prepared};
use crate::{
    protocol::{Command, CommandArgs, CommandType},
    streaming::{KeyValue, StreamingChannel},
};

fn keyed(key: impl Into<Bytes>) -> CommandArgs {
    CommandArgs::new().add(key.into())
}

fn non_empty<T>(
    kind: CommandType,
    items: &[T],
    what: &str,
) -> KvResult<()> {
    if items.is_empty() {
        return Err(
            CommandError::invalid_argument(format!("{kind} needs at least one {what}")).into(),
        );
    }
    Ok(())
}

pub fn hdel(
    key: impl Into<Bytes>,
    fields: &[Bytes],
) -> KvResult<Prepared<'static, i64>> {
    non_empty(CommandType::Hdel, fields, "field")?;
    let args = keyed(key).add_keys(fields);
    Ok(Prepared::new(Command::new(CommandType::Hdel, args), |r| {
        r.into_integer("HDEL")
    }))
}

pub fn hexists(
    key: impl Into<Bytes>,
    field: impl Into<Bytes>,
) -> Prepared<'static, bool> {
    let args = keyed(key).add(field.into());
    Prepared::new(Command::new(CommandType::Hexists, args), |r| {
        r.into_bool("HEXISTS")
    })
}

pub fn hget(
    key: impl Into<Bytes>,
    field: impl Into<Bytes>,
) -> Prepared<'static, Option<Bytes>> {
    let args = keyed(key).add(field.into());
    Prepared::new(Command::new(CommandType::Hget, args), |r| r.into_bulk("HGET"))
}

pub fn hincrby(
    key: impl Into<Bytes>,
    field: impl Into<Bytes>,
    amount: i64,
) -> Prepared<'static, i64> {
    let args = keyed(key)
        .add(field.into())
        .add_int(amount);
    Prepared::new(Command::new(CommandType::Hincrby, args), |r| {
        r.into_integer("HINCRBY")
    })
}

pub fn hincrbyfloat(
    key: impl Into<Bytes>,
    field: impl Into<Bytes>,
    amount: f64,
) -> KvResult<Prepared<'static, f64>> {
    if !amount.is_finite() {
        return Err(CommandError::invalid_argument("increment must be a finite number").into());
    }
    let args = keyed(key)
        .add(field.into())
        .add_score(amount);
    Ok(Prepared::new(Command::new(CommandType::Hincrbyfloat, args), |r| {
        r.into_score("HINCRBYFLOAT")?
            .ok_or_else(|| CommandError::malformed("HINCRBYFLOAT", "nil result").into())
    }))
}

/// All fields and values. A field appears once, so the page folds into a map.
pub fn hgetall(key: impl Into<Bytes>) -> Prepared<'static, BTreeMap<Bytes, Bytes>> {
    let args = keyed(key);
    collected::<KeyValue>(Command::new(CommandType::Hgetall, args))
        .map(|entries| entries.into_iter().map(|kv| (kv.key, kv.value)).collect())
}

pub fn hgetall_stream<'a, C>(
    channel: &'a mut C,
    key: impl Into<Bytes>,
) -> Prepared<'a, u64>
where
    C: StreamingChannel<KeyValue> + Send + ?Sized,
{
    let args = keyed(key);
    streamed::<KeyValue, C>(Command::new(CommandType::Hgetall, args), channel)
}

pub fn hkeys(key: impl Into<Bytes>) -> Prepared<'static, Vec<Bytes>> {
    let args = keyed(key);
    collected::<Bytes>(Command::new(CommandType::Hkeys, args))
}

pub fn hkeys_stream<'a, C>(
    channel: &'a mut C,
    key: impl Into<Bytes>,
) -> Prepared<'a, u64>
where
    C: StreamingChannel<Bytes> + Send + ?Sized,
{
    let args = keyed(key);
    streamed::<Bytes, C>(Command::new(CommandType::Hkeys, args), channel)
}

pub fn hlen(key: impl Into<Bytes>) -> Prepared<'static, i64> {
    let args = keyed(key);
    Prepared::new(Command::new(CommandType::Hlen, args), |r| {
        r.into_integer("HLEN")
    })
}

/// Values of `fields`, in order, `None` for missing fields.
pub fn hmget(
    key: impl Into<Bytes>,
    fields: &[Bytes],
) -> KvResult<Prepared<'static, Vec<Option<Bytes>>>> {
    non_empty(CommandType::Hmget, fields, "field")?;
    let args = keyed(key).add_keys(fields);
    Ok(collected::<Option<Bytes>>(Command::new(CommandType::Hmget, args)))
}

pub fn hmget_stream<'a, C>(
    channel: &'a mut C,
    key: impl Into<Bytes>,
    fields: &[Bytes],
) -> KvResult<Prepared<'a, u64>>
where
    C: StreamingChannel<Option<Bytes>> + Send + ?Sized,
{
    non_empty(CommandType::Hmget, fields, "field")?;
    let args = keyed(key).add_keys(fields);
    Ok(streamed::<Option<Bytes>, C>(
        Command::new(CommandType::Hmget, args),
        channel,
    ))
}

pub fn hmset(
    key: impl Into<Bytes>,
    entries: &[(Bytes, Bytes)],
) -> KvResult<Prepared<'static, String>> {
    non_empty(CommandType::Hmset, entries, "field")?;
    let mut args = keyed(key);
    for (field, value) in entries {
        args = args.add(field.clone()).add(value.clone());
    }
    Ok(Prepared::new(Command::new(CommandType::Hmset, args), |r| {
        r.into_status("HMSET")
    }))
}

/// `true` if the field is new, `false` if an existing value was replaced.
pub fn hset(
    key: impl Into<Bytes>,
    field: impl Into<Bytes>,
    value: impl Into<Bytes>,
) -> Prepared<'static, bool> {
    let args = keyed(key)
        .add(field.into())
        .add(value.into());
    Prepared::new(Command::new(CommandType::Hset, args), |r| r.into_bool("HSET"))
}

pub fn hsetnx(
    key: impl Into<Bytes>,
    field: impl Into<Bytes>,
    value: impl Into<Bytes>,
) -> Prepared<'static, bool> {
    let args = keyed(key)
        .add(field.into())
        .add(value.into());
    Prepared::new(Command::new(CommandType::Hsetnx, args), |r| {
        r.into_bool("HSETNX")
    })
}

pub fn hvals(key: impl Into<Bytes>) -> Prepared<'static, Vec<Bytes>> {
    let args = keyed(key);
    collected::<Bytes>(Command::new(CommandType::Hvals, args))
}

pub fn hvals_stream<'a, C>(
    channel: &'a mut C,
    key: impl Into<Bytes>,
) -> Prepared<'a, u64>
where
    C: StreamingChannel<Bytes> + Send + ?Sized,
{
    let args = keyed(key);
    streamed::<Bytes, C>(Command::new(CommandType::Hvals, args), channel)
}

#[cfg(test)]
mod tests {
    use kvscan_error::StatusCode;

    use super::*;
    use crate::{protocol::Reply, streaming::Collector};

    #[test]
    fn test_hset_shape_and_decode() {
        let p = hset("h", "f", "v");
        assert_eq!(p.command().to_string(), "HSET h f v");
        assert!(p.decode(Reply::Integer(1)).unwrap());
    }

    #[test]
    fn test_hmget_keeps_missing_fields() {
        let fields = [Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let p = hmget("h", &fields).unwrap();
        assert_eq!(p.command().to_string(), "HMGET h a b");
        let out = p
            .decode(Reply::array([Reply::from("1"), Reply::Bulk(None)]))
            .unwrap();
        assert_eq!(out, vec![Some(Bytes::from_static(b"1")), None]);
    }

    #[test]
    fn test_empty_field_list_rejected() {
        let err = hdel("h", &[]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }

    #[test]
    fn test_hgetall_folds_pairs() {
        let out = hgetall("h")
            .decode(Reply::array([
                Reply::from("f1"),
                Reply::from("v1"),
                Reply::from("f2"),
                Reply::from("v2"),
            ]))
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[&Bytes::from_static(b"f2")], Bytes::from_static(b"v2"));
    }

    #[test]
    fn test_stream_variants_push_in_wire_order() {
        let mut pairs = Collector::new();
        let n = hgetall_stream(&mut pairs, "h")
            .decode(Reply::array([
                Reply::from("f2"),
                Reply::from("v2"),
                Reply::from("f1"),
                Reply::from("v1"),
            ]))
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            pairs.into_inner(),
            vec![KeyValue::new("f2", "v2"), KeyValue::new("f1", "v1")]
        );

        let mut values = Collector::new();
        let fields = [Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let n = hmget_stream(&mut values, "h", &fields)
            .unwrap()
            .decode(Reply::array([Reply::Bulk(None), Reply::from("2")]))
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(values.into_inner(), vec![None, Some(Bytes::from_static(b"2"))]);
    }

    #[test]
    fn test_hincrbyfloat_parses_bulk_reply() {
        let p = hincrbyfloat("h", "f", 0.5).unwrap();
        assert_eq!(p.command().to_string(), "HINCRBYFLOAT h f 0.5");
        assert_eq!(p.decode(Reply::from("10.5")).unwrap(), 10.5);
    }

    #[test]
    fn test_wrong_type_surfaces() {
        let err = hget("k", "f")
            .decode(Reply::Error(
                "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
            ))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::WrongType);
    }
}
