use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};

use super::{collected, streamed, Prepared};
use crate::{
    protocol::{Command, CommandArgs, CommandType, LexRange, ScoreRange},
    range::{store_command, RangeQuery, StoreArgs, StoreMode},
    streaming::{ReplyElement, ScoredValue, StreamingChannel},
};

fn keyed(key: impl Into<Bytes>) -> CommandArgs {
    CommandArgs::new().add(key.into())
}

fn integer(
    kind: CommandType,
    args: CommandArgs,
) -> Prepared<'static, i64> {
    let name = kind.name();
    Prepared::new(Command::new(kind, args), move |r| r.into_integer(name))
}

fn check_score(score: f64) -> KvResult<()> {
    if score.is_nan() {
        return Err(CommandError::invalid_argument("score is not a number").into());
    }
    Ok(())
}

/// Adds or updates one member.
pub fn zadd(
    key: impl Into<Bytes>,
    score: f64,
    member: impl Into<Bytes>,
) -> KvResult<Prepared<'static, i64>> {
    zadd_multi(key, &[(score, member.into())])
}

/// Adds or updates `(score, member)` pairs; replies the number of new members.
pub fn zadd_multi(
    key: impl Into<Bytes>,
    entries: &[(f64, Bytes)],
) -> KvResult<Prepared<'static, i64>> {
    if entries.is_empty() {
        return Err(CommandError::invalid_argument("ZADD needs at least one member").into());
    }
    let mut args = keyed(key);
    for (score, member) in entries {
        check_score(*score)?;
        args = args.add_score(*score).add(member.clone());
    }
    Ok(integer(CommandType::Zadd, args))
}

pub fn zcard(key: impl Into<Bytes>) -> Prepared<'static, i64> {
    integer(CommandType::Zcard, keyed(key))
}

pub fn zcount(
    key: impl Into<Bytes>,
    range: ScoreRange,
) -> Prepared<'static, i64> {
    let args = keyed(key).add(range.min.to_arg()).add(range.max.to_arg());
    integer(CommandType::Zcount, args)
}

/// Increments a member's score, replying the new score.
pub fn zincrby(
    key: impl Into<Bytes>,
    amount: f64,
    member: impl Into<Bytes>,
) -> KvResult<Prepared<'static, f64>> {
    check_score(amount)?;
    let args = keyed(key).add_score(amount).add(member.into());
    Ok(Prepared::new(Command::new(CommandType::Zincrby, args), |r| {
        r.into_score("ZINCRBY")?
            .ok_or_else(|| CommandError::malformed("ZINCRBY", "nil score").into())
    }))
}

/// Stores the intersection of `keys` at `destination`; replies its cardinality.
pub fn zinterstore(
    destination: impl Into<Bytes>,
    keys: &[Bytes],
    args: Option<&StoreArgs>,
) -> KvResult<Prepared<'static, i64>> {
    store(StoreMode::Intersect, destination, keys, args)
}

/// Stores the union of `keys` at `destination`; replies its cardinality.
pub fn zunionstore(
    destination: impl Into<Bytes>,
    keys: &[Bytes],
    args: Option<&StoreArgs>,
) -> KvResult<Prepared<'static, i64>> {
    store(StoreMode::Union, destination, keys, args)
}

fn store(
    mode: StoreMode,
    destination: impl Into<Bytes>,
    keys: &[Bytes],
    args: Option<&StoreArgs>,
) -> KvResult<Prepared<'static, i64>> {
    let command = store_command(mode, &destination.into(), keys, args)?;
    let name = command.name();
    Ok(Prepared::new(command, move |r| r.into_integer(name)))
}

pub fn zlexcount(
    key: impl Into<Bytes>,
    range: &LexRange,
) -> Prepared<'static, i64> {
    let args = keyed(key).add(range.min.to_arg()).add(range.max.to_arg());
    integer(CommandType::Zlexcount, args)
}

/// Range read materialized into a page.
///
/// `E` is `Bytes` for plain members or `ScoredValue` for a query built with
/// [`RangeQuery::with_scores`]; a mismatch is rejected before dispatch.
pub fn range<E>(
    key: impl Into<Bytes>,
    query: &RangeQuery,
) -> KvResult<Prepared<'static, Vec<E>>>
where
    E: ReplyElement + 'static,
{
    query.expect_element::<E>()?;
    Ok(collected::<E>(query.to_command(&key.into())?))
}

/// Range read pushed into `channel`; replies the element count.
pub fn range_stream<'a, E, C>(
    channel: &'a mut C,
    key: impl Into<Bytes>,
    query: &RangeQuery,
) -> KvResult<Prepared<'a, u64>>
where
    E: ReplyElement,
    C: StreamingChannel<E> + Send + ?Sized,
{
    query.expect_element::<E>()?;
    Ok(streamed::<E, C>(query.to_command(&key.into())?, channel))
}

/// Shorthand for `range::<Bytes>`.
pub fn zrange(
    key: impl Into<Bytes>,
    query: &RangeQuery,
) -> KvResult<Prepared<'static, Vec<Bytes>>> {
    range::<Bytes>(key, query)
}

/// Members with their scores. Sets `WITHSCORES` on a copy of `query`.
pub fn zrange_with_scores(
    key: impl Into<Bytes>,
    query: &RangeQuery,
) -> KvResult<Prepared<'static, Vec<ScoredValue>>> {
    range::<ScoredValue>(key, &query.clone().with_scores())
}

fn rank(
    kind: CommandType,
    key: impl Into<Bytes>,
    member: impl Into<Bytes>,
) -> Prepared<'static, Option<i64>> {
    let name = kind.name();
    let args = keyed(key).add(member.into());
    Prepared::new(Command::new(kind, args), move |r| {
        r.into_optional_integer(name)
    })
}

/// Zero-based rank by ascending score, `None` if the member is absent.
pub fn zrank(
    key: impl Into<Bytes>,
    member: impl Into<Bytes>,
) -> Prepared<'static, Option<i64>> {
    rank(CommandType::Zrank, key, member)
}

pub fn zrevrank(
    key: impl Into<Bytes>,
    member: impl Into<Bytes>,
) -> Prepared<'static, Option<i64>> {
    rank(CommandType::Zrevrank, key, member)
}

pub fn zrem(
    key: impl Into<Bytes>,
    members: &[Bytes],
) -> KvResult<Prepared<'static, i64>> {
    if members.is_empty() {
        return Err(CommandError::invalid_argument("ZREM needs at least one member").into());
    }
    Ok(integer(CommandType::Zrem, keyed(key).add_keys(members)))
}

pub fn zremrangebylex(
    key: impl Into<Bytes>,
    range: &LexRange,
) -> Prepared<'static, i64> {
    let args = keyed(key).add(range.min.to_arg()).add(range.max.to_arg());
    integer(CommandType::Zremrangebylex, args)
}

pub fn zremrangebyrank(
    key: impl Into<Bytes>,
    start: i64,
    stop: i64,
) -> Prepared<'static, i64> {
    let args = keyed(key).add_int(start).add_int(stop);
    integer(CommandType::Zremrangebyrank, args)
}

pub fn zremrangebyscore(
    key: impl Into<Bytes>,
    range: ScoreRange,
) -> Prepared<'static, i64> {
    let args = keyed(key).add(range.min.to_arg()).add(range.max.to_arg());
    integer(CommandType::Zremrangebyscore, args)
}

pub fn zscore(
    key: impl Into<Bytes>,
    member: impl Into<Bytes>,
) -> Prepared<'static, Option<f64>> {
    let args = keyed(key).add(member.into());
    Prepared::new(Command::new(CommandType::Zscore, args), |r| {
        r.into_score("ZSCORE")
    })
}

#[cfg(test)]
mod tests {
    use kvscan_error::StatusCode;

    use super::*;
    use crate::protocol::{LexBound, Reply, ScoreBound};

    #[test]
    fn test_zadd_typed_pairs() {
        let entries = [
            (1.5, Bytes::from_static(b"a")),
            (f64::NEG_INFINITY, Bytes::from_static(b"b")),
        ];
        let p = zadd_multi("z", &entries).unwrap();
        assert_eq!(p.command().to_string(), "ZADD z 1.5 a -inf b");
        assert_eq!(p.decode(Reply::Integer(2)).unwrap(), 2);
    }

    #[test]
    fn test_zadd_rejects_nan() {
        let err = zadd("z", f64::NAN, "m").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }

    #[test]
    fn test_zscore_nil_and_infinite() {
        assert_eq!(zscore("z", "m").decode(Reply::Bulk(None)).unwrap(), None);
        assert_eq!(
            zscore("z", "m").decode(Reply::from("+inf")).unwrap(),
            Some(f64::INFINITY)
        );
    }

    #[test]
    fn test_zrank_absent_member() {
        assert_eq!(zrank("z", "m").decode(Reply::Null).unwrap(), None);
        assert_eq!(zrevrank("z", "m").decode(Reply::Integer(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_count_commands() {
        let p = zcount("z", ScoreRange::new(ScoreBound::Exclusive(1.0), 5.0));
        assert_eq!(p.command().to_string(), "ZCOUNT z (1 5");

        let lex = LexRange::new(LexBound::Min, LexBound::Exclusive("m".into()));
        assert_eq!(zlexcount("z", &lex).command().to_string(), "ZLEXCOUNT z - (m");
    }

    #[test]
    fn test_zrange_with_scores_sets_flag() {
        let q = RangeQuery::by_rank(0, -1);
        let p = zrange_with_scores("z", &q).unwrap();
        assert_eq!(p.command().to_string(), "ZRANGE z 0 -1 WITHSCORES");

        let err = range::<ScoredValue>("z", &q).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }

    #[test]
    fn test_store_commands() {
        let keys = [Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let p = zinterstore("d", &keys, None).unwrap();
        assert_eq!(p.command().to_string(), "ZINTERSTORE d 2 a b");
        assert_eq!(p.decode(Reply::Integer(1)).unwrap(), 1);
    }
}
