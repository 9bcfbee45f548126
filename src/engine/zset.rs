//! Sorted-set command handlers.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::{
    store::{Args, InMemoryStore, Outcome, StoreFault},
    SortedSet,
};
use crate::{
    protocol::{format_score, parse_score, LexBound, LexRange, Reply, ScoreBound, ScoreRange},
    range::{aggregate, Aggregate, StoreMode},
};

fn score_reply(score: f64) -> Reply {
    Reply::Bulk(Some(Bytes::from(format_score(score))))
}

fn members_reply<'a>(
    items: impl Iterator<Item = (&'a Bytes, f64)>,
    with_scores: bool,
) -> Reply {
    let mut out = Vec::new();
    for (member, score) in items {
        out.push(Reply::Bulk(Some(member.clone())));
        if with_scores {
            out.push(score_reply(score));
        }
    }
    Reply::Array(out)
}

fn score_bound(args: &mut Args<'_>) -> Result<ScoreBound, StoreFault> {
    let text = args.next_text().map_err(|_| StoreFault::ScoreRange)?;
    ScoreBound::parse(text).map_err(|_| StoreFault::ScoreRange)
}

fn lex_bound(args: &mut Args<'_>) -> Result<LexBound, StoreFault> {
    let raw = args.next()?;
    match raw.first() {
        Some(b'-') if raw.len() == 1 => Ok(LexBound::Min),
        Some(b'+') if raw.len() == 1 => Ok(LexBound::Max),
        Some(b'[') => Ok(LexBound::Inclusive(raw.slice(1..))),
        Some(b'(') => Ok(LexBound::Exclusive(raw.slice(1..))),
        _ => Err(StoreFault::LexRange),
    }
}

/// Reads `first second` and orders them as `(min, max)`.
fn score_range(
    args: &mut Args<'_>,
    reverse: bool,
) -> Result<ScoreRange, StoreFault> {
    let first = score_bound(args)?;
    let second = score_bound(args)?;
    Ok(if reverse {
        ScoreRange::new(second, first)
    } else {
        ScoreRange::new(first, second)
    })
}

fn lex_range(
    args: &mut Args<'_>,
    reverse: bool,
) -> Result<LexRange, StoreFault> {
    let first = lex_bound(args)?;
    let second = lex_bound(args)?;
    Ok(if reverse {
        LexRange::new(second, first)
    } else {
        LexRange::new(first, second)
    })
}

/// Inclusive index window of `start..=stop` over `len` items, negative
/// indexes counting from the end.
fn rank_window(
    len: usize,
    start: i64,
    stop: i64,
) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Trailing `WITHSCORES` / `LIMIT offset count` options.
struct RangeOptions {
    with_scores: bool,
    offset: usize,
    count: Option<usize>,
}

fn range_options(
    args: &mut Args<'_>,
    allow_scores: bool,
    allow_limit: bool,
) -> Result<RangeOptions, StoreFault> {
    let mut opts = RangeOptions {
        with_scores: false,
        offset: 0,
        count: None,
    };
    while !args.is_empty() {
        let word = args.next_text()?.to_ascii_uppercase();
        match word.as_str() {
            "WITHSCORES" if allow_scores => opts.with_scores = true,
            "LIMIT" if allow_limit => {
                let offset = args.next_int()?;
                let count = args.next_int()?;
                if offset < 0 {
                    // A negative offset selects nothing.
                    opts.count = Some(0);
                } else {
                    opts.offset = offset as usize;
                    opts.count = usize::try_from(count).ok();
                }
            }
            _ => return Err(StoreFault::Syntax),
        }
    }
    Ok(opts)
}

fn window<'a, I>(
    items: I,
    opts: &RangeOptions,
) -> impl Iterator<Item = (&'a Bytes, f64)>
where
    I: Iterator<Item = (&'a Bytes, f64)>,
{
    items.skip(opts.offset).take(opts.count.unwrap_or(usize::MAX))
}

pub(crate) fn zadd(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let rest = args.rest()?;
    if rest.len() % 2 != 0 {
        return Err(StoreFault::Syntax);
    }
    let mut entries = Vec::with_capacity(rest.len() / 2);
    for pair in rest.chunks_exact(2) {
        let score = parse_score(&pair[0], args.name()).map_err(|_| StoreFault::NotFloat)?;
        entries.push((score, pair[1].clone()));
    }
    let added = store.write_zset(key, |z| {
        Ok(entries
            .into_iter()
            .filter(|(score, member)| z.insert(member.clone(), *score))
            .count())
    })?;
    Ok(Reply::Integer(added as i64))
}

pub(crate) fn zcard(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    args.finish()?;
    let len = store.read_zset(key, |z| z.len())?.unwrap_or(0);
    Ok(Reply::Integer(len as i64))
}

pub(crate) fn zcount(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let range = score_range(args, false)?;
    args.finish()?;
    let n = store
        .read_zset(key, |z| z.ascending().filter(|(_, s)| range.contains(*s)).count())?
        .unwrap_or(0);
    Ok(Reply::Integer(n as i64))
}

pub(crate) fn zincrby(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let amount = args.next_score()?;
    let member = args.next()?;
    args.finish()?;
    let score = store.write_zset(key, |z| {
        let next = z.score(member).unwrap_or(0.0) + amount;
        if next.is_nan() {
            return Err(StoreFault::NotFinite);
        }
        z.insert(member.clone(), next);
        Ok(next)
    })?;
    Ok(score_reply(score))
}

pub(crate) fn zlexcount(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let range = lex_range(args, false)?;
    args.finish()?;
    let n = store
        .read_zset(key, |z| z.ascending().filter(|(m, _)| range.contains(m)).count())?
        .unwrap_or(0);
    Ok(Reply::Integer(n as i64))
}

/// `ZRANGE` / `ZREVRANGE key start stop [WITHSCORES]`.
pub(crate) fn zrange(
    store: &InMemoryStore,
    args: &mut Args<'_>,
    reverse: bool,
) -> Outcome {
    let key = args.next()?;
    let start = args.next_int()?;
    let stop = args.next_int()?;
    let opts = range_options(args, true, false)?;
    let reply = store.read_zset(key, |z| {
        let Some((from, to)) = rank_window(z.len(), start, stop) else {
            return Reply::Array(Vec::new());
        };
        let take = to - from + 1;
        if reverse {
            members_reply(z.ascending().rev().skip(from).take(take), opts.with_scores)
        } else {
            members_reply(z.ascending().skip(from).take(take), opts.with_scores)
        }
    })?;
    Ok(reply.unwrap_or(Reply::Array(Vec::new())))
}

/// `ZRANGEBYSCORE key min max` / `ZREVRANGEBYSCORE key max min`, with
/// `WITHSCORES` and `LIMIT`.
pub(crate) fn zrangebyscore(
    store: &InMemoryStore,
    args: &mut Args<'_>,
    reverse: bool,
) -> Outcome {
    let key = args.next()?;
    let range = score_range(args, reverse)?;
    let opts = range_options(args, true, true)?;
    let reply = store.read_zset(key, |z| {
        let matching = |(_, s): &(&Bytes, f64)| range.contains(*s);
        if reverse {
            members_reply(window(z.ascending().rev().filter(matching), &opts), opts.with_scores)
        } else {
            members_reply(window(z.ascending().filter(matching), &opts), opts.with_scores)
        }
    })?;
    Ok(reply.unwrap_or(Reply::Array(Vec::new())))
}

/// `ZRANGEBYLEX key min max` / `ZREVRANGEBYLEX key max min`, with `LIMIT`.
pub(crate) fn zrangebylex(
    store: &InMemoryStore,
    args: &mut Args<'_>,
    reverse: bool,
) -> Outcome {
    let key = args.next()?;
    let range = lex_range(args, reverse)?;
    let opts = range_options(args, false, true)?;
    let reply = store.read_zset(key, |z| {
        let matching = |(m, _): &(&Bytes, f64)| range.contains(m);
        if reverse {
            members_reply(window(z.ascending().rev().filter(matching), &opts), false)
        } else {
            members_reply(window(z.ascending().filter(matching), &opts), false)
        }
    })?;
    Ok(reply.unwrap_or(Reply::Array(Vec::new())))
}

pub(crate) fn zrank(
    store: &InMemoryStore,
    args: &mut Args<'_>,
    reverse: bool,
) -> Outcome {
    let key = args.next()?;
    let member = args.next()?;
    args.finish()?;
    let rank = store
        .read_zset(key, |z| {
            z.rank(member)
                .map(|r| if reverse { z.len() - 1 - r } else { r })
        })?
        .flatten();
    Ok(match rank {
        Some(r) => Reply::Integer(r as i64),
        None => Reply::Bulk(None),
    })
}

pub(crate) fn zrem(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let members = args.rest()?;
    let removed = store.write_zset(key, |z| Ok(members.iter().filter(|m| z.remove(m)).count()))?;
    Ok(Reply::Integer(removed as i64))
}

fn remove_where(
    store: &InMemoryStore,
    key: &Bytes,
    select: impl FnOnce(&SortedSet) -> Vec<Bytes>,
) -> Outcome {
    let removed = store.write_zset(key, |z| {
        let doomed = select(z);
        for member in &doomed {
            z.remove(member);
        }
        Ok(doomed.len())
    })?;
    Ok(Reply::Integer(removed as i64))
}

pub(crate) fn zremrangebylex(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let range = lex_range(args, false)?;
    args.finish()?;
    remove_where(store, key, |z| {
        z.ascending()
            .filter(|(m, _)| range.contains(m))
            .map(|(m, _)| m.clone())
            .collect()
    })
}

pub(crate) fn zremrangebyrank(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let start = args.next_int()?;
    let stop = args.next_int()?;
    args.finish()?;
    remove_where(store, key, |z| match rank_window(z.len(), start, stop) {
        Some((from, to)) => z
            .ascending()
            .skip(from)
            .take(to - from + 1)
            .map(|(m, _)| m.clone())
            .collect(),
        None => Vec::new(),
    })
}

pub(crate) fn zremrangebyscore(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let range = score_range(args, false)?;
    args.finish()?;
    remove_where(store, key, |z| {
        z.ascending()
            .filter(|(_, s)| range.contains(*s))
            .map(|(m, _)| m.clone())
            .collect()
    })
}

pub(crate) fn zscore(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let member = args.next()?;
    args.finish()?;
    let score = store.read_zset(key, |z| z.score(member))?.flatten();
    Ok(score.map_or(Reply::Bulk(None), score_reply))
}

pub(crate) fn zunionstore(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    store_aggregate(store, args, StoreMode::Union)
}

pub(crate) fn zinterstore(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    store_aggregate(store, args, StoreMode::Intersect)
}

/// `destination numkeys key... [WEIGHTS w...] [AGGREGATE SUM|MIN|MAX]`.
fn store_aggregate(
    store: &InMemoryStore,
    args: &mut Args<'_>,
    mode: StoreMode,
) -> Outcome {
    let destination = args.next()?;
    let numkeys = args.next_int()?;
    if numkeys <= 0 {
        return Err(StoreFault::NoKeys(args.name()));
    }
    if numkeys as u64 > args.remaining() as u64 {
        return Err(StoreFault::Syntax);
    }
    let mut keys = Vec::with_capacity(numkeys as usize);
    for _ in 0..numkeys {
        keys.push(args.next().map_err(|_| StoreFault::Syntax)?);
    }

    let mut weights = vec![1.0; keys.len()];
    let mut op = Aggregate::default();
    while !args.is_empty() {
        let word = args.next_text()?.to_ascii_uppercase();
        match word.as_str() {
            "WEIGHTS" => {
                for w in weights.iter_mut() {
                    *w = args.next_score().map_err(|_| StoreFault::Syntax)?;
                }
            }
            "AGGREGATE" => {
                op = args.next_text()?.parse().map_err(|_| StoreFault::Syntax)?;
            }
            _ => return Err(StoreFault::Syntax),
        }
    }

    let mut sources = Vec::with_capacity(keys.len());
    for key in &keys {
        let members = store.read_zset(key, |z| z.members().clone())?;
        sources.push(members.unwrap_or_default());
    }
    let result: BTreeMap<Bytes, f64> =
        aggregate(mode, op, weights.iter().copied().zip(sources.iter()));
    let len = result.len();
    store.put_zset(destination.clone(), SortedSet::from(result));
    Ok(Reply::Integer(len as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Command, CommandArgs, CommandType};

    fn run(
        store: &InMemoryStore,
        kind: CommandType,
        args: &[&str],
    ) -> Reply {
        let args = args
            .iter()
            .fold(CommandArgs::new(), |a, s| a.add(Bytes::copy_from_slice(s.as_bytes())));
        store.apply(&Command::new(kind, args))
    }

    fn bulks(items: &[&'static str]) -> Reply {
        Reply::Array(items.iter().map(|s| Reply::bulk(*s)).collect())
    }

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        run(&store, CommandType::Zadd, &["z", "1", "b", "1", "a", "2", "c", "-inf", "lo"]);
        store
    }

    #[test]
    fn test_rank_window() {
        assert_eq!(rank_window(5, 0, -1), Some((0, 4)));
        assert_eq!(rank_window(5, -2, 10), Some((3, 4)));
        assert_eq!(rank_window(5, 3, 1), None);
        assert_eq!(rank_window(0, 0, -1), None);
        assert_eq!(rank_window(5, 7, 9), None);
    }

    #[test]
    fn test_zrange_orders_ties_by_member() {
        let store = seeded();
        assert_eq!(run(&store, CommandType::Zrange, &["z", "0", "-1"]), bulks(&["lo", "a", "b", "c"]));
        assert_eq!(run(&store, CommandType::Zrevrange, &["z", "0", "1"]), bulks(&["c", "b"]));
    }

    #[test]
    fn test_zrangebyscore_limits_and_bounds() {
        let store = seeded();
        assert_eq!(
            run(&store, CommandType::Zrangebyscore, &["z", "(1", "+inf"]),
            bulks(&["c"])
        );
        assert_eq!(
            run(&store, CommandType::Zrevrangebyscore, &["z", "+inf", "-inf", "LIMIT", "1", "2"]),
            bulks(&["b", "a"])
        );
        assert_eq!(
            run(&store, CommandType::Zrangebyscore, &["z", "-inf", "-inf", "WITHSCORES"]),
            Reply::Array(vec![Reply::bulk("lo"), Reply::bulk("-inf")])
        );
    }

    #[test]
    fn test_zrangebylex_rejects_withscores() {
        let store = seeded();
        assert_eq!(
            run(&store, CommandType::Zrangebylex, &["z", "[a", "(c", "WITHSCORES"]),
            Reply::Error("ERR syntax error".into())
        );
    }

    #[test]
    fn test_zincrby_and_zscore() {
        let store = seeded();
        assert_eq!(run(&store, CommandType::Zincrby, &["z", "1.5", "a"]), Reply::bulk("2.5"));
        assert_eq!(run(&store, CommandType::Zscore, &["z", "lo"]), Reply::bulk("-inf"));
        assert_eq!(run(&store, CommandType::Zscore, &["z", "nope"]), Reply::Bulk(None));
    }

    #[test]
    fn test_zrank_and_zrevrank() {
        let store = seeded();
        assert_eq!(run(&store, CommandType::Zrank, &["z", "a"]), Reply::Integer(1));
        assert_eq!(run(&store, CommandType::Zrevrank, &["z", "a"]), Reply::Integer(2));
        assert_eq!(run(&store, CommandType::Zrank, &["z", "x"]), Reply::Bulk(None));
    }

    #[test]
    fn test_zremrangebyrank() {
        let store = seeded();
        assert_eq!(run(&store, CommandType::Zremrangebyrank, &["z", "0", "1"]), Reply::Integer(2));
        assert_eq!(run(&store, CommandType::Zcard, &["z"]), Reply::Integer(2));
    }

    #[test]
    fn test_zunionstore_weights_and_aggregate() {
        let store = InMemoryStore::new();
        run(&store, CommandType::Zadd, &["a", "1", "both"]);
        run(&store, CommandType::Zadd, &["b", "3", "both", "5", "only_b"]);
        let reply = run(
            &store,
            CommandType::Zunionstore,
            &["d", "2", "a", "b", "WEIGHTS", "1", "2", "AGGREGATE", "MIN"],
        );
        assert_eq!(reply, Reply::Integer(2));
        assert_eq!(run(&store, CommandType::Zscore, &["d", "both"]), Reply::bulk("1"));
        assert_eq!(run(&store, CommandType::Zscore, &["d", "only_b"]), Reply::bulk("10"));

        let reply = run(&store, CommandType::Zinterstore, &["i", "2", "a", "b"]);
        assert_eq!(reply, Reply::Integer(1));
        assert_eq!(run(&store, CommandType::Zscore, &["i", "both"]), Reply::bulk("4"));
    }

    #[test]
    fn test_store_with_missing_source() {
        let store = InMemoryStore::new();
        run(&store, CommandType::Zadd, &["a", "1", "m"]);
        assert_eq!(run(&store, CommandType::Zinterstore, &["d", "2", "a", "nope"]), Reply::Integer(0));
        assert!(!store.contains_key(b"d"));
    }

    #[test]
    fn test_numkeys_beyond_arguments_is_syntax_error() {
        let store = seeded();
        let huge = i64::MAX.to_string();
        let err = Reply::Error(StoreFault::Syntax.to_string());
        assert_eq!(run(&store, CommandType::Zunionstore, &["d", huge.as_str(), "z"]), err);
        assert_eq!(run(&store, CommandType::Zinterstore, &["d", "3", "z", "z"]), err);
        assert!(!store.contains_key(b"d"));
    }
}
