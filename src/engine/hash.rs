//! Hash command handlers.

use bytes::Bytes;

use super::store::{parse_int, Args, InMemoryStore, Outcome, StoreFault};
use crate::protocol::{format_score, parse_score, Reply};

fn count(n: usize) -> Reply {
    Reply::Integer(n as i64)
}

pub(crate) fn hdel(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let fields = args.rest()?;
    let removed = store.write_hash(key, |h| {
        Ok(fields.iter().filter(|f| h.remove(*f).is_some()).count())
    })?;
    Ok(count(removed))
}

pub(crate) fn hexists(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let field = args.next()?;
    args.finish()?;
    let found = store.read_hash(key, |h| h.contains_key(field))?;
    Ok(Reply::Integer(i64::from(found.unwrap_or(false))))
}

pub(crate) fn hget(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let field = args.next()?;
    args.finish()?;
    let value = store.read_hash(key, |h| h.get(field).cloned())?.flatten();
    Ok(Reply::Bulk(value))
}

pub(crate) fn hincrby(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let field = args.next()?;
    let amount = args.next_int()?;
    args.finish()?;
    let value = store.write_hash(key, |h| {
        let current = match h.get(field) {
            Some(raw) => parse_int(raw).map_err(|_| StoreFault::HashNotInteger)?,
            None => 0,
        };
        let next = current.checked_add(amount).ok_or(StoreFault::Overflow)?;
        h.insert(field.clone(), Bytes::from(next.to_string()));
        Ok(next)
    })?;
    Ok(Reply::Integer(value))
}

pub(crate) fn hincrbyfloat(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let field = args.next()?;
    let amount = args.next_score()?;
    args.finish()?;
    let value = store.write_hash(key, |h| {
        let current = match h.get(field) {
            Some(raw) => parse_score(raw, "HINCRBYFLOAT").map_err(|_| StoreFault::HashNotFloat)?,
            None => 0.0,
        };
        let next = current + amount;
        if !next.is_finite() {
            return Err(StoreFault::NotFinite);
        }
        let text = Bytes::from(format_score(next));
        h.insert(field.clone(), text.clone());
        Ok(text)
    })?;
    Ok(Reply::Bulk(Some(value)))
}

pub(crate) fn hgetall(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    args.finish()?;
    let items = store
        .read_hash(key, |h| {
            h.iter()
                .flat_map(|(f, v)| [Reply::Bulk(Some(f.clone())), Reply::Bulk(Some(v.clone()))])
                .collect::<Vec<_>>()
        })?
        .unwrap_or_default();
    Ok(Reply::Array(items))
}

pub(crate) fn hkeys(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    args.finish()?;
    let items = store
        .read_hash(key, |h| h.keys().map(|f| Reply::Bulk(Some(f.clone()))).collect::<Vec<_>>())?
        .unwrap_or_default();
    Ok(Reply::Array(items))
}

pub(crate) fn hvals(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    args.finish()?;
    let items = store
        .read_hash(key, |h| h.values().map(|v| Reply::Bulk(Some(v.clone()))).collect::<Vec<_>>())?
        .unwrap_or_default();
    Ok(Reply::Array(items))
}

pub(crate) fn hlen(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    args.finish()?;
    Ok(count(store.read_hash(key, |h| h.len())?.unwrap_or(0)))
}

pub(crate) fn hmget(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let fields = args.rest()?;
    let values = store
        .read_hash(key, |h| {
            fields
                .iter()
                .map(|f| Reply::Bulk(h.get(f).cloned()))
                .collect::<Vec<_>>()
        })?
        .unwrap_or_else(|| fields.iter().map(|_| Reply::Bulk(None)).collect());
    Ok(Reply::Array(values))
}

pub(crate) fn hmset(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let pairs = args.rest()?;
    if pairs.len() % 2 != 0 {
        return Err(StoreFault::Arity(args.name()));
    }
    store.write_hash(key, |h| {
        for pair in pairs.chunks_exact(2) {
            h.insert(pair[0].clone(), pair[1].clone());
        }
        Ok(())
    })?;
    Ok(Reply::Status("OK".into()))
}

pub(crate) fn hset(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let field = args.next()?;
    let value = args.next()?;
    args.finish()?;
    let created = store.write_hash(key, |h| Ok(h.insert(field.clone(), value.clone()).is_none()))?;
    Ok(Reply::Integer(i64::from(created)))
}

pub(crate) fn hsetnx(
    store: &InMemoryStore,
    args: &mut Args<'_>,
) -> Outcome {
    let key = args.next()?;
    let field = args.next()?;
    let value = args.next()?;
    args.finish()?;
    let created = store.write_hash(key, |h| {
        if h.contains_key(field) {
            return Ok(false);
        }
        h.insert(field.clone(), value.clone());
        Ok(true)
    })?;
    Ok(Reply::Integer(i64::from(created)))
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

    #[test]
    fn test_hset_then_hget() {
        let store = InMemoryStore::new();
        assert_eq!(run(&store, CommandType::Hset, &["h", "f", "1"]), Reply::Integer(1));
        assert_eq!(run(&store, CommandType::Hset, &["h", "f", "2"]), Reply::Integer(0));
        assert_eq!(run(&store, CommandType::Hget, &["h", "f"]), Reply::bulk("2"));
        assert_eq!(run(&store, CommandType::Hget, &["h", "nope"]), Reply::Bulk(None));
    }

    #[test]
    fn test_hincrby_rejects_non_integer() {
        let store = InMemoryStore::new();
        run(&store, CommandType::Hset, &["h", "f", "x"]);
        assert_eq!(
            run(&store, CommandType::Hincrby, &["h", "f", "1"]),
            Reply::Error("ERR hash value is not an integer".into())
        );
        assert_eq!(run(&store, CommandType::Hincrby, &["h", "n", "5"]), Reply::Integer(5));
    }

    #[test]
    fn test_hdel_drops_empty_hash() {
        let store = InMemoryStore::new();
        run(&store, CommandType::Hmset, &["h", "a", "1", "b", "2"]);
        assert_eq!(run(&store, CommandType::Hdel, &["h", "a", "b", "c"]), Reply::Integer(2));
        assert!(!store.contains_key(b"h"));
        assert_eq!(run(&store, CommandType::Hdel, &["h", "a"]), Reply::Integer(0));
    }

    #[test]
    fn test_hmget_on_missing_key() {
        let store = InMemoryStore::new();
        assert_eq!(
            run(&store, CommandType::Hmget, &["h", "a", "b"]),
            Reply::Array(vec![Reply::Bulk(None), Reply::Bulk(None)])
        );
    }

    #[test]
    fn test_hmset_odd_arguments() {
        let store = InMemoryStore::new();
        assert!(matches!(
            run(&store, CommandType::Hmset, &["h", "a"]),
            Reply::Error(_)
        ));
    }
}
