use std::{collections::BTreeMap, slice, sync::Arc};

use bytes::Bytes;
use dashmap::{mapref::entry::Entry, DashMap};
use kvscan_error::KvResult;
use thiserror::Error;
use tracing::trace;

use super::{hash, scan, zset, SortedSet};
use crate::{
    client::{AsyncTransport, Completion, Transport},
    protocol::{parse_score, Command, CommandType, Reply},
};

/// A value held under a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Hash(BTreeMap<Bytes, Bytes>),
    ZSet(SortedSet),
}

/// Store-side failure, sent back to the client as an error reply.
#[derive(Debug, Error, PartialEq)]
pub(crate) enum StoreFault {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR syntax error")]
    Syntax,
    #[error("ERR wrong number of arguments for '{0}' command")]
    Arity(&'static str),
    #[error("ERR value is not an integer or out of range")]
    NotInteger,
    #[error("ERR value is not a valid float")]
    NotFloat,
    #[error("ERR hash value is not an integer")]
    HashNotInteger,
    #[error("ERR hash value is not a float")]
    HashNotFloat,
    #[error("ERR increment or decrement would overflow")]
    Overflow,
    #[error("ERR increment would produce NaN or Infinity")]
    NotFinite,
    #[error("ERR min or max is not a float")]
    ScoreRange,
    #[error("ERR min or max not valid string range item")]
    LexRange,
    #[error("ERR invalid cursor")]
    InvalidCursor,
    #[error("ERR invalid pattern: {0}")]
    Pattern(String),
    #[error("ERR at least 1 input key is needed for '{0}' command")]
    NoKeys(&'static str),
}

pub(crate) type Outcome = Result<Reply, StoreFault>;

/// Sequential reader over command arguments.
pub(crate) struct Args<'a> {
    command: &'static str,
    iter: slice::Iter<'a, Bytes>,
}

impl<'a> Args<'a> {
    fn new(command: &'a Command) -> Self {
        Self {
            command: command.name(),
            iter: command.args.iter(),
        }
    }

    pub fn next(&mut self) -> Result<&'a Bytes, StoreFault> {
        self.iter.next().ok_or(StoreFault::Arity(self.command))
    }

    pub fn next_int(&mut self) -> Result<i64, StoreFault> {
        parse_int(self.next()?)
    }

    pub fn next_score(&mut self) -> Result<f64, StoreFault> {
        parse_score(self.next()?, self.command).map_err(|_| StoreFault::NotFloat)
    }

    pub fn next_text(&mut self) -> Result<&'a str, StoreFault> {
        std::str::from_utf8(self.next()?).map_err(|_| StoreFault::Syntax)
    }

    /// Remaining arguments, at least one.
    pub fn rest(&mut self) -> Result<&'a [Bytes], StoreFault> {
        let rest = self.iter.as_slice();
        if rest.is_empty() {
            return Err(StoreFault::Arity(self.command));
        }
        self.iter = rest[rest.len()..].iter();
        Ok(rest)
    }

    pub fn is_empty(&self) -> bool {
        self.iter.as_slice().is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.iter.len()
    }

    pub fn name(&self) -> &'static str {
        self.command
    }

    /// Fails if arguments are left over.
    pub fn finish(&self) -> Result<(), StoreFault> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(StoreFault::Syntax)
        }
    }
}

pub(crate) fn parse_int(raw: &[u8]) -> Result<i64, StoreFault> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(StoreFault::NotInteger)
}

/// Reference in-memory store.
///
/// Cloning is cheap and clones share the keyspace, so one instance can serve a
/// blocking client and an async dispatcher at the same time. Commands on
/// different keys run concurrently; multi-key commands read their sources
/// first and write the destination afterwards, without isolation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Arc<DashMap<Bytes, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains_key(
        &self,
        key: &[u8],
    ) -> bool {
        self.data.contains_key(key)
    }

    pub fn del(
        &self,
        key: &[u8],
    ) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn flush(&self) {
        self.data.clear();
    }

    /// Executes one command and produces its reply. Failures come back as
    /// error replies, the way a remote store reports them.
    pub fn apply(
        &self,
        command: &Command,
    ) -> Reply {
        let mut args = Args::new(command);
        let outcome = match command.kind {
            CommandType::Hdel => hash::hdel(self, &mut args),
            CommandType::Hexists => hash::hexists(self, &mut args),
            CommandType::Hget => hash::hget(self, &mut args),
            CommandType::Hincrby => hash::hincrby(self, &mut args),
            CommandType::Hincrbyfloat => hash::hincrbyfloat(self, &mut args),
            CommandType::Hgetall => hash::hgetall(self, &mut args),
            CommandType::Hkeys => hash::hkeys(self, &mut args),
            CommandType::Hlen => hash::hlen(self, &mut args),
            CommandType::Hmget => hash::hmget(self, &mut args),
            CommandType::Hmset => hash::hmset(self, &mut args),
            CommandType::Hset => hash::hset(self, &mut args),
            CommandType::Hsetnx => hash::hsetnx(self, &mut args),
            CommandType::Hvals => hash::hvals(self, &mut args),
            CommandType::Hscan => scan::hscan(self, &mut args),
            CommandType::Zadd => zset::zadd(self, &mut args),
            CommandType::Zcard => zset::zcard(self, &mut args),
            CommandType::Zcount => zset::zcount(self, &mut args),
            CommandType::Zincrby => zset::zincrby(self, &mut args),
            CommandType::Zinterstore => zset::zinterstore(self, &mut args),
            CommandType::Zunionstore => zset::zunionstore(self, &mut args),
            CommandType::Zlexcount => zset::zlexcount(self, &mut args),
            CommandType::Zrange => zset::zrange(self, &mut args, false),
            CommandType::Zrevrange => zset::zrange(self, &mut args, true),
            CommandType::Zrangebyscore => zset::zrangebyscore(self, &mut args, false),
            CommandType::Zrevrangebyscore => zset::zrangebyscore(self, &mut args, true),
            CommandType::Zrangebylex => zset::zrangebylex(self, &mut args, false),
            CommandType::Zrevrangebylex => zset::zrangebylex(self, &mut args, true),
            CommandType::Zrank => zset::zrank(self, &mut args, false),
            CommandType::Zrevrank => zset::zrank(self, &mut args, true),
            CommandType::Zrem => zset::zrem(self, &mut args),
            CommandType::Zremrangebylex => zset::zremrangebylex(self, &mut args),
            CommandType::Zremrangebyrank => zset::zremrangebyrank(self, &mut args),
            CommandType::Zremrangebyscore => zset::zremrangebyscore(self, &mut args),
            CommandType::Zscore => zset::zscore(self, &mut args),
            CommandType::Zscan => scan::zscan(self, &mut args),
        };
        outcome.unwrap_or_else(|fault| {
            trace!(command = command.name(), error = %fault, "Command rejected by store");
            Reply::Error(fault.to_string())
        })
    }

    pub(crate) fn read_hash<R>(
        &self,
        key: &[u8],
        f: impl FnOnce(&BTreeMap<Bytes, Bytes>) -> R,
    ) -> Result<Option<R>, StoreFault> {
        match self.data.get(key).as_deref() {
            None => Ok(None),
            Some(Value::Hash(h)) => Ok(Some(f(h))),
            Some(_) => Err(StoreFault::WrongType),
        }
    }

    /// Runs `f` on the hash at `key`, creating it if absent and dropping the
    /// key if `f` leaves it empty.
    pub(crate) fn write_hash<R>(
        &self,
        key: &Bytes,
        f: impl FnOnce(&mut BTreeMap<Bytes, Bytes>) -> Result<R, StoreFault>,
    ) -> Result<R, StoreFault> {
        match self.data.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let Value::Hash(h) = occupied.get_mut() else {
                    return Err(StoreFault::WrongType);
                };
                let out = f(h)?;
                let empty = h.is_empty();
                if empty {
                    occupied.remove();
                }
                Ok(out)
            }
            Entry::Vacant(vacant) => {
                let mut h = BTreeMap::new();
                let out = f(&mut h)?;
                if !h.is_empty() {
                    vacant.insert(Value::Hash(h));
                }
                Ok(out)
            }
        }
    }

    pub(crate) fn read_zset<R>(
        &self,
        key: &[u8],
        f: impl FnOnce(&SortedSet) -> R,
    ) -> Result<Option<R>, StoreFault> {
        match self.data.get(key).as_deref() {
            None => Ok(None),
            Some(Value::ZSet(z)) => Ok(Some(f(z))),
            Some(_) => Err(StoreFault::WrongType),
        }
    }

    /// Sorted-set counterpart of [`write_hash`](Self::write_hash).
    pub(crate) fn write_zset<R>(
        &self,
        key: &Bytes,
        f: impl FnOnce(&mut SortedSet) -> Result<R, StoreFault>,
    ) -> Result<R, StoreFault> {
        match self.data.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let Value::ZSet(z) = occupied.get_mut() else {
                    return Err(StoreFault::WrongType);
                };
                let out = f(z)?;
                let empty = z.is_empty();
                if empty {
                    occupied.remove();
                }
                Ok(out)
            }
            Entry::Vacant(vacant) => {
                let mut z = SortedSet::new();
                let out = f(&mut z)?;
                if !z.is_empty() {
                    vacant.insert(Value::ZSet(z));
                }
                Ok(out)
            }
        }
    }

    /// Replaces whatever is at `key`; an empty set deletes the key.
    pub(crate) fn put_zset(
        &self,
        key: Bytes,
        z: SortedSet,
    ) {
        if z.is_empty() {
            self.data.remove(&key);
        } else {
            self.data.insert(key, Value::ZSet(z));
        }
    }
}

impl Transport for InMemoryStore {
    fn execute(
        &mut self,
        command: &Command,
    ) -> KvResult<Reply> {
        Ok(self.apply(command))
    }
}

/// The store answers immediately, so the handle is always resolved.
impl AsyncTransport for InMemoryStore {
    fn dispatch(
        &self,
        command: Command,
    ) -> Completion<Reply> {
        Completion::ready(self.apply(&command))
    }
}
