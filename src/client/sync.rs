use std::collections::BTreeMap;

use bytes::Bytes;
use kvscan_error::{KvResult, ResultExt};
use tracing::debug;

use super::{ClientOptions, Transport};
use crate::{
    command::{hash, scan, zset, Prepared},
    cursor::{
        HashScan, MapScanPage, ScanArgs, ScanCursor, ScanKind, ScanWalk, ScoredValueScanPage,
        SortedSetScan, StreamScanCursor,
    },
    protocol::{LexRange, ScoreRange},
    range::{RangeQuery, StoreArgs},
    streaming::{KeyValue, ReplyElement, ScoredValue, StreamingChannel},
};

/// Blocking command surface over a [`Transport`].
///
/// Each method is one round trip, except the `*_all` scan helpers and
/// [`scan_pages`](Client::scan_pages) which drive a whole walk. Nothing is
/// retried: a failed step is returned as is.
pub struct Client<T> {
    transport: T,
    options: ClientOptions,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, ClientOptions::default())
    }

    pub fn with_options(
        transport: T,
        options: ClientOptions,
    ) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Sends a prepared command and decodes its reply.
    pub fn run<R>(
        &mut self,
        prepared: Prepared<'_, R>,
    ) -> KvResult<R> {
        let (command, decoder) = prepared.into_parts();
        let name = command.name();
        debug!(command = name, args = command.args.len(), "Dispatching command");
        let reply = self
            .transport
            .execute(&command)
            .with_context(|| format!("{name} did not complete"))?;
        decoder(reply)
    }

    // --- Hashes ---

    pub fn hdel(
        &mut self,
        key: impl Into<Bytes>,
        fields: &[Bytes],
    ) -> KvResult<i64> {
        self.run(hash::hdel(key, fields)?)
    }

    pub fn hexists(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
    ) -> KvResult<bool> {
        self.run(hash::hexists(key, field))
    }

    pub fn hget(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
    ) -> KvResult<Option<Bytes>> {
        self.run(hash::hget(key, field))
    }

    pub fn hincrby(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        amount: i64,
    ) -> KvResult<i64> {
        self.run(hash::hincrby(key, field, amount))
    }

    pub fn hincrbyfloat(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        amount: f64,
    ) -> KvResult<f64> {
        self.run(hash::hincrbyfloat(key, field, amount)?)
    }

    pub fn hgetall(
        &mut self,
        key: impl Into<Bytes>,
    ) -> KvResult<BTreeMap<Bytes, Bytes>> {
        self.run(hash::hgetall(key))
    }

    pub fn hgetall_stream<C>(
        &mut self,
        channel: &mut C,
        key: impl Into<Bytes>,
    ) -> KvResult<u64>
    where
        C: StreamingChannel<KeyValue> + Send + ?Sized,
    {
        self.run(hash::hgetall_stream(channel, key))
    }

    pub fn hkeys(
        &mut self,
        key: impl Into<Bytes>,
    ) -> KvResult<Vec<Bytes>> {
        self.run(hash::hkeys(key))
    }

    pub fn hkeys_stream<C>(
        &mut self,
        channel: &mut C,
        key: impl Into<Bytes>,
    ) -> KvResult<u64>
    where
        C: StreamingChannel<Bytes> + Send + ?Sized,
    {
        self.run(hash::hkeys_stream(channel, key))
    }

    pub fn hlen(
        &mut self,
        key: impl Into<Bytes>,
    ) -> KvResult<i64> {
        self.run(hash::hlen(key))
    }

    pub fn hmget(
        &mut self,
        key: impl Into<Bytes>,
        fields: &[Bytes],
    ) -> KvResult<Vec<Option<Bytes>>> {
        self.run(hash::hmget(key, fields)?)
    }

    pub fn hmget_stream<C>(
        &mut self,
        channel: &mut C,
        key: impl Into<Bytes>,
        fields: &[Bytes],
    ) -> KvResult<u64>
    where
        C: StreamingChannel<Option<Bytes>> + Send + ?Sized,
    {
        self.run(hash::hmget_stream(channel, key, fields)?)
    }

    pub fn hmset(
        &mut self,
        key: impl Into<Bytes>,
        entries: &[(Bytes, Bytes)],
    ) -> KvResult<String> {
        self.run(hash::hmset(key, entries)?)
    }

    pub fn hset(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> KvResult<bool> {
        self.run(hash::hset(key, field, value))
    }

    pub fn hsetnx(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> KvResult<bool> {
        self.run(hash::hsetnx(key, field, value))
    }

    pub fn hvals(
        &mut self,
        key: impl Into<Bytes>,
    ) -> KvResult<Vec<Bytes>> {
        self.run(hash::hvals(key))
    }

    pub fn hvals_stream<C>(
        &mut self,
        channel: &mut C,
        key: impl Into<Bytes>,
    ) -> KvResult<u64>
    where
        C: StreamingChannel<Bytes> + Send + ?Sized,
    {
        self.run(hash::hvals_stream(channel, key))
    }

    // --- Sorted sets ---

    pub fn zadd(
        &mut self,
        key: impl Into<Bytes>,
        score: f64,
        member: impl Into<Bytes>,
    ) -> KvResult<i64> {
        self.run(zset::zadd(key, score, member)?)
    }

    pub fn zadd_multi(
        &mut self,
        key: impl Into<Bytes>,
        entries: &[(f64, Bytes)],
    ) -> KvResult<i64> {
        self.run(zset::zadd_multi(key, entries)?)
    }

    pub fn zcard(
        &mut self,
        key: impl Into<Bytes>,
    ) -> KvResult<i64> {
        self.run(zset::zcard(key))
    }

    pub fn zcount(
        &mut self,
        key: impl Into<Bytes>,
        range: ScoreRange,
    ) -> KvResult<i64> {
        self.run(zset::zcount(key, range))
    }

    pub fn zincrby(
        &mut self,
        key: impl Into<Bytes>,
        amount: f64,
        member: impl Into<Bytes>,
    ) -> KvResult<f64> {
        self.run(zset::zincrby(key, amount, member)?)
    }

    pub fn zinterstore(
        &mut self,
        destination: impl Into<Bytes>,
        keys: &[Bytes],
        args: Option<&StoreArgs>,
    ) -> KvResult<i64> {
        self.run(zset::zinterstore(destination, keys, args)?)
    }

    pub fn zunionstore(
        &mut self,
        destination: impl Into<Bytes>,
        keys: &[Bytes],
        args: Option<&StoreArgs>,
    ) -> KvResult<i64> {
        self.run(zset::zunionstore(destination, keys, args)?)
    }

    pub fn zlexcount(
        &mut self,
        key: impl Into<Bytes>,
        range: &LexRange,
    ) -> KvResult<i64> {
        self.run(zset::zlexcount(key, range))
    }

    pub fn zrange(
        &mut self,
        key: impl Into<Bytes>,
        query: &RangeQuery,
    ) -> KvResult<Vec<Bytes>> {
        self.run(zset::zrange(key, query)?)
    }

    pub fn zrange_with_scores(
        &mut self,
        key: impl Into<Bytes>,
        query: &RangeQuery,
    ) -> KvResult<Vec<ScoredValue>> {
        self.run(zset::zrange_with_scores(key, query)?)
    }

    /// Streams a range read; `E` must match the query's `WITHSCORES` flag.
    pub fn zrange_stream<E, C>(
        &mut self,
        channel: &mut C,
        key: impl Into<Bytes>,
        query: &RangeQuery,
    ) -> KvResult<u64>
    where
        E: ReplyElement,
        C: StreamingChannel<E> + Send + ?Sized,
    {
        self.run(zset::range_stream::<E, C>(channel, key, query)?)
    }

    pub fn zrank(
        &mut self,
        key: impl Into<Bytes>,
        member: impl Into<Bytes>,
    ) -> KvResult<Option<i64>> {
        self.run(zset::zrank(key, member))
    }

    pub fn zrevrank(
        &mut self,
        key: impl Into<Bytes>,
        member: impl Into<Bytes>,
    ) -> KvResult<Option<i64>> {
        self.run(zset::zrevrank(key, member))
    }

    pub fn zrem(
        &mut self,
        key: impl Into<Bytes>,
        members: &[Bytes],
    ) -> KvResult<i64> {
        self.run(zset::zrem(key, members)?)
    }

    pub fn zremrangebylex(
        &mut self,
        key: impl Into<Bytes>,
        range: &LexRange,
    ) -> KvResult<i64> {
        self.run(zset::zremrangebylex(key, range))
    }

    pub fn zremrangebyrank(
        &mut self,
        key: impl Into<Bytes>,
        start: i64,
        stop: i64,
    ) -> KvResult<i64> {
        self.run(zset::zremrangebyrank(key, start, stop))
    }

    pub fn zremrangebyscore(
        &mut self,
        key: impl Into<Bytes>,
        range: ScoreRange,
    ) -> KvResult<i64> {
        self.run(zset::zremrangebyscore(key, range))
    }

    pub fn zscore(
        &mut self,
        key: impl Into<Bytes>,
        member: impl Into<Bytes>,
    ) -> KvResult<Option<f64>> {
        self.run(zset::zscore(key, member))
    }

    // --- Scans ---

    pub fn hscan(
        &mut self,
        key: impl Into<Bytes>,
        cursor: Option<&ScanCursor>,
        args: Option<&ScanArgs>,
    ) -> KvResult<MapScanPage> {
        let args = self.options.scan_args(args);
        self.run(scan::hscan(key, cursor, args.as_ref())?)
    }

    pub fn hscan_stream<C>(
        &mut self,
        channel: &mut C,
        key: impl Into<Bytes>,
        cursor: Option<&ScanCursor>,
        args: Option<&ScanArgs>,
    ) -> KvResult<StreamScanCursor>
    where
        C: StreamingChannel<KeyValue> + Send + ?Sized,
    {
        let args = self.options.scan_args(args);
        self.run(scan::hscan_stream(channel, key, cursor, args.as_ref())?)
    }

    pub fn zscan(
        &mut self,
        key: impl Into<Bytes>,
        cursor: Option<&ScanCursor>,
        args: Option<&ScanArgs>,
    ) -> KvResult<ScoredValueScanPage> {
        let args = self.options.scan_args(args);
        self.run(scan::zscan(key, cursor, args.as_ref())?)
    }

    pub fn zscan_stream<C>(
        &mut self,
        channel: &mut C,
        key: impl Into<Bytes>,
        cursor: Option<&ScanCursor>,
        args: Option<&ScanArgs>,
    ) -> KvResult<StreamScanCursor>
    where
        C: StreamingChannel<ScoredValue> + Send + ?Sized,
    {
        let args = self.options.scan_args(args);
        self.run(scan::zscan_stream(channel, key, cursor, args.as_ref())?)
    }

    /// Iterator over the pages of a full walk.
    pub fn scan_pages<S: ScanKind>(
        &mut self,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> ScanPages<'_, T, S> {
        let args = self.options.scan_args(args);
        ScanPages {
            walk: ScanWalk::new(key, args),
            client: self,
            failed: false,
        }
    }

    /// Walks the whole collection, concatenating pages.
    ///
    /// Elements are not deduplicated: if the collection changes during the
    /// walk an element may be reported more than once.
    pub fn scan_all<S: ScanKind>(
        &mut self,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> KvResult<Vec<S::Element>> {
        let mut out = Vec::new();
        for page in self.scan_pages::<S>(key, args) {
            out.extend(page?);
        }
        Ok(out)
    }

    /// Walks the whole collection into `channel`, returning the total count.
    pub fn scan_all_stream<S, C>(
        &mut self,
        channel: &mut C,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> KvResult<u64>
    where
        S: ScanKind,
        C: StreamingChannel<S::Element> + ?Sized,
    {
        let args = self.options.scan_args(args);
        let mut walk = ScanWalk::<S>::new(key, args);
        let mut total = 0;
        while let Some(command) = walk.next_command()? {
            debug!(command = command.name(), step = walk.steps(), "Dispatching scan step");
            let reply = self
                .transport
                .execute(&command)
                .with_context(|| format!("{} step did not complete", command.name()))?;
            total += walk.advance_streaming(reply, channel)?;
        }
        Ok(total)
    }

    pub fn hscan_all(
        &mut self,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> KvResult<Vec<KeyValue>> {
        self.scan_all::<HashScan>(key, args)
    }

    pub fn zscan_all(
        &mut self,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> KvResult<Vec<ScoredValue>> {
        self.scan_all::<SortedSetScan>(key, args)
    }
}

/// Pages of a walk, fetched lazily, one round trip per item.
///
/// Ends after the page that carries the finished cursor, or right after the
/// first error.
pub struct ScanPages<'c, T, S: ScanKind> {
    client: &'c mut Client<T>,
    walk: ScanWalk<S>,
    failed: bool,
}

impl<T, S: ScanKind> ScanPages<'_, T, S> {
    /// Cursor state after the last page yielded.
    pub fn walk(&self) -> &ScanWalk<S> {
        &self.walk
    }
}

impl<T: Transport, S: ScanKind> ScanPages<'_, T, S> {
    fn step(&mut self) -> KvResult<Option<Vec<S::Element>>> {
        let Some(command) = self.walk.next_command()? else {
            return Ok(None);
        };
        debug!(command = command.name(), step = self.walk.steps(), "Dispatching scan step");
        let reply = self
            .client
            .transport
            .execute(&command)
            .with_context(|| format!("{} step did not complete", command.name()))?;
        self.walk.advance(reply).map(Some)
    }
}

impl<T: Transport, S: ScanKind> Iterator for ScanPages<'_, T, S> {
    type Item = KvResult<Vec<S::Element>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.step() {
            Ok(page) => page.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
