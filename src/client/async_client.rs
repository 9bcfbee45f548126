use std::collections::BTreeMap;

use bytes::Bytes;
use kvscan_error::{KvResult, ResultExt};
use tracing::debug;

use super::{AsyncTransport, ClientOptions};
use crate::{
    command::{hash, scan, zset, Prepared},
    cursor::{
        HashScan, MapScanPage, ScanArgs, ScanCursor, ScanKind, ScanWalk, ScoredValueScanPage,
        SortedSetScan, StreamScanCursor,
    },
    protocol::{Command, Reply},
    range::{RangeQuery, StoreArgs},
    streaming::{KeyValue, ScoredValue, StreamingChannel},
};

/// Command surface over an [`AsyncTransport`].
///
/// Every call dispatches one command, waits on its completion handle for at
/// most [`ClientOptions::timeout`] and decodes the reply with the same
/// decoders the blocking [`Client`](super::Client) uses. Any prepared
/// command can be sent with [`execute`](AsyncClient::execute).
pub struct AsyncClient<T> {
    transport: T,
    options: ClientOptions,
}

impl<T: AsyncTransport> AsyncClient<T> {
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

    async fn round_trip(
        &self,
        command: Command,
    ) -> KvResult<Reply> {
        let name = command.name();
        debug!(command = name, args = command.args.len(), "Dispatching command");
        self.transport
            .dispatch(command)
            .wait(self.options.timeout)
            .await
            .with_context(|| format!("{name} did not complete"))
    }

    /// Sends a prepared command and decodes its reply.
    pub async fn execute<R>(
        &self,
        prepared: Prepared<'_, R>,
    ) -> KvResult<R> {
        let (command, decoder) = prepared.into_parts();
        let reply = self.round_trip(command).await?;
        decoder(reply)
    }

    pub async fn hget(
        &self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
    ) -> KvResult<Option<Bytes>> {
        self.execute(hash::hget(key, field)).await
    }

    pub async fn hset(
        &self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> KvResult<bool> {
        self.execute(hash::hset(key, field, value)).await
    }

    pub async fn hgetall(
        &self,
        key: impl Into<Bytes>,
    ) -> KvResult<BTreeMap<Bytes, Bytes>> {
        self.execute(hash::hgetall(key)).await
    }

    pub async fn hlen(
        &self,
        key: impl Into<Bytes>,
    ) -> KvResult<i64> {
        self.execute(hash::hlen(key)).await
    }

    pub async fn zadd_multi(
        &self,
        key: impl Into<Bytes>,
        entries: &[(f64, Bytes)],
    ) -> KvResult<i64> {
        self.execute(zset::zadd_multi(key, entries)?).await
    }

    pub async fn zscore(
        &self,
        key: impl Into<Bytes>,
        member: impl Into<Bytes>,
    ) -> KvResult<Option<f64>> {
        self.execute(zset::zscore(key, member)).await
    }

    pub async fn zrange(
        &self,
        key: impl Into<Bytes>,
        query: &RangeQuery,
    ) -> KvResult<Vec<Bytes>> {
        self.execute(zset::zrange(key, query)?).await
    }

    pub async fn zrange_with_scores(
        &self,
        key: impl Into<Bytes>,
        query: &RangeQuery,
    ) -> KvResult<Vec<ScoredValue>> {
        self.execute(zset::zrange_with_scores(key, query)?).await
    }

    pub async fn zunionstore(
        &self,
        destination: impl Into<Bytes>,
        keys: &[Bytes],
        args: Option<&StoreArgs>,
    ) -> KvResult<i64> {
        self.execute(zset::zunionstore(destination, keys, args)?)
            .await
    }

    pub async fn zinterstore(
        &self,
        destination: impl Into<Bytes>,
        keys: &[Bytes],
        args: Option<&StoreArgs>,
    ) -> KvResult<i64> {
        self.execute(zset::zinterstore(destination, keys, args)?)
            .await
    }

    pub async fn hscan(
        &self,
        key: impl Into<Bytes>,
        cursor: Option<&ScanCursor>,
        args: Option<&ScanArgs>,
    ) -> KvResult<MapScanPage> {
        let args = self.options.scan_args(args);
        self.execute(scan::hscan(key, cursor, args.as_ref())?).await
    }

    pub async fn hscan_stream<C>(
        &self,
        channel: &mut C,
        key: impl Into<Bytes>,
        cursor: Option<&ScanCursor>,
        args: Option<&ScanArgs>,
    ) -> KvResult<StreamScanCursor>
    where
        C: StreamingChannel<KeyValue> + Send + ?Sized,
    {
        let args = self.options.scan_args(args);
        self.execute(scan::hscan_stream(channel, key, cursor, args.as_ref())?)
            .await
    }

    pub async fn zscan(
        &self,
        key: impl Into<Bytes>,
        cursor: Option<&ScanCursor>,
        args: Option<&ScanArgs>,
    ) -> KvResult<ScoredValueScanPage> {
        let args = self.options.scan_args(args);
        self.execute(scan::zscan(key, cursor, args.as_ref())?).await
    }

    pub async fn zscan_stream<C>(
        &self,
        channel: &mut C,
        key: impl Into<Bytes>,
        cursor: Option<&ScanCursor>,
        args: Option<&ScanArgs>,
    ) -> KvResult<StreamScanCursor>
    where
        C: StreamingChannel<ScoredValue> + Send + ?Sized,
    {
        let args = self.options.scan_args(args);
        self.execute(scan::zscan_stream(channel, key, cursor, args.as_ref())?)
            .await
    }

    /// Walks the whole collection, concatenating pages without deduplication.
    pub async fn scan_all<S: ScanKind>(
        &self,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> KvResult<Vec<S::Element>> {
        let mut walk = ScanWalk::<S>::new(key, self.options.scan_args(args));
        let mut out = Vec::new();
        while let Some(command) = walk.next_command()? {
            let reply = self.round_trip(command).await?;
            out.extend(walk.advance(reply)?);
        }
        Ok(out)
    }

    /// Walks the whole collection into `channel`, returning the total count.
    pub async fn scan_all_stream<S, C>(
        &self,
        channel: &mut C,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> KvResult<u64>
    where
        S: ScanKind,
        C: StreamingChannel<S::Element> + ?Sized,
    {
        let mut walk = ScanWalk::<S>::new(key, self.options.scan_args(args));
        let mut total = 0;
        while let Some(command) = walk.next_command()? {
            let reply = self.round_trip(command).await?;
            total += walk.advance_streaming(reply, channel)?;
        }
        Ok(total)
    }

    pub async fn hscan_all(
        &self,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> KvResult<Vec<KeyValue>> {
        self.scan_all::<HashScan>(key, args).await
    }

    pub async fn zscan_all(
        &self,
        key: impl Into<Bytes>,
        args: Option<&ScanArgs>,
    ) -> KvResult<Vec<ScoredValue>> {
        self.scan_all::<SortedSetScan>(key, args).await
    }
}
