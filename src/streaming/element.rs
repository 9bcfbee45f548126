//! Element shapes carried by pages.
//!
//! A reply page is a flat token sequence; each element type knows how many
//! tokens make up one element (its arity) and how to decode them.

use std::vec;

use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};
use serde::{Deserialize, Serialize};

use crate::protocol::Reply;

/// Decodes one logical element from consecutive reply tokens.
pub trait ReplyElement: Sized {
    /// Number of reply tokens per element.
    const ARITY: usize;

    /// Decodes one element, consuming exactly `ARITY` tokens.
    fn decode(
        tokens: &mut vec::IntoIter<Reply>,
        command: &'static str,
    ) -> KvResult<Self>;
}

/// A hash field with its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: Bytes,
    pub value: Bytes,
}

impl KeyValue {
    pub fn new(
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A sorted-set member with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredValue {
    pub score: f64,
    pub value: Bytes,
}

impl ScoredValue {
    pub fn new(
        score: f64,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            score,
            value: value.into(),
        }
    }
}

fn next_token(
    tokens: &mut vec::IntoIter<Reply>,
    command: &'static str,
) -> KvResult<Reply> {
    tokens
        .next()
        .ok_or_else(|| CommandError::malformed(command, "reply ended mid-element").into())
}

impl ReplyElement for Bytes {
    const ARITY: usize = 1;

    fn decode(
        tokens: &mut vec::IntoIter<Reply>,
        command: &'static str,
    ) -> KvResult<Self> {
        next_token(tokens, command)?.into_required_bulk(command)
    }
}

/// Nil-able values, as returned by `HMGET` for missing fields.
impl ReplyElement for Option<Bytes> {
    const ARITY: usize = 1;

    fn decode(
        tokens: &mut vec::IntoIter<Reply>,
        command: &'static str,
    ) -> KvResult<Self> {
        next_token(tokens, command)?.into_bulk(command)
    }
}

impl ReplyElement for KeyValue {
    const ARITY: usize = 2;

    fn decode(
        tokens: &mut vec::IntoIter<Reply>,
        command: &'static str,
    ) -> KvResult<Self> {
        let key = next_token(tokens, command)?.into_required_bulk(command)?;
        let value = next_token(tokens, command)?.into_required_bulk(command)?;
        Ok(KeyValue { key, value })
    }
}

/// Wire order is member first, then score.
impl ReplyElement for ScoredValue {
    const ARITY: usize = 2;

    fn decode(
        tokens: &mut vec::IntoIter<Reply>,
        command: &'static str,
    ) -> KvResult<Self> {
        let value = next_token(tokens, command)?.into_required_bulk(command)?;
        let score = next_token(tokens, command)?
            .into_score(command)?
            .ok_or_else(|| CommandError::malformed(command, "nil score"))?;
        Ok(ScoredValue { score, value })
    }
}
