//! Decoded reply shape.
//!
//! The transport decodes wire bytes into a [`Reply`] tree; the core only
//! inspects that tree. Accessors consume the reply and fail with
//! `MalformedReply` when the shape does not match what the command expects.

use bytes::Bytes;
use kvscan_error::{CommandError, KvResult};

use super::score::parse_score;

/// A decoded reply from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Double(f64),
    Bulk(Option<Bytes>),
    Array(Vec<Reply>),
    Null,
}

impl Reply {
    pub fn bulk(value: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(value.into()))
    }

    pub fn array(items: impl IntoIterator<Item = Reply>) -> Self {
        Reply::Array(items.into_iter().collect())
    }

    /// Short name of the reply kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Status(_) => "status",
            Reply::Error(_) => "error",
            Reply::Integer(_) => "integer",
            Reply::Double(_) => "double",
            Reply::Bulk(_) => "bulk",
            Reply::Array(_) => "array",
            Reply::Null => "null",
        }
    }

    /// Turns an error reply into the matching [`CommandError`], passing other
    /// replies through.
    ///
    /// `WRONGTYPE` replies map to `WrongType`, everything else to
    /// `ServerError`.
    pub fn check(self) -> KvResult<Reply> {
        match self {
            Reply::Error(message) => {
                if message.starts_with("WRONGTYPE") {
                    Err(CommandError::WrongType { message }.into())
                } else {
                    Err(CommandError::ServerError { message }.into())
                }
            }
            other => Ok(other),
        }
    }

    pub fn into_integer(
        self,
        command: &'static str,
    ) -> KvResult<i64> {
        match self.check()? {
            Reply::Integer(n) => Ok(n),
            other => Err(unexpected(command, "integer", &other)),
        }
    }

    /// Integer replies used as booleans (`1`/`0`).
    pub fn into_bool(
        self,
        command: &'static str,
    ) -> KvResult<bool> {
        match self.into_integer(command)? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(CommandError::malformed(command, format!("expected 0 or 1, got {n}")).into()),
        }
    }

    /// Integer reply or nil (`ZRANK` on a missing member).
    pub fn into_optional_integer(
        self,
        command: &'static str,
    ) -> KvResult<Option<i64>> {
        match self.check()? {
            Reply::Integer(n) => Ok(Some(n)),
            Reply::Null | Reply::Bulk(None) => Ok(None),
            other => Err(unexpected(command, "integer or nil", &other)),
        }
    }

    pub fn into_status(
        self,
        command: &'static str,
    ) -> KvResult<String> {
        match self.check()? {
            Reply::Status(s) => Ok(s),
            other => Err(unexpected(command, "status", &other)),
        }
    }

    /// Bulk string or nil.
    pub fn into_bulk(
        self,
        command: &'static str,
    ) -> KvResult<Option<Bytes>> {
        match self.check()? {
            Reply::Bulk(b) => Ok(b),
            Reply::Null => Ok(None),
            Reply::Status(s) => Ok(Some(Bytes::from(s))),
            other => Err(unexpected(command, "bulk string", &other)),
        }
    }

    /// Bulk string that must be present.
    pub fn into_required_bulk(
        self,
        command: &'static str,
    ) -> KvResult<Bytes> {
        self.into_bulk(command)?
            .ok_or_else(|| CommandError::malformed(command, "unexpected nil").into())
    }

    /// Score reply: a double, or a bulk string in score notation.
    pub fn into_score(
        self,
        command: &'static str,
    ) -> KvResult<Option<f64>> {
        match self.check()? {
            Reply::Double(d) if d.is_nan() => {
                Err(CommandError::malformed(command, "NaN score").into())
            }
            Reply::Double(d) => Ok(Some(d)),
            Reply::Bulk(Some(b)) => parse_score(&b, command).map(Some),
            Reply::Bulk(None) | Reply::Null => Ok(None),
            other => Err(unexpected(command, "score", &other)),
        }
    }

    pub fn into_array(
        self,
        command: &'static str,
    ) -> KvResult<Vec<Reply>> {
        match self.check()? {
            Reply::Array(items) => Ok(items),
            // An absent key reads as an empty collection.
            Reply::Null => Ok(Vec::new()),
            other => Err(unexpected(command, "array", &other)),
        }
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Reply::Bulk(Some(Bytes::copy_from_slice(value.as_bytes())))
    }
}

impl From<Bytes> for Reply {
    fn from(value: Bytes) -> Self {
        Reply::Bulk(Some(value))
    }
}

impl From<i64> for Reply {
    fn from(value: i64) -> Self {
        Reply::Integer(value)
    }
}

pub(crate) fn unexpected(
    command: &'static str,
    expected: &str,
    got: &Reply,
) -> kvscan_error::StackError {
    CommandError::malformed(command, format!("expected {expected}, got {}", got.kind())).into()
}
