use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Status codes used to categorize errors.
///
/// # Ranges:
/// - 1xxx: General errors
/// - 2xxx: Data / argument errors
/// - 3xxx: Cursor walk errors
/// - 4xxx: Streaming delivery errors
/// - 6xxx: Transport / IO
/// - 8xxx: Protocol / reply shape errors
///
/// `num_enum::TryFromPrimitive` provides `TryFrom<u32>`, so a code can travel
/// as a plain integer and be recovered on the other side.
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 1xxx: General ===
    Internal = 1003,
    InvalidArgs = 1004,
    InvalidConfig = 1005,

    // === 2xxx: Data ===
    WrongType = 2001,
    ServerError = 2003,

    // === 3xxx: Cursor walk ===
    InvalidCursor = 3000,

    // === 4xxx: Streaming delivery ===
    ChannelFault = 4000,

    // === 6xxx: Transport/IO ===
    Io = 6000,
    ConnectionClosed = 6001,
    Timeout = 6002,
    ConnectionFailed = 6003,
    TransportFailure = 6004,

    // === 8xxx: Protocol ===
    MalformedReply = 8000,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Numeric representation of the status code.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Tries to recover a `StatusCode` from a `u32`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Returns `true` when an outer layer may reasonably re-issue the failed
    /// operation.
    ///
    /// This is informational only. Nothing in this workspace retries. A scan
    /// step is never retryable: re-sending it after a transport failure may
    /// skip or repeat pages of a concurrently mutated collection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionFailed | Self::ConnectionClosed
        )
    }

    /// Errors caused by the caller: bad arguments, reused cursors, faulting
    /// channels.
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        if (2000..=4999).contains(&c) {
            return !matches!(self, Self::ServerError);
        }
        matches!(self, Self::InvalidArgs)
    }

    /// Transport range (6xxx).
    pub fn is_transport_error(&self) -> bool {
        (6000..=6999).contains(&self.code())
    }

    /// Protocol or reply-shape error (8xxx).
    pub fn is_protocol_error(&self) -> bool {
        (8000..=8999).contains(&self.code())
    }

    /// Suggested log level for this code.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::InvalidArgs
            | Self::WrongType
            | Self::InvalidCursor
            | Self::ChannelFault => LogLevel::Info,
            Self::Timeout | Self::ConnectionClosed | Self::TransportFailure => LogLevel::Warn,
            Self::Internal | Self::MalformedReply | Self::InvalidConfig => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
