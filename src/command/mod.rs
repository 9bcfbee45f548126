//! Prepared commands.
//!
//! Every operation of the client surface is built here as a [`Prepared`]: the
//! structured [`Command`] plus the decoder for its reply. Transports only see
//! the command, so the same prepared value runs over a blocking transport or
//! through a completion handle.
//!
//! - `hash`: hash commands.
//! - `zset`: sorted-set commands, range reads and store-aggregate.
//! - `scan`: `HSCAN` / `ZSCAN` steps in bulk and streaming form.

pub mod hash;
pub mod scan;
pub mod zset;

use std::fmt;

use kvscan_error::KvResult;

use crate::{
    protocol::{Command, Reply},
    streaming::{collect, deliver, ReplyElement, StreamingChannel},
};

/// Reply decoder of a prepared command.
pub type Decoder<'a, T> = Box<dyn FnOnce(Reply) -> KvResult<T> + Send + 'a>;

/// A command paired with the decoder for its reply.
///
/// The lifetime is that of a borrowed streaming channel, if any. The channel
/// is only reachable from the decoder, which is consumed by the single call
/// that receives the reply.
pub struct Prepared<'a, T> {
    command: Command,
    decoder: Decoder<'a, T>,
}

impl<'a, T> Prepared<'a, T> {
    pub fn new<F>(
        command: Command,
        decoder: F,
    ) -> Self
    where
        F: FnOnce(Reply) -> KvResult<T> + Send + 'a,
    {
        Self {
            command,
            decoder: Box::new(decoder),
        }
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn into_parts(self) -> (Command, Decoder<'a, T>) {
        (self.command, self.decoder)
    }

    pub fn decode(
        self,
        reply: Reply,
    ) -> KvResult<T> {
        (self.decoder)(reply)
    }

    pub fn map<U, F>(
        self,
        f: F,
    ) -> Prepared<'a, U>
    where
        T: 'a,
        F: FnOnce(T) -> U + Send + 'a,
    {
        let decoder = self.decoder;
        Prepared::new(self.command, move |reply| decoder(reply).map(f))
    }
}

impl<T> fmt::Debug for Prepared<'_, T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Prepared")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// Multi-element reply materialized into a `Vec`.
pub(crate) fn collected<E>(command: Command) -> Prepared<'static, Vec<E>>
where
    E: ReplyElement + 'static,
{
    let name = command.name();
    Prepared::new(command, move |reply| collect::<E>(reply.into_array(name)?, name))
}

/// Multi-element reply pushed into a caller channel.
pub(crate) fn streamed<'a, E, C>(
    command: Command,
    channel: &'a mut C,
) -> Prepared<'a, u64>
where
    E: ReplyElement,
    C: StreamingChannel<E> + Send + ?Sized,
{
    let name = command.name();
    Prepared::new(command, move |reply| {
        deliver::<E, C>(reply.into_array(name)?, channel, name)
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::{CommandArgs, CommandType};

    fn hkeys() -> Command {
        Command::new(CommandType::Hkeys, CommandArgs::new().add("h"))
    }

    #[test]
    fn test_prepared_decode_and_map() {
        let p = collected::<Bytes>(hkeys()).map(|v| v.len());
        assert_eq!(p.command().name(), "HKEYS");
        let n = p
            .decode(Reply::array([Reply::from("a"), Reply::from("b")]))
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_streamed_releases_channel_after_decode() {
        let mut seen: Vec<Bytes> = Vec::new();
        let mut channel = |b: Bytes| -> KvResult<()> {
            seen.push(b);
            Ok(())
        };
        let count = streamed::<Bytes, _>(hkeys(), &mut channel)
            .decode(Reply::array([Reply::from("a")]))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(seen, vec![Bytes::from_static(b"a")]);
    }
}
