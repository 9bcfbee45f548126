use kvscan_error::{CommandError, KvResult, StackError};
use tracing::{trace, warn};

use super::{Collector, ReplyElement, StreamingChannel};
use crate::protocol::Reply;

/// Pushes every element of a decoded page into `channel`, in wire order.
///
/// The token count is checked against the element arity before anything is
/// pushed, so a malformed page delivers nothing. A channel error stops the
/// page at the faulting element and is returned as `ChannelFault`; the number
/// of elements accepted before the fault is not reported as a result.
pub fn deliver<E, C>(
    tokens: Vec<Reply>,
    channel: &mut C,
    command: &'static str,
) -> KvResult<u64>
where
    E: ReplyElement,
    C: StreamingChannel<E> + ?Sized,
{
    if tokens.len() % E::ARITY != 0 {
        return Err(CommandError::malformed(
            command,
            format!(
                "{} tokens do not form whole elements of arity {}",
                tokens.len(),
                E::ARITY
            ),
        )
        .into());
    }

    let expected = (tokens.len() / E::ARITY) as u64;
    let mut tokens = tokens.into_iter();
    let mut position = 0u64;

    while position < expected {
        let element = E::decode(&mut tokens, command)?;
        if let Err(fault) = channel.accept(element) {
            warn!(command, position, error = %fault, "Streaming channel fault, abandoning page");
            return Err(channel_fault(position, fault));
        }
        position += 1;
    }

    trace!(command, delivered = position, "Page delivered");
    Ok(position)
}

/// Bulk counterpart of [`deliver`].
pub fn collect<E: ReplyElement>(
    tokens: Vec<Reply>,
    command: &'static str,
) -> KvResult<Vec<E>> {
    let mut collector = Collector::with_capacity(tokens.len() / E::ARITY);
    deliver::<E, _>(tokens, &mut collector, command)?;
    Ok(collector.into_inner())
}

fn channel_fault(
    position: u64,
    fault: StackError,
) -> StackError {
    let mut err = StackError::new(CommandError::ChannelFault {
        position,
        reason: fault.to_string(),
    });
    for ctx in fault.contexts() {
        err = err.context(ctx.message.clone());
    }
    err
}
