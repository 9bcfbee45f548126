use std::time::Duration;

use kvscan_error::{CommandError, KvResult, StackError};
use tokio::sync::oneshot::{self, error::TryRecvError};

/// Pending result of a dispatched command.
///
/// A handle is either still waiting on its producer, or already resolved to
/// a value or a failure. The cursor and streaming logic run on the resolved
/// reply, so it makes no difference whether a transport resolves at once or
/// later.
#[derive(Debug)]
pub enum Completion<T> {
    Pending(oneshot::Receiver<KvResult<T>>),
    Ready(T),
    Failed(StackError),
}

/// Producer side of a [`Completion`].
#[derive(Debug)]
pub struct CompletionSender<T> {
    tx: oneshot::Sender<KvResult<T>>,
}

impl<T> CompletionSender<T> {
    /// Resolves the paired handle. Returns `false` if the handle was dropped.
    pub fn complete(
        self,
        result: KvResult<T>,
    ) -> bool {
        self.tx.send(result).is_ok()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl<T> Completion<T> {
    /// Sender/handle pair for a result produced elsewhere.
    pub fn channel() -> (CompletionSender<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (CompletionSender { tx }, Completion::Pending(rx))
    }

    pub fn ready(value: T) -> Self {
        Completion::Ready(value)
    }

    pub fn failed(error: impl Into<StackError>) -> Self {
        Completion::Failed(error.into())
    }

    pub fn from_result(result: KvResult<T>) -> Self {
        match result {
            Ok(v) => Completion::Ready(v),
            Err(e) => Completion::Failed(e),
        }
    }

    /// Non-blocking poll. A pending handle whose result has arrived is
    /// resolved in place.
    pub fn is_ready(&mut self) -> bool {
        if let Completion::Pending(rx) = self {
            let resolved = match rx.try_recv() {
                Ok(result) => Completion::from_result(result),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Closed) => Completion::Failed(abandoned()),
            };
            *self = resolved;
        }
        true
    }

    /// Waits for the result, failing with `TransportFailure` once `timeout`
    /// elapses. `None` waits indefinitely.
    pub async fn wait(
        self,
        timeout: Option<Duration>,
    ) -> KvResult<T> {
        let rx = match self {
            Completion::Ready(v) => return Ok(v),
            Completion::Failed(e) => return Err(e),
            Completion::Pending(rx) => rx,
        };
        match timeout {
            None => receive(rx).await,
            Some(limit) => tokio::time::timeout(limit, receive(rx))
                .await
                .map_err(|_| {
                    CommandError::transport(format!("no reply within {}ms", limit.as_millis()))
                })?,
        }
    }

    /// Blocks the current thread until the result arrives.
    ///
    /// Must not be called from within an async context.
    pub fn blocking_wait(self) -> KvResult<T> {
        match self {
            Completion::Ready(v) => Ok(v),
            Completion::Failed(e) => Err(e),
            Completion::Pending(rx) => rx.blocking_recv().map_err(|_| abandoned())?,
        }
    }
}

async fn receive<T>(rx: oneshot::Receiver<KvResult<T>>) -> KvResult<T> {
    rx.await.map_err(|_| abandoned())?
}

fn abandoned() -> StackError {
    CommandError::transport("command abandoned before a reply arrived").into()
}

#[cfg(test)]
mod tests {
    use kvscan_error::StatusCode;

    use super::*;

    #[test]
    fn test_is_ready_resolves_in_place() {
        let (tx, mut handle) = Completion::<i64>::channel();
        assert!(!handle.is_ready());
        assert!(tx.complete(Ok(7)));
        assert!(handle.is_ready());
        assert!(matches!(handle, Completion::Ready(7)));
    }

    #[test]
    fn test_dropped_sender_fails() {
        let (tx, mut handle) = Completion::<i64>::channel();
        drop(tx);
        assert!(handle.is_ready());
        let err = handle.blocking_wait().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TransportFailure);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let (_tx, handle) = Completion::<i64>::channel();
        let err = handle
            .wait(Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TransportFailure);
    }

    #[tokio::test]
    async fn test_wait_on_resolved_handles() {
        assert_eq!(Completion::ready(1).wait(None).await.unwrap(), 1);
        let failed = Completion::<i64>::failed(CommandError::transport("down"));
        assert!(failed.wait(None).await.is_err());
    }
}
