use std::sync::Arc;

use kvscan_error::{CommandError, KvResult};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::trace;

use super::Completion;
use crate::protocol::{Command, Reply};

/// Blocking request/response channel to the store.
///
/// Encoding the command and decoding the reply into a [`Reply`] are the
/// transport's job. Store-side errors come back as `Ok(Reply::Error(..))`;
/// `Err` means the request itself did not complete.
pub trait Transport {
    fn execute(
        &mut self,
        command: &Command,
    ) -> KvResult<Reply>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn execute(
        &mut self,
        command: &Command,
    ) -> KvResult<Reply> {
        (**self).execute(command)
    }
}

/// Transport that hands back a completion handle for each command.
pub trait AsyncTransport {
    fn dispatch(
        &self,
        command: Command,
    ) -> Completion<Reply>;
}

/// Runs a blocking [`Transport`] on tokio's blocking pool.
///
/// Commands on the same dispatcher are serialized by a mutex around the
/// transport.
pub struct BlockingDispatcher<T> {
    transport: Arc<Mutex<T>>,
}

impl<T> Clone for BlockingDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> BlockingDispatcher<T>
where
    T: Transport + Send + 'static,
{
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
        }
    }
}

impl<T> AsyncTransport for BlockingDispatcher<T>
where
    T: Transport + Send + 'static,
{
    fn dispatch(
        &self,
        command: Command,
    ) -> Completion<Reply> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                return Completion::failed(CommandError::transport(
                    "no tokio runtime to dispatch on",
                ))
            }
        };

        let (tx, completion) = Completion::channel();
        let transport = Arc::clone(&self.transport);
        handle.spawn_blocking(move || {
            let result = transport.lock().execute(&command);
            if !tx.complete(result) {
                trace!(command = command.name(), "Reply dropped, caller went away");
            }
        });
        completion
    }
}
