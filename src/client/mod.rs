//! Client side: transports, completion handles and command surfaces.

pub mod async_client;
pub mod completion;
pub mod options;
pub mod sync;
pub mod transport;

pub use async_client::AsyncClient;
pub use completion::{Completion, CompletionSender};
pub use options::ClientOptions;
pub use sync::{Client, ScanPages};
pub use transport::{AsyncTransport, BlockingDispatcher, Transport};
