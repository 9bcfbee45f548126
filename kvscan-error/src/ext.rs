use std::{any::Any, error::Error};

use crate::StatusCode;

/// Object-safe extension implemented by every error of the workspace.
///
/// Gives access to the status code and a message safe to show to the caller.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Status code of the error.
    ///
    /// Defaults to [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Returns the error as [`Any`](std::any::Any) so it can be downcast to
    /// its concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Message safe to hand to a caller.
    ///
    /// Internal failures collapse to `"Internal error"`.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Internal => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }
}
