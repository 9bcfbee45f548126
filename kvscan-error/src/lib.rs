pub mod ext;
pub mod macros;
pub mod stack;
pub mod status_code;
pub mod types;

// Re-export every error type and helper from the submodules so callers can
// depend on the crate root only.
pub use ext::*;
pub use macros::*;
pub use stack::*;
pub use status_code::*;
pub use types::*;

pub type KvResult<T> = Result<T, StackError>;
