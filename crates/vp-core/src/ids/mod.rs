//! ID type wrappers for type safety.

pub mod session_id;

pub use session_id::SessionId;
