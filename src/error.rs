// ABOUTME: Crate-wide error and result aliases used by glue code
// ABOUTME: Protocol-level and component-level errors are concrete enums; see wire::codec and server::config

/// A boxed, erased error for code paths where the caller only needs to
/// propagate a failure, not match on its shape. Concrete protocol errors
/// (see [`crate::wire::codec::ProtocolError`]) stay as typed enums so the
/// worker state machine can match on them to pick the right error frame;
/// everything above that boundary collapses into this alias, the same
/// split `smpp`'s `lib.rs` draws between `frame::Error` and `smpp::Error`.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
