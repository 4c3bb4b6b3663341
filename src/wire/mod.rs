// ABOUTME: The binary wire protocol: frame types, encode/decode, and the byte-level I/O they build on

pub mod codec;
pub mod io;
pub mod message;

pub use codec::{read_request, write_raw, write_request, write_response, ProtocolError, ReadOutcome};
pub use message::{RequestOp, Response, ResponseOp, Request, MAGIC, MAGIC_U32};
