// ABOUTME: Face detection/replacement network service
// ABOUTME: wire holds the framing, vision the image pipeline, server the acceptor/admission/stats

pub mod error;
pub mod server;
pub mod vision;
pub mod wire;

pub use error::{Error, Result};
