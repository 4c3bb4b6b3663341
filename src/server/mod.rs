// ABOUTME: The server half: config, shared context, admission control, acceptor, and per-connection workers

pub mod admission;
pub mod config;
pub mod context;
pub mod listener;
pub mod stats;
pub mod worker;

pub use admission::{Admission, Slot};
pub use config::ServerConfig;
pub use context::ServerContext;
pub use stats::{run_reporter, Statistics};
