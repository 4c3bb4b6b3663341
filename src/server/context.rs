// ABOUTME: Everything a connection worker needs, shared by reference from the acceptor

use super::config::ServerConfig;
use super::stats::Statistics;
use crate::vision::{FaceDetector, ImageCodec};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A single immutable value owned by the server and shared by reference
/// into every worker. The only interior mutability lives in `stats` (its
/// own mutex) and `detector` (serializing detector access, since the
/// detector is documented as not safe for concurrent use).
pub struct ServerContext {
    pub config: ServerConfig,
    pub codec: Arc<dyn ImageCodec>,
    pub detector: Arc<Mutex<Box<dyn FaceDetector>>>,
    pub stats: Arc<Statistics>,
    pub bad_prefix_file: Vec<u8>,
}
