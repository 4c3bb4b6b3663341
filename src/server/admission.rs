// ABOUTME: Bounded admission control — a counting semaphore gating concurrent connections
// ABOUTME: a connectionLimit of 0 means unlimited, so there is no semaphore to acquire at all

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One admission slot, held by a worker from accept to exit. Dropping it
/// releases the slot back to the acceptor.
pub enum Slot {
    Unbounded,
    Bounded(OwnedSemaphorePermit),
}

/// The acceptor's admission gate. `connectionLimit == 0` is modelled as
/// "no semaphore", matching the reference, which leaves the pointer null
/// rather than constructing one with no limit.
pub struct Admission {
    semaphore: Option<Arc<Semaphore>>,
}

impl Admission {
    pub fn new(connection_limit: u32) -> Self {
        let semaphore =
            (connection_limit != 0).then(|| Arc::new(Semaphore::new(connection_limit as usize)));
        Admission { semaphore }
    }

    /// Blocks until a slot is available when bounded; returns immediately
    /// when unbounded.
    pub async fn acquire(&self) -> Slot {
        match &self.semaphore {
            None => Slot::Unbounded,
            Some(semaphore) => Slot::Bounded(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("admission semaphore is never closed"),
            ),
        }
    }

    #[cfg(test)]
    pub fn available_permits(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}
