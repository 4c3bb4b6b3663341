// ABOUTME: The five-counter statistics record and the SIGHUP-driven reporter task
// ABOUTME: the reporter is the only SIGHUP consumer; everything else must leave the signal alone

use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone, Copy)]
pub struct StatsSnapshot {
    pub current_clients: u64,
    pub completed_clients: u64,
    pub detect_requests: u64,
    pub replace_requests: u64,
    pub malformed_requests: u64,
}

#[derive(Debug, Default)]
struct Counters {
    current_clients: u64,
    completed_clients: u64,
    detect_requests: u64,
    replace_requests: u64,
    malformed_requests: u64,
}

/// Process-wide counters, guarded by one mutex. Every read or write takes
/// the lock for the duration of that operation only — nothing holds it
/// across an `.await`.
#[derive(Debug, Default)]
pub struct Statistics {
    inner: Mutex<Counters>,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    pub fn client_connected(&self) {
        self.inner.lock().unwrap().current_clients += 1;
    }

    pub fn client_completed(&self) {
        let mut counters = self.inner.lock().unwrap();
        counters.current_clients -= 1;
        counters.completed_clients += 1;
    }

    pub fn detect_request(&self) {
        self.inner.lock().unwrap().detect_requests += 1;
    }

    pub fn replace_request(&self) {
        self.inner.lock().unwrap().replace_requests += 1;
    }

    pub fn malformed_request(&self) {
        self.inner.lock().unwrap().malformed_requests += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.inner.lock().unwrap();
        StatsSnapshot {
            current_clients: counters.current_clients,
            completed_clients: counters.completed_clients,
            detect_requests: counters.detect_requests,
            replace_requests: counters.replace_requests,
            malformed_requests: counters.malformed_requests,
        }
    }
}

/// Blocks on `SIGHUP` and prints the snapshot to standard error each time
/// it arrives. The caller is responsible for making sure no other task
/// installs a competing `SIGHUP` handler — `tokio::signal::unix::signal`
/// already masks delivery to the process's default disposition once a
/// `Signal` exists, so a single reporter task is the only consumer.
pub async fn run_reporter(stats: Arc<Statistics>) -> std::io::Result<()> {
    let mut hangup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;
    loop {
        if hangup.recv().await.is_none() {
            return Ok(());
        }
        let snapshot = stats.snapshot();
        tracing::info!(?snapshot, "reporting statistics on SIGHUP");
        write_report(&mut std::io::stderr(), &snapshot)?;
    }
}

fn write_report(out: &mut impl Write, snapshot: &StatsSnapshot) -> std::io::Result<()> {
    writeln!(out, "Num clients connected: {}", snapshot.current_clients)?;
    writeln!(out, "Clients completed: {}", snapshot.completed_clients)?;
    writeln!(out, "Face detect requests: {}", snapshot.detect_requests)?;
    writeln!(out, "Face replace requests: {}", snapshot.replace_requests)?;
    writeln!(out, "Malformed requests: {}", snapshot.malformed_requests)?;
    out.flush()
}
