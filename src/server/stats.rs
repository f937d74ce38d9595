use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Process-wide connection counters plus uptime, read by nothing but
/// logging/tests today — the concrete rendering of base spec §6's
/// "notification emitted when a Connection terminates" requirement.
pub struct ServerStats {
    is_started: AtomicBool,
    started_ts_millis: AtomicI64,
    accepted: AtomicU64,
    active: AtomicU64,
    failed: AtomicU64,
}

impl ServerStats {
    pub fn new() -> ServerStats {
        ServerStats {
            is_started: AtomicBool::new(false),
            started_ts_millis: AtomicI64::new(0),
            accepted: AtomicU64::new(0),
            active: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn on_server_started(&self) {
        assert!(!self.is_started.load(Ordering::Relaxed), "server shouldn't be started yet");
        let now = Utc::now();

        self.is_started.store(true, Ordering::Relaxed);
        self.started_ts_millis.store(now.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn on_connection_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// Called once a `Connection::run` future resolves, success or not.
    pub fn on_connection_terminated(&self, succeeded: bool) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        if !succeeded {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Time past since the server started accepting connections.
    pub fn uptime(&self) -> Duration {
        assert!(self.is_started.load(Ordering::Relaxed), "server should be already started");
        let current_ts = Utc::now();
        let started_ts = self.started_utc_timestamp();

        assert!(current_ts >= started_ts);
        current_ts - started_ts
    }

    pub fn started_utc_timestamp(&self) -> DateTime<Utc> {
        assert!(self.is_started.load(Ordering::Relaxed), "server should be already started");
        DateTime::from_timestamp_millis(self.started_ts_millis.load(Ordering::Relaxed)).expect("valid datetime")
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accept_and_termination() {
        let stats = ServerStats::new();
        stats.on_server_started();

        stats.on_connection_accepted();
        stats.on_connection_accepted();
        assert_eq!(2, stats.accepted());
        assert_eq!(2, stats.active());

        stats.on_connection_terminated(true);
        assert_eq!(1, stats.active());
        assert_eq!(0, stats.failed());

        stats.on_connection_terminated(false);
        assert_eq!(0, stats.active());
        assert_eq!(1, stats.failed());
    }

    #[test]
    #[should_panic]
    fn uptime_before_start_panics() {
        let stats = ServerStats::new();
        let _ = stats.uptime();
    }
}
