//! Typed consumer configuration: a `Default`-able struct plus the
//! millisecond constants `consumer::coordinator`/`consumer::consumer`
//! read, the same shape as `client::ClientConfig`/`producer::ProducerConfig`.

use std::time::Duration;

use client::IsolationLevel;

pub const DEFAULT_SESSION_TIMEOUT_MILLIS: u64 = 10 * 1000;
pub const DEFAULT_REBALANCE_TIMEOUT_MILLIS: u64 = 60 * 1000;
/// `sessionTimeout / 3`, the group coordinator's default ratio.
pub const DEFAULT_HEARTBEAT_INTERVAL_MILLIS: u64 = DEFAULT_SESSION_TIMEOUT_MILLIS / 3;
pub const DEFAULT_RETRY_BACKOFF_MILLIS: u64 = 100;
pub const DEFAULT_AUTO_COMMIT_INTERVAL_MILLIS: u64 = 5 * 1000;
pub const DEFAULT_MAX_POLL_RECORDS: usize = 500;
pub const DEFAULT_FETCH_MIN_BYTES: i32 = 1;
pub const DEFAULT_FETCH_MAX_BYTES: i32 = 50 * 1024 * 1024;
pub const DEFAULT_FETCH_MAX_WAIT_MILLIS: u64 = 500;

/// Where a fresh partition with no committed offset starts reading from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoOffsetReset {
    Earliest,
    Latest,
}

#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub group_id: String,
    pub session_timeout_millis: u64,
    pub rebalance_timeout_millis: u64,
    pub heartbeat_interval_millis: u64,
    pub retry_backoff_millis: u64,
    /// `false` requires the caller to call `commit`/`commit_async` itself.
    pub auto_commit: bool,
    pub auto_commit_interval_millis: u64,
    pub auto_offset_reset: AutoOffsetReset,
    pub max_poll_records: usize,
    pub fetch_min_bytes: i32,
    pub fetch_max_bytes: i32,
    pub fetch_max_wait_millis: u64,
    pub isolation_level: IsolationLevel,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            group_id: String::new(),
            session_timeout_millis: DEFAULT_SESSION_TIMEOUT_MILLIS,
            rebalance_timeout_millis: DEFAULT_REBALANCE_TIMEOUT_MILLIS,
            heartbeat_interval_millis: DEFAULT_HEARTBEAT_INTERVAL_MILLIS,
            retry_backoff_millis: DEFAULT_RETRY_BACKOFF_MILLIS,
            auto_commit: true,
            auto_commit_interval_millis: DEFAULT_AUTO_COMMIT_INTERVAL_MILLIS,
            auto_offset_reset: AutoOffsetReset::Latest,
            max_poll_records: DEFAULT_MAX_POLL_RECORDS,
            fetch_min_bytes: DEFAULT_FETCH_MIN_BYTES,
            fetch_max_bytes: DEFAULT_FETCH_MAX_BYTES,
            fetch_max_wait_millis: DEFAULT_FETCH_MAX_WAIT_MILLIS,
            isolation_level: IsolationLevel::ReadUncommitted,
        }
    }
}

impl ConsumerConfig {
    pub fn with_group_id<S: Into<String>>(group_id: S) -> Self {
        ConsumerConfig { group_id: group_id.into(), ..Default::default() }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_millis)
    }

    pub fn rebalance_timeout(&self) -> Duration {
        Duration::from_millis(self.rebalance_timeout_millis)
    }

    /// Falls back to `session_timeout / 3` if the configured interval
    /// would exceed the session timeout, matching the state machine's
    /// `heartbeatInterval <= sessionTimeout` invariant.
    pub fn heartbeat_interval(&self) -> Duration {
        if self.heartbeat_interval_millis >= self.session_timeout_millis {
            Duration::from_millis(self.session_timeout_millis / 3)
        } else {
            Duration::from_millis(self.heartbeat_interval_millis)
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_millis)
    }

    pub fn auto_commit_interval(&self) -> Duration {
        Duration::from_millis(self.auto_commit_interval_millis)
    }

    pub fn fetch_max_wait(&self) -> Duration {
        Duration::from_millis(self.fetch_max_wait_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ConsumerConfig::default();
        assert_eq!(config.session_timeout_millis, DEFAULT_SESSION_TIMEOUT_MILLIS);
        assert_eq!(config.max_poll_records, DEFAULT_MAX_POLL_RECORDS);
        assert!(config.auto_commit);
    }

    #[test]
    fn heartbeat_interval_clamps_below_session_timeout() {
        let mut config = ConsumerConfig::default();
        config.heartbeat_interval_millis = config.session_timeout_millis;

        assert!(config.heartbeat_interval() < config.session_timeout());
    }
}
