//! Typed client configuration: no file/env parsing, just a `Default`-able
//! struct and the millisecond constants `client::client::KafkaClient
//! ::from_config` reads via its inline `config.max_connection_idle()`/
//! `.timer()`/`.request_timeout()` call sites.

use std::net::SocketAddr;
use std::time::Duration;

use tokio_timer::Timer;

use client::version::KafkaVersion;

pub const DEFAULT_MAX_CONNECTION_IDLE_TIMEOUT_MILLIS: u64 = 5 * 60 * 1000;
pub const DEFAULT_METADATA_MAX_AGE_MILLS: u64 = 5 * 60 * 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MILLS: u64 = 30 * 1000;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Bootstrap addresses, raced with `future::select_ok` on first
    /// metadata load.
    pub hosts: Vec<SocketAddr>,
    pub client_id: Option<String>,
    pub max_connection_idle_timeout_millis: u64,
    pub request_timeout_millis: u64,
    /// `0` disables the periodic background refresh entirely.
    pub metadata_max_age_millis: u64,
    /// Probe each broker with `ApiVersions` before relying on
    /// `broker_version_fallback`.
    pub api_version_request: bool,
    pub broker_version_fallback: KafkaVersion,
    /// Whether `KafkaClient::from_config` registers a `Metrics` handle.
    pub metrics: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            hosts: Vec::new(),
            client_id: None,
            max_connection_idle_timeout_millis: DEFAULT_MAX_CONNECTION_IDLE_TIMEOUT_MILLIS,
            request_timeout_millis: DEFAULT_REQUEST_TIMEOUT_MILLS,
            metadata_max_age_millis: DEFAULT_METADATA_MAX_AGE_MILLS,
            api_version_request: true,
            broker_version_fallback: KafkaVersion::default(),
            metrics: false,
        }
    }
}

impl ClientConfig {
    pub fn new<I>(hosts: I) -> Self
    where
        I: IntoIterator<Item = SocketAddr>,
    {
        ClientConfig {
            hosts: hosts.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn max_connection_idle(&self) -> Duration {
        Duration::from_millis(self.max_connection_idle_timeout_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_millis)
    }

    /// Exposed as an integer too since callers gate the background
    /// refresh task on `metadata_max_age > 0` before ever building a
    /// `Duration` from it.
    pub fn metadata_max_age(&self) -> Duration {
        Duration::from_millis(self.metadata_max_age_millis)
    }

    pub fn timer(&self) -> Timer {
        Timer::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ClientConfig::default();
        assert_eq!(config.max_connection_idle_timeout_millis, DEFAULT_MAX_CONNECTION_IDLE_TIMEOUT_MILLIS);
        assert_eq!(config.request_timeout_millis, DEFAULT_REQUEST_TIMEOUT_MILLS);
    }
}
