//! Typed producer configuration, the same shape as `client::ClientConfig`:
//! a `Default`-able struct plus the millisecond/byte constants `producer::
//! {accumulator, sender}` read.

use std::time::Duration;

use compression::Compression;
use protocol::RequiredAcks;

pub const DEFAULT_ACK_TIMEOUT_MILLIS: u64 = 30 * 1000;
pub const DEFAULT_BATCH_SIZE: usize = 16 * 1024;
pub const DEFAULT_LINGER_MILLIS: u64 = 0;
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ProducerConfig {
    pub acks: RequiredAcks,
    pub ack_timeout_millis: u64,
    /// Bytes of uncompressed record payload accumulated per partition
    /// before a batch is cut early (linger aside).
    pub batch_size: usize,
    /// How long a non-full batch waits before being sent anyway.
    pub linger_millis: u64,
    pub max_request_size: usize,
    pub compression: Compression,
    /// Enables `producerId`/`producerEpoch`/`baseSequence` stamping via
    /// `InitProducerId`; forces `acks = All` and unlimited retries.
    pub idempotent: bool,
    /// `None` = unlimited (required when `idempotent` is set).
    pub retries: Option<u32>,
    /// Clear the metadata cache and retry once on
    /// `KafkaCode::has_stale_metadata`.
    pub repeat_on_stale_metadata: bool,
    pub transactional_id: Option<String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        ProducerConfig {
            acks: RequiredAcks::All,
            ack_timeout_millis: DEFAULT_ACK_TIMEOUT_MILLIS,
            batch_size: DEFAULT_BATCH_SIZE,
            linger_millis: DEFAULT_LINGER_MILLIS,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            compression: Compression::None,
            idempotent: false,
            retries: Some(0),
            repeat_on_stale_metadata: true,
            transactional_id: None,
        }
    }
}

impl ProducerConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_millis)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_millis)
    }

    /// Normalizes the config the way `initIdempotentProducer` requires:
    /// `acks=ALL`, unlimited retries.
    pub fn with_idempotence(mut self) -> Self {
        self.idempotent = true;
        self.acks = RequiredAcks::All;
        self.retries = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ProducerConfig::default();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.ack_timeout_millis, DEFAULT_ACK_TIMEOUT_MILLIS);
        assert!(!config.idempotent);
    }

    #[test]
    fn idempotence_forces_all_acks_and_unlimited_retries() {
        let config = ProducerConfig::default().with_idempotence();
        assert_eq!(config.acks, RequiredAcks::All);
        assert_eq!(config.retries, None);
    }
}
