//! Fluent construction for `KafkaProducer`, the same shape
//! `client::builder::ClientBuilder` uses: a `with_*` method per knob,
//! consuming `self` and returning it, ending in `.build()`.

use std::rc::Rc;

use client::KafkaClient;
use compression::Compression;
use protocol::RequiredAcks;
use producer::config::ProducerConfig;
use producer::interceptor::{Interceptors, ProducerInterceptor, ProducerInterceptors};
use producer::partitioner::{DefaultPartitioner, Partitioner};
use producer::producer::KafkaProducer;

pub struct ProducerBuilder<'a> {
    client: KafkaClient<'a>,
    config: ProducerConfig,
    partitioner: Rc<Partitioner>,
    interceptors: ProducerInterceptors,
}

impl<'a> ProducerBuilder<'a>
where
    KafkaClient<'a>: 'static,
{
    /// A producer always sits atop an already-configured client; there's
    /// no `from_hosts` entry point the way `ClientBuilder` has one.
    pub fn from_client(client: KafkaClient<'a>) -> Self {
        ProducerBuilder {
            client,
            config: ProducerConfig::default(),
            partitioner: Rc::new(DefaultPartitioner::new()),
            interceptors: ProducerInterceptors::new(),
        }
    }

    pub fn with_acks(mut self, acks: RequiredAcks) -> Self {
        self.config.acks = acks;
        self
    }

    pub fn with_ack_timeout_millis(mut self, millis: u64) -> Self {
        self.config.ack_timeout_millis = millis;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn with_linger_millis(mut self, millis: u64) -> Self {
        self.config.linger_millis = millis;
        self
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.config.max_request_size = max_request_size;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn with_retries(mut self, retries: Option<u32>) -> Self {
        self.config.retries = retries;
        self
    }

    /// Forces `acks = All` and unlimited retries, matching
    /// `ProducerConfig::with_idempotence`.
    pub fn with_idempotence(mut self) -> Self {
        self.config = self.config.with_idempotence();
        self
    }

    pub fn with_transactional_id<S: Into<String>>(mut self, transactional_id: S) -> Self {
        self.config.transactional_id = Some(transactional_id.into());
        self
    }

    pub fn with_partitioner(mut self, partitioner: Rc<Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn with_interceptor(mut self, interceptor: Box<ProducerInterceptor>) -> Self {
        self.interceptors.add(interceptor);
        self
    }

    pub fn build(self) -> KafkaProducer<'a> {
        KafkaProducer::new(
            self.client,
            self.config,
            self.partitioner,
            Rc::new(self.interceptors),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_idempotence_forces_all_acks() {
        // `KafkaClient` needs a running reactor `Handle` to construct, so
        // this only exercises the config half of the builder directly.
        let config = ProducerConfig::default().with_idempotence();
        assert_eq!(config.acks, RequiredAcks::All);
        assert_eq!(config.retries, None);
    }
}
