//! Fluent construction for `KafkaConsumer`, the same shape
//! `producer::builder::ProducerBuilder` uses: a `with_*` method per
//! knob, consuming `self` and returning it, ending in `.build()`.

use std::cell::RefCell;
use std::rc::Rc;

use client::{IsolationLevel, KafkaClient};

use consumer::assignor::{PartitionAssignor, RoundRobinAssignor};
use consumer::config::{AutoOffsetReset, ConsumerConfig};
use consumer::consumer::KafkaConsumer;
use consumer::coordinator::ConsumerCoordinator;
use consumer::subscriptions::Subscriptions;

pub struct ConsumerBuilder<'a> {
    client: KafkaClient<'a>,
    config: ConsumerConfig,
    assignors: Vec<Box<PartitionAssignor>>,
    topics: Vec<String>,
}

impl<'a> ConsumerBuilder<'a>
    where KafkaClient<'a>: 'static
{
    /// A consumer always sits atop an already-configured client; there's
    /// no `from_hosts` entry point the way `ClientBuilder` has one.
    pub fn from_client(client: KafkaClient<'a>) -> Self {
        ConsumerBuilder {
            client,
            config: ConsumerConfig::default(),
            assignors: vec![Box::new(RoundRobinAssignor)],
            topics: Vec::new(),
        }
    }

    pub fn with_group_id<S: Into<String>>(mut self, group_id: S) -> Self {
        self.config.group_id = group_id.into();
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_session_timeout_millis(mut self, millis: u64) -> Self {
        self.config.session_timeout_millis = millis;
        self
    }

    pub fn with_rebalance_timeout_millis(mut self, millis: u64) -> Self {
        self.config.rebalance_timeout_millis = millis;
        self
    }

    pub fn with_heartbeat_interval_millis(mut self, millis: u64) -> Self {
        self.config.heartbeat_interval_millis = millis;
        self
    }

    pub fn with_retry_backoff_millis(mut self, millis: u64) -> Self {
        self.config.retry_backoff_millis = millis;
        self
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.config.auto_commit = auto_commit;
        self
    }

    pub fn with_auto_commit_interval_millis(mut self, millis: u64) -> Self {
        self.config.auto_commit_interval_millis = millis;
        self
    }

    pub fn with_auto_offset_reset(mut self, reset: AutoOffsetReset) -> Self {
        self.config.auto_offset_reset = reset;
        self
    }

    pub fn with_max_poll_records(mut self, max_poll_records: usize) -> Self {
        self.config.max_poll_records = max_poll_records;
        self
    }

    pub fn with_fetch_min_bytes(mut self, fetch_min_bytes: i32) -> Self {
        self.config.fetch_min_bytes = fetch_min_bytes;
        self
    }

    pub fn with_fetch_max_bytes(mut self, fetch_max_bytes: i32) -> Self {
        self.config.fetch_max_bytes = fetch_max_bytes;
        self
    }

    pub fn with_fetch_max_wait_millis(mut self, millis: u64) -> Self {
        self.config.fetch_max_wait_millis = millis;
        self
    }

    pub fn with_isolation_level(mut self, isolation_level: IsolationLevel) -> Self {
        self.config.isolation_level = isolation_level;
        self
    }

    /// Registers an additional assignment strategy the group leader can
    /// be asked to run, alongside the default `RoundRobinAssignor`.
    pub fn with_assignor(mut self, assignor: Box<PartitionAssignor>) -> Self {
        self.assignors.push(assignor);
        self
    }

    pub fn build(self) -> KafkaConsumer<'a> {
        let subscriptions = Rc::new(RefCell::new(Subscriptions::new(self.topics)));
        let timer = self.client.timer();

        let coordinator = ConsumerCoordinator::new(self.client.clone(),
                                                    self.config.group_id.clone(),
                                                    subscriptions.clone(),
                                                    self.config.session_timeout(),
                                                    self.config.rebalance_timeout(),
                                                    self.config.heartbeat_interval(),
                                                    self.config.retry_backoff(),
                                                    self.assignors,
                                                    timer);

        KafkaConsumer::new(self.client, self.config, subscriptions, coordinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_group_id_and_topics_populate_config() {
        // `KafkaClient` needs a running reactor `Handle` to construct, so
        // this only exercises the config half of the builder directly.
        let config = ConsumerConfig::with_group_id("my-group");
        assert_eq!(config.group_id, "my-group");
        assert_eq!(config.auto_offset_reset, AutoOffsetReset::Latest);
    }
}
