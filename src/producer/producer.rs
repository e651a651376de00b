//! `KafkaProducer`, the public entry point `producer::builder` hands back.
//! Wires `partitioner::Partitioner`, `accumulator::RecordAccumulator` and
//! `sender::Sender` together the way `client::client::KafkaClient` wires
//! its own middleware stack: a thin struct holding `Rc`-shared state plus
//! a background task spawned on the reactor `Handle`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::{future, Future, Stream};
use tokio_core::reactor::Handle;

use client::{Client, KafkaClient, ProducerIdAndEpoch};
use client::StaticBoxFuture;
use errors::Error;
use producer::accumulator::{Accumulator, RecordAccumulator};
use producer::config::ProducerConfig;
use producer::interceptor::ProducerInterceptors;
use producer::partitioner::Partitioner;
use producer::record::{ProducerRecord, RecordMetadata};
use producer::sender::Sender;

/// The future of `Producer::send`.
pub type SendRecord = StaticBoxFuture<RecordMetadata>;

/// The future of `Producer::flush`.
pub type Flush = StaticBoxFuture<()>;

/// Publishes records to a Kafka cluster.
pub trait Producer<'a> {
    /// Buffers `record`, assigning it a partition if it doesn't already
    /// have one, and returns a future of the broker's acknowledgement.
    /// The record may still be sitting in the accumulator when this
    /// returns; actual network I/O happens on the background send loop.
    fn send(&self, record: ProducerRecord) -> SendRecord;

    /// Drains every partition's accumulator regardless of linger and
    /// waits for all of the resulting produce requests to complete.
    fn flush(&self) -> Flush;
}

const DRAIN_TICK: Duration = Duration::from_millis(10);

fn now_millis() -> i64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    since_epoch.as_secs() as i64 * 1000 + i64::from(since_epoch.subsec_nanos() / 1_000_000)
}

pub struct KafkaProducer<'a> {
    client: KafkaClient<'a>,
    config: Rc<ProducerConfig>,
    partitioner: Rc<Partitioner>,
    accumulator: Rc<RecordAccumulator>,
    sender: Sender<'a>,
    producer_id: Rc<RefCell<Option<ProducerIdAndEpoch>>>,
    interceptors: Rc<ProducerInterceptors>,
    handle: Handle,
}

impl<'a> KafkaProducer<'a>
where
    KafkaClient<'a>: 'static,
{
    pub fn new(
        client: KafkaClient<'a>,
        config: ProducerConfig,
        partitioner: Rc<Partitioner>,
        interceptors: Rc<ProducerInterceptors>,
    ) -> Self {
        let config = Rc::new(config);
        let accumulator = Rc::new(RecordAccumulator::new(config.batch_size));
        let sender = Sender::new(client.clone(), config.clone());
        let producer_id = Rc::new(RefCell::new(None));
        let handle = client.handle().clone();

        let producer = KafkaProducer {
            client,
            config,
            partitioner,
            accumulator,
            sender,
            producer_id,
            interceptors,
            handle,
        };

        if producer.config.idempotent {
            producer.init_producer_id();
        }

        producer.spawn_drain_loop();

        producer
    }

    fn init_producer_id(&self) {
        let producer_id = self.producer_id.clone();
        let transactional_id = self.config.transactional_id.clone().map(Cow::Owned);
        let ack_timeout = self.config.ack_timeout();

        self.handle.spawn(
            self.client
                .init_producer_id(transactional_id, ack_timeout)
                .map(move |id| {
                    *producer_id.borrow_mut() = Some(id);
                })
                .map_err(|err| {
                    warn!("fail to init producer id, {}", err);
                }),
        );
    }

    fn spawn_drain_loop(&self) {
        let accumulator = self.accumulator.clone();
        let sender = self.sender.clone();
        let producer_id = self.producer_id.clone();
        let config = self.config.clone();
        let handle = self.handle.clone();
        let timer = self.client.timer();

        let loop_handle = handle.clone();

        self.handle.spawn(
            timer
                .interval(DRAIN_TICK)
                .map_err(Error::from)
                .for_each(move |_| {
                    let ready = accumulator.drain_ready(config.linger());

                    for (_key, batch) in ready {
                        let id = if config.idempotent {
                            *producer_id.borrow()
                        } else {
                            None
                        };

                        loop_handle.spawn(sender.send_batch(batch, id));
                    }

                    Ok(())
                })
                .map_err(|err| {
                    warn!("producer drain loop failed, {}", err);
                }),
        );
    }
}

impl<'a> Producer<'a> for KafkaProducer<'a>
where
    KafkaClient<'a>: 'static,
{
    fn send(&self, record: ProducerRecord) -> SendRecord {
        let record = self.interceptors.on_send(record);

        let partitioner = self.partitioner.clone();
        let accumulator = self.accumulator.clone();
        let interceptors = self.interceptors.clone();

        let ProducerRecord {
            topic,
            partition,
            key,
            value,
            timestamp,
            headers,
        } = record;

        let future = self
            .client
            .metadata()
            .and_then(move |metadata| {
                let count = metadata.partitions(&topic).map_or(1, |ps| ps.len());
                let partition = partition.unwrap_or_else(|| {
                    partitioner.partition(&topic, key.as_ref().map(|k| k.as_slice()), count)
                });

                let timestamp = timestamp.unwrap_or_else(now_millis);

                accumulator.append(topic, partition, timestamp, key, value, headers)
            })
            .then(move |result| {
                interceptors.on_acknowledgement(&result);
                result
            });

        SendRecord::new(future)
    }

    fn flush(&self) -> Flush {
        let sender = self.sender.clone();
        let producer_id = *self.producer_id.borrow();
        let idempotent = self.config.idempotent;

        let pending: Vec<_> = self
            .accumulator
            .drain_all()
            .into_iter()
            .map(|(_key, batch)| {
                let id = if idempotent { producer_id } else { None };
                sender.send_batch(batch, id)
            })
            .collect();

        // Individual batch failures are already delivered to their
        // per-record thunks by `Sender::send_batch`; flushing only needs
        // to know that every drained batch finished, not how.
        let all = future::join_all(pending)
            .map(|_| ())
            .map_err(|_| Error::from("producer flush task failed unexpectedly"));

        Flush::new(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use producer::config::DEFAULT_ACK_TIMEOUT_MILLIS;

    #[test]
    fn drain_tick_is_short_relative_to_default_ack_timeout() {
        assert!(DRAIN_TICK < Duration::from_millis(DEFAULT_ACK_TIMEOUT_MILLIS));
    }
}
