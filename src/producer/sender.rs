//! Turns drained `ProducerBatch`es into produce requests against
//! `client::Client`, the same "build request, call service, interpret
//! response" shape `client::client::Inner::produce_records` uses one layer
//! down. Handles the idempotent producer's per-partition sequence counter
//! and the one-shot retry on stale metadata.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use futures::Future;
use futures::future;

use client::{Client, KafkaClient, ProducerIdAndEpoch};
use errors::{ErrorKind, KafkaCode};
use network::TopicPartition;
use protocol::record_batch::{BatchOptions, Record};
use protocol::{ErrorCode, Offset, PartitionId, RequiredAcks};

use producer::batch::{ProducerBatch, Thunk};
use producer::config::ProducerConfig;
use producer::record::RecordMetadata;

/// The future of `Sender::send_batch`: resolves once every thunk in the
/// batch has been notified, successfully or not.
pub type SendBatch = Box<Future<Item = (), Error = ()>>;

type Attempt = Box<Future<Item = Vec<(PartitionId, ErrorCode, Offset)>, Error = ()>>;

/// Sends drained batches and fans their result back out to each record's
/// waiting thunk. Tracks the idempotent producer's per-partition sequence
/// numbers.
#[derive(Clone)]
pub struct Sender<'a> {
    client: KafkaClient<'a>,
    config: Rc<ProducerConfig>,
    sequences: Rc<RefCell<HashMap<(String, PartitionId), i32>>>,
}

impl<'a> Sender<'a>
    where KafkaClient<'a>: 'static
{
    pub fn new(client: KafkaClient<'a>, config: Rc<ProducerConfig>) -> Self {
        Sender {
            client,
            config,
            sequences: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn next_base_sequence(&self, topic: &str, partition: PartitionId, count: i32) -> i32 {
        let mut sequences = self.sequences.borrow_mut();
        let entry = sequences.entry((topic.to_owned(), partition)).or_insert(0);
        let base = *entry;
        *entry = entry.wrapping_add(count);
        base
    }

    /// Sends one drained batch. `producer_id` is `Some` only when the
    /// idempotent producer has completed `InitProducerId`.
    pub fn send_batch(&self, batch: ProducerBatch, producer_id: Option<ProducerIdAndEpoch>) -> SendBatch {
        let (topic, partition, records, thunks) = batch.into_parts();
        let record_count = records.len() as i32;

        let batch_opts = match producer_id {
            Some(id) => {
                let base_sequence = self.next_base_sequence(&topic, partition, record_count);
                BatchOptions {
                    compression: self.config.compression,
                    producer_id: id.producer_id,
                    producer_epoch: id.producer_epoch,
                    base_sequence,
                    is_transactional: self.config.transactional_id.is_some(),
                }
            }
            None => BatchOptions { compression: self.config.compression, ..BatchOptions::default() },
        };

        let result_topic = topic.clone();
        let attempt = Self::attempt(self.client.clone(),
                                    self.config.acks,
                                    self.config.ack_timeout(),
                                    topic,
                                    partition,
                                    records,
                                    batch_opts,
                                    self.config.repeat_on_stale_metadata);

        let completed = attempt.map(move |results| Self::fulfil(result_topic, partition, thunks, results));

        Box::new(completed)
    }

    /// Sends the batch once; on a stale-metadata error and
    /// `repeat_on_stale_metadata`, refreshes the cluster metadata and tries
    /// exactly once more with the same records.
    fn attempt(client: KafkaClient<'a>,
               acks: RequiredAcks,
               ack_timeout: Duration,
               topic: String,
               partition: PartitionId,
               records: Vec<Record>,
               batch_opts: BatchOptions,
               repeat_on_stale_metadata: bool)
               -> Attempt {
        let retry_records = records.clone();
        let retry_topic = topic.clone();
        let retry_batch_opts = batch_opts.clone();
        let mut retry_client = client.clone();

        let tp = TopicPartition::new(topic, partition);

        let first = client.produce_batch(acks, ack_timeout, tp, records, batch_opts)
            .then(move |result| -> Attempt {
                match result {
                    Ok(results) => Box::new(future::ok(results)),
                    Err(err) => {
                        let retryable = repeat_on_stale_metadata &&
                            match *err.kind() {
                                ErrorKind::KafkaError(code) => code.has_stale_metadata(),
                                _ => false,
                            };

                        if !retryable {
                            return Box::new(future::ok(vec![(partition, KafkaCode::Unknown as ErrorCode, -1)]));
                        }

                        let retry_tp = TopicPartition::new(retry_topic, partition);

                        Box::new(retry_client.load_metadata()
                                     .map_err(|_| ())
                                     .and_then(move |_| {
                            retry_client.produce_batch(acks, ack_timeout, retry_tp, retry_records, retry_batch_opts)
                                .map_err(|_| ())
                        }))
                    }
                }
            });

        Box::new(first)
    }

    fn fulfil(topic: String, partition: PartitionId, thunks: Vec<Thunk>, results: Vec<(PartitionId, ErrorCode, Offset)>) {
        let (error_code, base_offset) = results
            .into_iter()
            .find(|&(p, _, _)| p == partition)
            .map(|(_, code, offset)| (code, offset))
            .unwrap_or((KafkaCode::Unknown as ErrorCode, -1));

        for (index, thunk) in thunks.into_iter().enumerate() {
            if error_code == KafkaCode::None as ErrorCode {
                thunk.complete(Ok(RecordMetadata {
                                       topic: topic.clone(),
                                       partition,
                                       offset: base_offset + index as Offset,
                                   }));
            } else {
                thunk.complete(Err(ErrorKind::KafkaError(error_code.into()).into()));
            }
        }
    }
}
