//! Turns `Subscriptions::fetchable_partitions` into a `Client::fetch`
//! call and feeds the response back into `Subscriptions`, the same
//! "read state, call client, write state back" shape
//! `producer::sender::Sender::send_batch` uses for the produce side.
//! Partitions with no known position are resolved first, via
//! `auto_offset_reset` (`ListOffsets` earliest/latest).

use std::cell::RefCell;
use std::rc::Rc;

use futures::Future;
use futures::future;

use client::{Client, KafkaClient, PartitionData};
use network::TopicPartition;
use protocol::{FetchOffset, Offset};

use consumer::config::{AutoOffsetReset, ConsumerConfig};
use consumer::subscriptions::Subscriptions;

pub type Poll = Box<Future<Item = Vec<PartitionData>, Error = ::errors::Error>>;

/// Fetches records for whatever is currently assigned and unpaused.
pub struct Fetcher<'a> {
    client: KafkaClient<'a>,
    config: Rc<ConsumerConfig>,
    subscriptions: Rc<RefCell<Subscriptions<'a>>>,
}

impl<'a> Fetcher<'a>
    where KafkaClient<'a>: 'static
{
    pub fn new(client: KafkaClient<'a>,
               config: Rc<ConsumerConfig>,
               subscriptions: Rc<RefCell<Subscriptions<'a>>>)
               -> Self {
        Fetcher { client, config, subscriptions }
    }

    /// Resolves a starting offset for every fetchable partition that
    /// doesn't have one yet, then fetches all of them and advances each
    /// partition's tracked position past the last record returned.
    pub fn poll(&self) -> Poll {
        let fetchable = self.subscriptions.borrow().fetchable_partitions();

        if fetchable.is_empty() {
            return Box::new(future::ok(Vec::new()));
        }

        let (ready, unresolved): (Vec<_>, Vec<_>) =
            fetchable.into_iter().partition(|&(_, position)| position.is_some());

        let client = self.client.clone();
        let config = self.config.clone();
        let subscriptions = self.subscriptions.clone();

        let resolve: Box<Future<Item = Vec<(TopicPartition<'static>, Offset)>, Error = ::errors::Error>> =
            if unresolved.is_empty() {
                Box::new(future::ok(Vec::new()))
            } else {
                let partitions: Vec<TopicPartition<'static>> =
                    unresolved.into_iter().map(|(tp, _)| tp).collect();
                let reset = config.auto_offset_reset;
                let to_resolve = partitions.clone();

                Box::new(client
                             .fetch_offsets(partitions,
                                           match reset {
                                               AutoOffsetReset::Earliest => FetchOffset::Earliest,
                                               AutoOffsetReset::Latest => FetchOffset::Latest,
                                           })
                             .map(move |offsets| {
                                 to_resolve
                                     .into_iter()
                                     .filter_map(|tp| {
                                         offsets
                                             .get(tp.topic_name.as_ref())
                                             .and_then(|partition_offsets| {
                                                           partition_offsets
                                                               .iter()
                                                               .find(|po| po.partition == tp.partition)
                                                       })
                                             .map(|po| (tp, po.offset))
                                     })
                                     .collect()
                             }))
            };

        let already_positioned: Vec<(TopicPartition<'static>, Offset)> = ready
            .into_iter()
            .map(|(tp, position)| (tp, position.expect("filtered by position.is_some")))
            .collect();

        let max_wait = config.fetch_max_wait();
        let min_bytes = config.fetch_min_bytes;
        let max_bytes = config.fetch_max_bytes;
        let isolation_level = config.isolation_level;

        let future = resolve.and_then(move |resolved| {
            for &(ref tp, offset) in &resolved {
                subscriptions.borrow_mut().seek(tp, offset);
            }

            let mut partitions = already_positioned;
            partitions.extend(resolved);

            if partitions.is_empty() {
                return future::Either::A(future::ok(Vec::new()));
            }

            let subscriptions = subscriptions.clone();

            future::Either::B(client
                                  .fetch(partitions, max_wait, min_bytes, max_bytes, isolation_level)
                                  .map(move |partitions| {
                    advance_positions(&subscriptions, &partitions);
                    partitions
                }))
        });

        Box::new(future)
    }
}

fn advance_positions<'a>(subscriptions: &Rc<RefCell<Subscriptions<'a>>>, partitions: &[PartitionData]) {
    let mut subscriptions = subscriptions.borrow_mut();

    for partition in partitions {
        let next_offset = partition
            .records
            .last()
            .map(|record| record.offset + 1)
            .unwrap_or(partition.high_watermark);

        subscriptions.seek(&partition.partition, next_offset);
    }
}
