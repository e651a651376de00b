//! `KafkaConsumer`, the public entry point `consumer::builder` hands
//! back. Wires `consumer::coordinator::ConsumerCoordinator` and
//! `consumer::fetcher::Fetcher` together over a shared
//! `consumer::subscriptions::Subscriptions`, the way `producer::producer
//! ::KafkaProducer` wires its accumulator and sender: a thin struct
//! holding `Rc`-shared state plus background tasks spawned on the
//! reactor `Handle`.

use std::cell::RefCell;
use std::rc::Rc;

use futures::{future, Future, Stream};
use tokio_core::reactor::Handle;

use client::{Client, KafkaClient, StaticBoxFuture};
use errors::{Error, KafkaCode};
use network::TopicPartition;
use protocol::record_batch::RecordHeader;
use protocol::{Offset, PartitionId};

use consumer::config::ConsumerConfig;
use consumer::coordinator::{ConsumerCoordinator, Coordinator};
use consumer::fetcher::Fetcher;
use consumer::subscriptions::Subscriptions;

/// One decoded record handed back from `Consumer::poll`, tagged with
/// the partition it came from.
#[derive(Clone, Debug)]
pub struct ConsumerRecord {
    pub topic: String,
    pub partition: PartitionId,
    pub offset: Offset,
    pub timestamp: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Vec<RecordHeader>,
}

/// The future of `Consumer::subscribe`/`Consumer::close`.
pub type Join = StaticBoxFuture;

/// The future of `Consumer::poll`.
pub type PollRecords = StaticBoxFuture<Vec<ConsumerRecord>>;

/// The future of `Consumer::commit`.
pub type Commit = StaticBoxFuture<()>;

/// A high-level, group-managed Kafka consumer.
pub trait Consumer<'a> {
    /// Subscribes to `topics`, joins the consumer group and starts the
    /// heartbeat (and, if `auto_commit` is enabled, the offset-commit)
    /// background loops.
    fn subscribe(&mut self) -> Join;

    /// Fetches whatever records are currently available for the
    /// assigned, unpaused partitions. Resolves immediately with an
    /// empty `Vec` if nothing is assigned yet.
    fn poll(&self) -> PollRecords;

    /// Commits every assigned partition's current position for the
    /// group's current generation.
    fn commit(&self) -> Commit;

    fn seek(&self, partition: &TopicPartition<'static>, offset: Offset);

    fn pause(&self, partition: &TopicPartition<'static>);

    fn resume(&self, partition: &TopicPartition<'static>);

    fn assignment(&self) -> Vec<TopicPartition<'static>>;

    /// Leaves the group. Background loops started by `subscribe` stop
    /// once their next tick observes the member has left.
    fn close(&mut self) -> Join;
}

pub struct KafkaConsumer<'a> {
    client: KafkaClient<'a>,
    config: Rc<ConsumerConfig>,
    subscriptions: Rc<RefCell<Subscriptions<'a>>>,
    coordinator: Rc<RefCell<ConsumerCoordinator<'a>>>,
    fetcher: Fetcher<'a>,
    handle: Handle,
}

impl<'a> KafkaConsumer<'a>
    where KafkaClient<'a>: 'static
{
    pub fn new(client: KafkaClient<'a>,
               config: ConsumerConfig,
               subscriptions: Rc<RefCell<Subscriptions<'a>>>,
               coordinator: ConsumerCoordinator<'a>)
               -> Self {
        let config = Rc::new(config);
        let coordinator = Rc::new(RefCell::new(coordinator));
        let fetcher = Fetcher::new(client.clone(), config.clone(), subscriptions.clone());
        let handle = client.handle().clone();

        KafkaConsumer {
            client,
            config,
            subscriptions,
            coordinator,
            fetcher,
            handle,
        }
    }

    fn spawn_auto_commit_loop(&self) {
        if !self.config.auto_commit {
            return;
        }

        let client = self.client.clone();
        let subscriptions = self.subscriptions.clone();
        let coordinator = self.coordinator.clone();
        let timer = self.client.timer();

        self.handle
            .spawn(timer
                       .interval(self.config.auto_commit_interval())
                       .map_err(Error::from)
                       .for_each(move |_| commit_assigned(&client, &subscriptions, &coordinator))
                       .map_err(|err| {
                                    warn!("auto commit failed, {}", err);
                                }));
    }
}

fn commit_assigned<'a>(client: &KafkaClient<'a>,
                       subscriptions: &Rc<RefCell<Subscriptions<'a>>>,
                       coordinator: &Rc<RefCell<ConsumerCoordinator<'a>>>)
                       -> Box<Future<Item = (), Error = Error>>
    where KafkaClient<'a>: 'static
{
    let (broker, generation) = match coordinator.borrow().current_generation() {
        Some(generation) => generation,
        None => return Box::new(future::ok(())),
    };

    let offsets: Vec<(TopicPartition<'static>, Offset)> = {
        let subscriptions = subscriptions.borrow();
        subscriptions
            .assigned_partitions()
            .into_iter()
            .filter_map(|tp| subscriptions.position(&tp).map(|offset| (tp, offset)))
            .collect()
    };

    if offsets.is_empty() {
        return Box::new(future::ok(()));
    }

    let subscriptions = subscriptions.clone();
    let coordinator = coordinator.clone();

    Box::new(client
                 .commit_offsets(broker, generation, offsets.clone())
                 .and_then(move |results| {
                     let mut needs_rejoin = false;

                     {
                         let mut subscriptions = subscriptions.borrow_mut();

                         for ((tp, offset), (_partition, error_code)) in
                             offsets.into_iter().zip(results) {
                             if KafkaCode::from_code(error_code).needs_rejoin() {
                                 needs_rejoin = true;
                             } else {
                                 subscriptions.mark_committed(&tp, offset);
                             }
                         }
                     }

                     if needs_rejoin {
                         warn!("lost generation while committing offsets, rejoining group");

                         future::Either::A(coordinator.borrow_mut().join_group().map(|_| ()))
                     } else {
                         future::Either::B(future::ok::<(), Error>(()))
                     }
                 }))
}

impl<'a> Consumer<'a> for KafkaConsumer<'a>
    where KafkaClient<'a>: 'static
{
    fn subscribe(&mut self) -> Join {
        self.spawn_auto_commit_loop();

        self.coordinator.borrow_mut().join_group()
    }

    fn poll(&self) -> PollRecords {
        let future = self.fetcher
            .poll()
            .map(|partitions| {
                     partitions
                         .into_iter()
                         .flat_map(|partition| {
                             let topic = partition.partition.topic_name.into_owned();
                             let partition_id = partition.partition.partition;

                             partition
                                 .records
                                 .into_iter()
                                 .map(move |record| {
                                          ConsumerRecord {
                                              topic: topic.clone(),
                                              partition: partition_id,
                                              offset: record.offset,
                                              timestamp: record.timestamp,
                                              key: record.key,
                                              value: record.value,
                                              headers: record.headers,
                                          }
                                      })
                         })
                         .collect()
                 });

        PollRecords::new(future)
    }

    fn commit(&self) -> Commit {
        let client = self.client.clone();
        let subscriptions = self.subscriptions.clone();
        let coordinator = self.coordinator.clone();

        Commit::new(commit_assigned(&client, &subscriptions, &coordinator))
    }

    fn seek(&self, partition: &TopicPartition<'static>, offset: Offset) {
        self.subscriptions.borrow_mut().seek(partition, offset);
    }

    fn pause(&self, partition: &TopicPartition<'static>) {
        self.subscriptions.borrow_mut().pause(partition);
    }

    fn resume(&self, partition: &TopicPartition<'static>) {
        self.subscriptions.borrow_mut().resume(partition);
    }

    fn assignment(&self) -> Vec<TopicPartition<'static>> {
        self.subscriptions.borrow().assigned_partitions()
    }

    fn close(&mut self) -> Join {
        self.coordinator.borrow_mut().leave_group()
    }
}
