use std::mem;
use std::rc::Rc;
use std::borrow::Cow;
use std::fmt::Debug;
use std::cell::RefCell;
use std::ops::Deref;
use std::net::{SocketAddr, ToSocketAddrs};
use std::collections::HashMap;
use std::iter::FromIterator;
use std::time::Duration;

use bytes::Bytes;

use rand::{self, Rng};

use futures::{Async, IntoFuture, Poll};
use futures::future::{self, Future};
use futures::unsync::oneshot;
use tokio_core::reactor::{Handle, Timeout};
use tokio_service::Service;
use tokio_middleware::{Log as LogMiddleware, Timeout as TimeoutMiddleware};
use tokio_timer::Timer;

use errors::{Error, ErrorKind, KafkaCode, Result};
use protocol::{CorrelationId, ErrorCode, FetchOffset, GenerationId, Offset, PartitionId,
               RequiredAcks};
use protocol::group::{JoinGroupProtocol, SyncGroupAssignment};
use protocol::record_batch::{BatchOptions, DecodedRecord, Record, RecordBatch};
use network::{KafkaRequest, KafkaResponse, TopicPartition};
use client::{Broker, BrokerRef, ClientBuilder, ClientConfig, Cluster, KafkaService, Metadata,
             Metrics};
use client::metadata::UsableApiVersions;
use client::middleware::InFlightMiddleware;

/// A trait for communicating with the Kafka cluster.
pub trait Client<'a>: 'static {
    /// Send the given records to one topic/partition and return a future
    /// which will eventually contain the broker's per-partition result.
    fn produce_records(&self,
                       acks: RequiredAcks,
                       timeout: Duration,
                       topic_partition: TopicPartition<'a>,
                       records: Vec<Record>)
                       -> ProduceRecords {
        self.produce_batch(acks, timeout, topic_partition, records, BatchOptions::default())
    }

    /// Like `produce_records`, but with full control over the record
    /// batch's compression and idempotent-producer fields (used by
    /// `producer::Sender` for compressed and/or idempotent sends).
    fn produce_batch(&self,
                     acks: RequiredAcks,
                     timeout: Duration,
                     topic_partition: TopicPartition<'a>,
                     records: Vec<Record>,
                     batch_opts: BatchOptions)
                     -> ProduceRecords;

    /// Search the offsets by target times for the specified topics and return a future which will eventually contain the partition offset information.
    fn fetch_offsets(&self,
                     partitions: Vec<TopicPartition<'a>>,
                     offset: FetchOffset)
                     -> FetchOffsets;

    /// Load metadata of the Kafka cluster and return a future which will eventually contain the metadata information.
    fn load_metadata(&mut self) -> LoadMetadata<'a>;

    /// Discover the current coordinator of the consumer group.
    fn group_coordinator(&self, group_id: Cow<'a, str>) -> GroupCoordinator;

    /// Join the consumer group
    fn join_group(&self,
                  coordinator: BrokerRef,
                  group_id: Cow<'a, str>,
                  session_timeout: Duration,
                  rebalance_timeout: Duration,
                  member_id: Cow<'a, str>,
                  protocol_type: Cow<'a, str>,
                  group_protocols: Vec<ConsumerGroupProtocol>)
                  -> JoinGroup;

    /// Send heartbeat to the consumer group
    fn heartbeat(&self, coordinator: BrokerRef, generation: Generation) -> Heartbeat;

    /// Leave the current consumer group
    fn leave_group(&self, coordinator: BrokerRef, generation: Generation) -> LeaveGroup;

    /// Sync the current consumer group
    fn sync_group(&self,
                  coordinator: BrokerRef,
                  generation: Generation,
                  group_assignment: Option<Vec<ConsumerGroupAssignment>>)
                  -> SyncGroup;

    /// Obtain a `producerId`/`producerEpoch` pair for the idempotent
    /// producer. `transactional_id` is `None` outside transactions.
    fn init_producer_id(&self,
                        transactional_id: Option<Cow<'a, str>>,
                        transaction_timeout: Duration)
                        -> InitProducerId;

    /// Fetch records for every given partition at its starting offset,
    /// grouped onto one request per partition leader.
    fn fetch(&self,
            partitions: Vec<(TopicPartition<'a>, Offset)>,
            max_wait: Duration,
            min_bytes: i32,
            max_bytes: i32,
            isolation_level: IsolationLevel)
            -> Fetch;

    /// Commit consumed offsets for the group's current generation.
    fn commit_offsets(&self,
                      coordinator: BrokerRef,
                      generation: Generation,
                      offsets: Vec<(TopicPartition<'a>, Offset)>)
                      -> CommitOffsets;

    /// Fetch previously committed offsets. `partitions` of `None` asks
    /// for every partition the group has committed offsets for.
    fn fetch_committed_offsets(&self,
                               coordinator: BrokerRef,
                               group_id: Cow<'a, str>,
                               partitions: Option<Vec<TopicPartition<'a>>>)
                               -> FetchCommittedOffsets;
}

/// The future of a produce result: per-partition `(error_code, base_offset)`.
pub type ProduceRecords = StaticBoxFuture<Vec<(PartitionId, ErrorCode, Offset)>>;

/// The future of partition offsets information.
pub type FetchOffsets = StaticBoxFuture<HashMap<String, Vec<PartitionOffset>>>;

/// The partition and offset
#[derive(Clone, Debug)]
pub struct PartitionOffset {
    /// The partition id
    pub partition: PartitionId,
    /// The offset found in the partition
    pub offset: Offset,
}

/// The future of discover group coodinator
pub type GroupCoordinator = StaticBoxFuture<Broker>;

/// The future of `Client::init_producer_id`.
pub type InitProducerId = StaticBoxFuture<ProducerIdAndEpoch>;

/// The `producerId`/`producerEpoch` pair an idempotent producer stamps
/// onto every `RecordBatch` it sends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProducerIdAndEpoch {
    pub producer_id: i64,
    pub producer_epoch: i16,
}

/// `0` = read the log as-is; `1` = skip records from aborted
/// transactions. Mirrors `protocol::fetch::ISOLATION_READ_*`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
}

impl IsolationLevel {
    fn as_i8(&self) -> i8 {
        match *self {
            IsolationLevel::ReadUncommitted => ::protocol::fetch::ISOLATION_READ_UNCOMMITTED,
            IsolationLevel::ReadCommitted => ::protocol::fetch::ISOLATION_READ_COMMITTED,
        }
    }
}

/// The future of `Client::fetch`.
pub type Fetch = StaticBoxFuture<Vec<PartitionData>>;

/// One partition's worth of a fetch response, already decoded into
/// individual records.
#[derive(Clone, Debug)]
pub struct PartitionData {
    pub partition: TopicPartition<'static>,
    pub error_code: ErrorCode,
    pub high_watermark: Offset,
    pub log_start_offset: Offset,
    pub records: Vec<DecodedRecord>,
}

/// The future of `Client::commit_offsets`: per-partition commit result.
pub type CommitOffsets = StaticBoxFuture<Vec<(PartitionId, ErrorCode)>>;

/// The future of `Client::fetch_committed_offsets`.
pub type FetchCommittedOffsets = StaticBoxFuture<HashMap<String, Vec<CommittedOffset>>>;

/// A single committed offset, as returned by `OffsetFetch`.
#[derive(Clone, Debug)]
pub struct CommittedOffset {
    pub partition: PartitionId,
    pub offset: Offset,
    pub metadata: Option<String>,
}

/// The future of join group.
pub type JoinGroup = StaticBoxFuture<ConsumerGroup>;

pub type ConsumerGroupProtocol = JoinGroupProtocol;

/// The future of heartbeat.
pub type Heartbeat = StaticBoxFuture;

/// The consumer group
pub struct ConsumerGroup {
    /// The group id.
    pub group_id: String,

    /// The generation of the consumer group.
    pub generation_id: GenerationId,

    /// The group protocol selected by the coordinator
    pub protocol: Option<String>,

    /// The leader of the group
    pub leader_id: String,

    /// The consumer id assigned by the group coordinator.
    pub member_id: String,

    /// The members of the group
    pub members: Vec<ConsumerGroupMember>,
}

impl ConsumerGroup {
    pub fn is_leader(&self) -> bool {
        self.leader_id == self.member_id
    }

    pub fn generation(&self) -> Generation {
        Generation {
            group_id: self.group_id.clone(),
            generation_id: self.generation_id,
            member_id: self.member_id.clone(),
            protocol: self.protocol.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Generation {
    /// The group id.
    pub group_id: String,

    /// The generation of the consumer group.
    pub generation_id: GenerationId,

    /// The consumer id assigned by the group coordinator.
    pub member_id: String,

    /// The group protocol selected by the coordinator
    pub protocol: Option<String>,
}

/// The consumer group member
pub type ConsumerGroupMember = ::protocol::group::JoinGroupMember;

/// The future of leave consumer group.
pub type LeaveGroup = StaticBoxFuture<String>;

pub type ConsumerGroupAssignment = SyncGroupAssignment;

/// The future of sync consumer group.
pub type SyncGroup = StaticBoxFuture<Bytes>;

/// A Kafka client that communicate with the Kafka cluster.
#[derive(Clone)]
pub struct KafkaClient<'a> {
    inner: Rc<Inner<'a>>,
}

struct Inner<'a> {
    config: ClientConfig,
    handle: Handle,
    service: InFlightMiddleware<LogMiddleware<TimeoutMiddleware<KafkaService<'a>>>>,
    timer: Rc<Timer>,
    metrics: Option<Rc<Metrics>>,
    state: Rc<RefCell<State>>,
}

#[derive(Default)]
struct State {
    correlation_id: CorrelationId,
    metadata_status: MetadataStatus,
}

enum MetadataStatus {
    Loading(RefCell<Vec<oneshot::Sender<Rc<Metadata>>>>),
    Loaded(Rc<Metadata>),
}

impl Default for MetadataStatus {
    fn default() -> Self {
        MetadataStatus::Loading(RefCell::new(Vec::new()))
    }
}

impl<'a> Deref for KafkaClient<'a> {
    type Target = ClientConfig;

    fn deref(&self) -> &Self::Target {
        &self.inner.config
    }
}

impl<'a> KafkaClient<'a>
    where Self: 'static
{
    pub fn from_hosts<I>(hosts: I, handle: Handle) -> ClientBuilder<'a>
        where I: Iterator<Item = SocketAddr>
    {
        ClientBuilder::from_hosts(hosts, handle)
    }

    pub fn from_config(config: ClientConfig, handle: Handle) -> KafkaClient<'a> {
        trace!("create client from config: {:?}", config);

        let metrics = if config.metrics {
            Some(Rc::new(Metrics::new().expect("fail to register metrics")))
        } else {
            None
        };
        let service = InFlightMiddleware::new(
            LogMiddleware::new(
                TimeoutMiddleware::new(
                    KafkaService::new(handle.clone(),
                                      config.max_connection_idle(),
                                      metrics.clone()),
                                      config.timer(),
                                      config.request_timeout())));

        let timer = Rc::new(config.timer());
        let inner = Rc::new(Inner {
                                config: config,
                                handle: handle.clone(),
                                service: service,
                                timer: timer,
                                metrics: metrics,
                                state: Rc::new(RefCell::new(State::default())),
                            });

        let mut client = KafkaClient { inner: inner };

        client.refresh_metadata();

        client
    }

    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    pub fn timer(&self) -> Rc<Timer> {
        self.inner.timer.clone()
    }

    pub fn metrics(&self) -> Option<Rc<Metrics>> {
        self.inner.metrics.clone()
    }

    pub fn metadata(&self) -> GetMetadata {
        (*self.inner.state).borrow().metadata()
    }

    pub fn refresh_metadata(&mut self) {
        let handle = self.inner.handle.clone();

        handle.spawn(self.load_metadata()
                         .map(|metadata| {
                                  trace!("auto loaded metadata, {:?}", metadata);
                              })
                         .map_err(|err| {
                                      warn!("fail to load metadata, {}", err);
                                  }));
    }
}

impl<'a> Client<'a> for KafkaClient<'a>
    where Self: 'static
{
    fn produce_batch(&self,
                     required_acks: RequiredAcks,
                     timeout: Duration,
                     tp: TopicPartition<'a>,
                     records: Vec<Record>,
                     batch_opts: BatchOptions)
                     -> ProduceRecords {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                          inner.produce_records(metadata, required_acks, timeout, tp, records, batch_opts)
                      });
        ProduceRecords::new(future)
    }

    fn fetch_offsets(&self,
                     partitions: Vec<TopicPartition<'a>>,
                     offset: FetchOffset)
                     -> FetchOffsets {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                          let topics = inner.topics_by_broker(metadata, partitions);

                          inner.fetch_offsets(topics, offset)
                      });
        FetchOffsets::new(future)
    }

    fn load_metadata(&mut self) -> LoadMetadata<'a> {
        if self.inner.config.metadata_max_age_millis > 0 {
            let handle = self.inner.handle.clone();

            let timeout = Timeout::new(self.inner.config.metadata_max_age(), &handle);

            match timeout {
                Ok(timeout) => {
                    let inner = self.inner.clone();
                    let future = timeout
                        .map_err(Error::from)
                        .and_then(move |_| LoadMetadata::new(inner.clone()))
                        .map(|_| ())
                        .map_err(|_| ());

                    handle.spawn(future);
                }
                Err(err) => {
                    warn!("fail to create timeout, {}", err);
                }
            }
        }

        LoadMetadata::new(self.inner.clone())
    }

    fn group_coordinator(&self, group_id: Cow<'a, str>) -> GroupCoordinator {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| inner.group_coordinator(metadata, group_id));
        GroupCoordinator::new(future)
    }

    fn join_group(&self,
                  coordinator: BrokerRef,
                  group_id: Cow<'a, str>,
                  session_timeout: Duration,
                  rebalance_timeout: Duration,
                  member_id: Cow<'a, str>,
                  protocol_type: Cow<'a, str>,
                  group_protocols: Vec<ConsumerGroupProtocol>)
                  -> JoinGroup {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                metadata
                    .find_broker(coordinator)
                    .map(move |coordinator| {
                        inner.join_group(coordinator,
                                         group_id,
                                         session_timeout,
                                         rebalance_timeout,
                                         member_id,
                                         protocol_type,
                                         group_protocols)
                    })
                    .unwrap_or_else(|| ErrorKind::BrokerNotFound(coordinator.0).into())
            });
        JoinGroup::new(future)
    }

    fn heartbeat(&self, coordinator: BrokerRef, generation: Generation) -> Heartbeat {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                metadata
                    .find_broker(coordinator)
                    .map(move |coordinator| {
                             inner.heartbeat(coordinator,
                                             generation.group_id.into(),
                                             generation.generation_id,
                                             generation.member_id.into())
                         })
                    .unwrap_or_else(|| ErrorKind::BrokerNotFound(coordinator.0).into())
            });
        Heartbeat::new(future)
    }

    fn leave_group(&self, coordinator: BrokerRef, generation: Generation) -> LeaveGroup {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                metadata
                    .find_broker(coordinator)
                    .map(move |coordinator| {
                             inner.leave_group(coordinator,
                                               generation.group_id.into(),
                                               generation.member_id.into())
                         })
                    .unwrap_or_else(|| ErrorKind::BrokerNotFound(coordinator.0).into())
            });
        LeaveGroup::new(future)
    }

    fn sync_group(&self,
                  coordinator: BrokerRef,
                  generation: Generation,
                  group_assignment: Option<Vec<ConsumerGroupAssignment>>)
                  -> SyncGroup {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                metadata
                    .find_broker(coordinator)
                    .map(move |coordinator| {
                             inner.sync_group(coordinator,
                                              generation.group_id.into(),
                                              generation.generation_id,
                                              generation.member_id.into(),
                                              generation.protocol.clone(),
                                              group_assignment)
                         })
                    .unwrap_or_else(|| ErrorKind::BrokerNotFound(coordinator.0).into())
            });
        SyncGroup::new(future)
    }

    fn init_producer_id(&self,
                        transactional_id: Option<Cow<'a, str>>,
                        transaction_timeout: Duration)
                        -> InitProducerId {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                          inner.init_producer_id(metadata, transactional_id, transaction_timeout)
                      });
        InitProducerId::new(future)
    }

    fn fetch(&self,
            partitions: Vec<(TopicPartition<'a>, Offset)>,
            max_wait: Duration,
            min_bytes: i32,
            max_bytes: i32,
            isolation_level: IsolationLevel)
            -> Fetch {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                let by_broker = inner.fetch_topics_by_broker(&metadata, partitions);
                inner.fetch(by_broker, max_wait, min_bytes, max_bytes, isolation_level)
            });
        Fetch::new(future)
    }

    fn commit_offsets(&self,
                      coordinator: BrokerRef,
                      generation: Generation,
                      offsets: Vec<(TopicPartition<'a>, Offset)>)
                      -> CommitOffsets {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                metadata
                    .find_broker(coordinator)
                    .map(move |coordinator| inner.commit_offsets(coordinator, generation, offsets))
                    .unwrap_or_else(|| ErrorKind::BrokerNotFound(coordinator.0).into())
            });
        CommitOffsets::new(future)
    }

    fn fetch_committed_offsets(&self,
                               coordinator: BrokerRef,
                               group_id: Cow<'a, str>,
                               partitions: Option<Vec<TopicPartition<'a>>>)
                               -> FetchCommittedOffsets {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                metadata
                    .find_broker(coordinator)
                    .map(move |coordinator| {
                             inner.fetch_committed_offsets(coordinator, group_id, partitions)
                         })
                    .unwrap_or_else(|| ErrorKind::BrokerNotFound(coordinator.0).into())
            });
        FetchCommittedOffsets::new(future)
    }
}

impl<'a> Inner<'a>
    where Self: 'static
{
    fn next_correlation_id(&self) -> CorrelationId {
        (*self.state).borrow_mut().next_correlation_id()
    }

    fn client_id(&self) -> Option<Cow<'a, str>> {
        self.config.client_id.clone().map(Cow::from)
    }

    pub fn metadata(&self) -> GetMetadata {
        (*self.state).borrow().metadata()
    }

    /// Choose the node with the fewest outstanding requests which is at least eligible for connection.
    pub fn least_loaded_broker(&self, metadata: Rc<Metadata>) -> Result<(SocketAddr, BrokerRef)> {
        let mut brokers = metadata.brokers().to_vec();

        rand::thread_rng().shuffle(&mut brokers);

        let mut in_flight_requests = usize::max_value();
        let mut found = None;

        for broker in brokers {
            for addr in broker.addr().to_socket_addrs()? {
                match self.service.in_flight_requests(&addr) {
                    Some(0) => {
                        trace!("found least loaded broker #{} @ {} without in flight requests",
                               broker.id(),
                               addr);

                        return Ok((addr, broker.as_ref()));
                    }
                    Some(n) if n < in_flight_requests => {
                        in_flight_requests = n;
                        found = Some((addr, broker.as_ref()));
                    }
                    _ => {}
                }
            }
        }

        found
            .map(|(addr, broker)| {
                     trace!("found least loaded broker #{} @ {} with {} in flight requests",
                            broker.index(),
                            addr,
                            self.service.in_flight_requests(&addr).unwrap_or_default());

                     (addr, broker)
                 })
            .or_else(|| {
                metadata
                    .brokers()
                    .first()
                    .map(|broker| {
                        let addr = broker.addr().to_socket_addrs().unwrap().next().unwrap();

                        trace!("not found any alive broker, use a random broker # {} @ {}",
                               broker.id(),
                               addr);

                        (addr, broker.as_ref())
                    })
            })
            .ok_or_else(|| {
                            warn!("not found any broker");

                            ErrorKind::KafkaError(KafkaCode::BrokerNotAvailable).into()
                        })
    }

    fn fetch_metadata<S>(&self, topic_names: &[S]) -> FetchMetadata
        where S: AsRef<str> + Debug
    {
        debug!("fetch metadata for topics: {:?}", topic_names);

        let topics = if topic_names.is_empty() {
            None
        } else {
            Some(topic_names.iter().map(|s| s.as_ref().to_owned()).collect())
        };

        let responses = {
            let mut responses = Vec::new();

            for addr in &self.config.hosts {
                let request = KafkaRequest::metadata(self.next_correlation_id(),
                                                     self.client_id(),
                                                     topics.clone(),
                                                     true);

                let response = self.service
                    .call((*addr, request))
                    .and_then(|res| if let KafkaResponse::Metadata(res) = res {
                                  future::ok(Rc::new(Metadata::from(res)))
                              } else {
                                  future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                              });

                responses.push(response);
            }

            responses
        };

        FetchMetadata::new(future::select_ok(responses).map(|(metadata, _)| metadata))
    }

    fn fetch_api_versions(&self, broker: &Broker) -> FetchApiVersions {
        debug!("fetch API versions for broker: {:?}", broker);

        let addr = broker.addr().to_socket_addrs().unwrap().next().unwrap();

        let request = KafkaRequest::api_versions(self.next_correlation_id(), self.client_id());

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::ApiVersions(res) = res {
                          future::ok(UsableApiVersions::new(res.api_versions))
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        FetchApiVersions::new(response)
    }

    fn load_api_versions(&self, metadata: Rc<Metadata>) -> LoadApiVersions {
        trace!("load API versions from brokers, {:?}", metadata.brokers());

        let responses = {
            let mut responses = Vec::new();

            for broker in metadata.brokers() {
                let broker_ref = broker.as_ref();
                let response = self.fetch_api_versions(broker)
                    .map(move |api_versions| (broker_ref, api_versions));

                responses.push(response);
            }

            responses
        };
        let responses = future::join_all(responses).map(HashMap::from_iter);

        LoadApiVersions::new(StaticBoxFuture::new(responses))
    }

    fn init_producer_id(&self,
                        metadata: Rc<Metadata>,
                        transactional_id: Option<Cow<'a, str>>,
                        transaction_timeout: Duration)
                        -> InitProducerId {
        let addr = {
            match self.least_loaded_broker(metadata) {
                Ok((addr, _)) => addr,
                Err(err) => return InitProducerId::err(err),
            }
        };

        let request = KafkaRequest::init_producer_id(self.next_correlation_id(),
                                                     self.client_id(),
                                                     transactional_id.map(Cow::into_owned),
                                                     transaction_timeout);

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::InitProducerId(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(ProducerIdAndEpoch {
                                             producer_id: res.producer_id,
                                             producer_epoch: res.producer_epoch,
                                         })
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        InitProducerId::new(response)
    }

    fn produce_records(&self,
                       metadata: Rc<Metadata>,
                       required_acks: RequiredAcks,
                       timeout: Duration,
                       tp: TopicPartition<'a>,
                       records: Vec<Record>,
                       batch_opts: BatchOptions)
                       -> ProduceRecords {
        let addr = metadata
            .leader_for(&tp)
            .and_then(|broker| broker.addr().to_socket_addrs().ok()?.next())
            .unwrap_or_else(|| *self.config.hosts.iter().next().unwrap());

        let request = match KafkaRequest::produce_records(self.next_correlation_id(),
                                                          self.client_id(),
                                                          required_acks,
                                                          timeout,
                                                          tp.topic_name.into_owned(),
                                                          tp.partition,
                                                          &records,
                                                          &batch_opts) {
            Ok(request) => request,
            Err(err) => return ProduceRecords::err(err),
        };

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::Produce(res) = res {
                          let produce = res.topics
                              .into_iter()
                              .flat_map(|topic| topic.partitions)
                              .map(|partition| {
                                  (partition.partition, partition.error_code, partition.base_offset)
                              })
                              .collect();

                          future::ok(produce)
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        ProduceRecords::new(response)
    }

    fn topics_by_broker(&self,
                        metadata: Rc<Metadata>,
                        topic_partitions: Vec<TopicPartition<'a>>)
                        -> Topics {
        let mut topics = HashMap::new();

        for topic_partition in topic_partitions {
            if let Some(broker) = metadata.leader_for(&topic_partition) {
                if let Ok(mut addrs) = broker.addr().to_socket_addrs() {
                    if let Some(addr) = addrs.next() {
                        topics
                            .entry(addr)
                            .or_insert_with(HashMap::new)
                            .entry(topic_partition.topic_name.into_owned())
                            .or_insert_with(Vec::new)
                            .push(topic_partition.partition);
                    }
                }
            }
        }

        topics
    }

    fn fetch_offsets(&self, topics: Topics, offset: FetchOffset) -> FetchOffsets {
        let timestamp = offset.to_timestamp();
        let responses = {
            let mut responses = Vec::new();

            for (addr, topics) in topics {
                let request = KafkaRequest::list_offsets(self.next_correlation_id(),
                                                         self.client_id(),
                                                         timestamp,
                                                         topics);
                let response = self.service
                    .call((addr, request))
                    .and_then(|res| {
                        if let KafkaResponse::ListOffsets(res) = res {
                            let topics = res.topics
                                .into_iter()
                                .map(|topic| {
                                    let partitions = topic
                                        .partitions
                                        .into_iter()
                                        .flat_map(|partition| {
                                            if partition.error_code == KafkaCode::None as ErrorCode {
                                                Ok(PartitionOffset {
                                                       partition: partition.partition,
                                                       offset: partition.offset,
                                                   })
                                            } else {
                                                Err(ErrorKind::KafkaError(partition.error_code.into()))
                                            }
                                        })
                                        .collect();

                                    (topic.topic, partitions)
                                })
                                .collect::<Vec<(String, Vec<PartitionOffset>)>>();

                            Ok(topics)
                        } else {
                            bail!(ErrorKind::UnexpectedResponse(res.api_key() as i16))
                        }
                    });

                responses.push(response);
            }

            responses
        };

        let offsets = future::join_all(responses).map(|responses| {
            responses
                .into_iter()
                .fold(HashMap::new(), |mut offsets, topics| {
                    for (topic_name, partitions) in topics {
                        offsets
                            .entry(topic_name)
                            .or_insert_with(Vec::new)
                            .extend(partitions)
                    }
                    offsets
                })
        });

        FetchOffsets::new(offsets)
    }

    fn group_coordinator(&self,
                         metadata: Rc<Metadata>,
                         group_id: Cow<'a, str>)
                         -> GroupCoordinator {
        debug!("disover group coordinator of group `{}`", group_id);

        let addr = {
            match self.least_loaded_broker(metadata) {
                Ok((addr, _)) => addr,
                Err(err) => {
                    return GroupCoordinator::err(err);
                }
            }
        };

        let request = KafkaRequest::find_coordinator(self.next_correlation_id(),
                                                      self.client_id(),
                                                      group_id.into_owned());

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::FindCoordinator(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(Broker::new(res.node_id, res.host, res.port as u16))
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        GroupCoordinator::new(response)
    }

    fn join_group(&self,
                  coordinator: &Broker,
                  group_id: Cow<'a, str>,
                  session_timeout: Duration,
                  rebalance_timeout: Duration,
                  member_id: Cow<'a, str>,
                  protocol_type: Cow<'a, str>,
                  group_protocols: Vec<ConsumerGroupProtocol>)
                  -> JoinGroup {
        debug!("member `{}` join group `{}`", member_id, group_id);

        let addr = coordinator
            .addr()
            .to_socket_addrs()
            .unwrap()
            .next()
            .unwrap();

        let joined_group_id: String = group_id.clone().into_owned();

        let request = KafkaRequest::join_group(self.next_correlation_id(),
                                               self.client_id(),
                                               group_id.into_owned(),
                                               session_timeout,
                                               rebalance_timeout,
                                               member_id.into_owned(),
                                               protocol_type.into_owned(),
                                               group_protocols);

        let response = self.service
            .call((addr, request))
            .and_then(move |res| if let KafkaResponse::JoinGroup(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(ConsumerGroup {
                                             group_id: joined_group_id,
                                             generation_id: res.generation_id,
                                             protocol: res.protocol_name,
                                             leader_id: res.leader,
                                             member_id: res.member_id,
                                             members: res.members,
                                         })
                          } else if res.error_code == KafkaCode::MemberIdRequired as ErrorCode {
                              future::err(ErrorKind::MemberIdRequired(res.member_id).into())
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        JoinGroup::new(response)
    }

    fn heartbeat(&self,
                 coordinator: &Broker,
                 group_id: Cow<'a, str>,
                 group_generation_id: GenerationId,
                 member_id: Cow<'a, str>)
                 -> Heartbeat {
        debug!("member `{}` send heartbeat to group `{}`",
               member_id,
               group_id);

        let addr = coordinator
            .addr()
            .to_socket_addrs()
            .unwrap()
            .next()
            .unwrap();

        let request = KafkaRequest::heartbeat(self.next_correlation_id(),
                                              self.client_id(),
                                              group_id.into_owned(),
                                              group_generation_id,
                                              member_id.into_owned());

        let response = self.service
            .call((addr, request))
            .and_then(move |res| if let KafkaResponse::Heartbeat(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(())
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        Heartbeat::new(response)
    }

    fn leave_group(&self,
                   coordinator: &Broker,
                   group_id: Cow<'a, str>,
                   member_id: Cow<'a, str>)
                   -> LeaveGroup {
        debug!("member `{}` leave group `{}`", member_id, group_id);

        let addr = coordinator
            .addr()
            .to_socket_addrs()
            .unwrap()
            .next()
            .unwrap();

        let leaved_group_id: String = group_id.clone().into_owned();

        let request = KafkaRequest::leave_group(self.next_correlation_id(),
                                                self.client_id(),
                                                group_id.into_owned(),
                                                member_id.into_owned());

        let response = self.service
            .call((addr, request))
            .and_then(move |res| if let KafkaResponse::LeaveGroup(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(leaved_group_id)
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        LeaveGroup::new(response)
    }

    fn sync_group(&self,
                  coordinator: &Broker,
                  group_id: Cow<'a, str>,
                  group_generation_id: GenerationId,
                  member_id: Cow<'a, str>,
                  protocol_name: Option<String>,
                  group_assignment: Option<Vec<ConsumerGroupAssignment>>)
                  -> SyncGroup {
        debug!("sync group `{}` # {} with member `{}`",
               group_id,
               group_generation_id,
               member_id);

        let addr = coordinator
            .addr()
            .to_socket_addrs()
            .unwrap()
            .next()
            .unwrap();

        let request = KafkaRequest::sync_group(self.next_correlation_id(),
                                               self.client_id(),
                                               group_id.into_owned(),
                                               group_generation_id,
                                               member_id.into_owned(),
                                               None,
                                               protocol_name,
                                               group_assignment.unwrap_or_default());

        let response = self.service
            .call((addr, request))
            .and_then(move |res| if let KafkaResponse::SyncGroup(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(Bytes::from(res.assignment))
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        SyncGroup::new(response)
    }

    /// Groups `(topic_partition, fetch_offset)` pairs by the socket
    /// address of their current leader, dropping partitions whose
    /// leader isn't known yet (the next metadata refresh will pick
    /// them back up).
    fn fetch_topics_by_broker(&self,
                              metadata: &Metadata,
                              partitions: Vec<(TopicPartition<'a>, Offset)>)
                              -> HashMap<SocketAddr, HashMap<String, Vec<(PartitionId, Offset)>>> {
        let mut by_broker = HashMap::new();

        for (tp, offset) in partitions {
            if let Some(broker) = metadata.leader_for(&tp) {
                if let Ok(mut addrs) = broker.addr().to_socket_addrs() {
                    if let Some(addr) = addrs.next() {
                        by_broker
                            .entry(addr)
                            .or_insert_with(HashMap::new)
                            .entry(tp.topic_name.into_owned())
                            .or_insert_with(Vec::new)
                            .push((tp.partition, offset));
                    }
                }
            }
        }

        by_broker
    }

    fn fetch(&self,
            by_broker: HashMap<SocketAddr, HashMap<String, Vec<(PartitionId, Offset)>>>,
            max_wait: Duration,
            min_bytes: i32,
            max_bytes: i32,
            isolation_level: IsolationLevel)
            -> Fetch {
        let mut responses = Vec::new();

        for (addr, topics) in by_broker {
            let request = KafkaRequest::fetch(self.next_correlation_id(),
                                              self.client_id(),
                                              max_wait,
                                              min_bytes,
                                              max_bytes,
                                              isolation_level.as_i8(),
                                              topics);

            let response = self.service
                .call((addr, request))
                .and_then(|res| if let KafkaResponse::Fetch(res) = res {
                              let partitions = res.topics
                                  .into_iter()
                                  .flat_map(|topic| {
                                      let topic_name = topic.topic;
                                      topic.partitions.into_iter().map(move |partition| {
                                          parse_partition_data(&topic_name, partition)
                                      })
                                  })
                                  .collect::<Result<Vec<_>>>();

                              partitions.into_future()
                          } else {
                              future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                          });

            responses.push(response);
        }

        let partitions = future::join_all(responses)
            .map(|responses| responses.into_iter().flat_map(|r| r).collect());

        Fetch::new(partitions)
    }

    fn commit_offsets(&self,
                      coordinator: &Broker,
                      generation: Generation,
                      offsets: Vec<(TopicPartition<'a>, Offset)>)
                      -> CommitOffsets {
        let addr = coordinator
            .addr()
            .to_socket_addrs()
            .unwrap()
            .next()
            .unwrap();

        let mut topics = HashMap::new();
        for (tp, offset) in offsets {
            topics
                .entry(tp.topic_name.into_owned())
                .or_insert_with(Vec::new)
                .push((tp.partition, offset));
        }

        let request = KafkaRequest::offset_commit(self.next_correlation_id(),
                                                  self.client_id(),
                                                  generation.group_id,
                                                  generation.generation_id,
                                                  generation.member_id,
                                                  topics);

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::OffsetCommit(res) = res {
                          let results = res.topics
                              .into_iter()
                              .flat_map(|topic| topic.partitions)
                              .map(|partition| (partition.partition, partition.error_code))
                              .collect();

                          future::ok(results)
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16).into())
                      });

        CommitOffsets::new(response)
    }

    fn fetch_committed_offsets(&self,
                               coordinator: &Broker,
                               group_id: Cow<'a, str>,
                               partitions: Option<Vec<TopicPartition<'a>>>)
                               -> FetchCommittedOffsets {
        let addr = coordinator
            .addr()
            .to_socket_addrs()
            .unwrap()
            .next()
            .unwrap();

        let topics = partitions.map(|partitions| {
            let mut topics: HashMap<String, Vec<PartitionId>> = HashMap::new();
            for tp in partitions {
                topics
                    .entry(tp.topic_name.into_owned())
                    .or_insert_with(Vec::new)
                    .push(tp.partition);
            }
            topics
        });

        let request = KafkaRequest::offset_fetch(self.next_correlation_id(),
                                                 self.client_id(),
                                                 group_id.into_owned(),
                                                 topics);

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::OffsetFetch(res) = res {
                          if res.error_code != KafkaCode::None as ErrorCode {
                              return future::Either::A(future::err(ErrorKind::KafkaError(res.error_code.into())
                                                                        .into()));
                          }

                          let offsets = res.topics
                              .into_iter()
                              .map(|topic| {
                                  let partitions = topic
                                      .partitions
                                      .into_iter()
                                      .map(|partition| {
                                          CommittedOffset {
                                              partition: partition.partition,
                                              offset: partition.committed_offset,
                                              metadata: partition.metadata,
                                          }
                                      })
                                      .collect();

                                  (topic.topic, partitions)
                              })
                              .collect();

                          future::Either::B(future::ok(offsets))
                      } else {
                          future::Either::A(future::err(ErrorKind::UnexpectedResponse(res.api_key() as i16)
                                                             .into()))
                      });

        FetchCommittedOffsets::new(response)
    }
}

fn parse_partition_data(topic_name: &str, partition: ::protocol::fetch::FetchPartitionData) -> Result<PartitionData> {
    let mut records = Vec::new();

    if let Some(bytes) = partition.records {
        let mut input: &[u8] = &bytes;
        while !input.is_empty() {
            let (batch, rest) = RecordBatch::parse(input)?;
            records.extend(batch.records);
            input = rest;
        }
    }

    Ok(PartitionData {
        partition: TopicPartition::new(topic_name.to_owned(), partition.partition),
        error_code: partition.error_code,
        high_watermark: partition.high_watermark,
        log_start_offset: partition.log_start_offset,
        records,
    })
}

type Topics = HashMap<SocketAddr, HashMap<String, Vec<PartitionId>>>;

impl State {
    pub fn next_correlation_id(&mut self) -> CorrelationId {
        self.correlation_id = self.correlation_id.wrapping_add(1);
        self.correlation_id - 1
    }

    pub fn metadata(&self) -> GetMetadata {
        let (sender, receiver) = oneshot::channel();

        match self.metadata_status {
            MetadataStatus::Loading(ref senders) => senders.borrow_mut().push(sender),
            MetadataStatus::Loaded(ref metadata) => drop(sender.send(metadata.clone())),
        }

        GetMetadata::new(receiver.map_err(|_| ErrorKind::Canceled("load metadata canceled").into()))
    }

    pub fn refresh_metadata(&mut self) {
        if let MetadataStatus::Loaded(_) = self.metadata_status {
            self.metadata_status = MetadataStatus::Loading(Default::default());
        }
    }

    pub fn update_metadata(&mut self, metadata: Rc<Metadata>) {
        let status = mem::replace(&mut self.metadata_status,
                                  MetadataStatus::Loaded(metadata.clone()));

        if let MetadataStatus::Loading(senders) = status {
            for sender in senders.into_inner() {
                drop(sender.send(metadata.clone()));
            }
        }
    }
}

/// The future of loaded metadata
pub struct LoadMetadata<'a> {
    state: Loading,
    inner: Rc<Inner<'a>>,
}

pub enum Loading {
    Metadata(FetchMetadata),
    ApiVersions(Rc<Metadata>, LoadApiVersions),
    Finished(Rc<Metadata>),
}

impl<'a> LoadMetadata<'a>
    where Self: 'static
{
    fn new(inner: Rc<Inner<'a>>) -> LoadMetadata<'a> {
        let fetch_metadata = inner.fetch_metadata::<&str>(&[]);

        (*inner.state).borrow_mut().refresh_metadata();

        LoadMetadata {
            state: Loading::Metadata(fetch_metadata),
            inner: inner,
        }
    }
}

impl<'a> Future for LoadMetadata<'a>
    where Self: 'static
{
    type Item = Rc<Metadata>;
    type Error = Error;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        loop {
            let state;

            match self.state {
                Loading::Metadata(ref mut future) => {
                    match future.poll() {
                        Ok(Async::Ready(metadata)) => {
                            let inner = self.inner.clone();

                            if inner.config.api_version_request {
                                state = Loading::ApiVersions(metadata.clone(),
                                                             inner.load_api_versions(metadata));
                            } else {
                                let fallback_api_versions =
                                    inner.config.broker_version_fallback.api_versions();

                                let metadata = Rc::new(metadata.with_fallback_api_versions(fallback_api_versions.clone()));

                                trace!("use fallback API versions from {:?}, {:?}",
                                       inner.config.broker_version_fallback,
                                       fallback_api_versions);

                                state = Loading::Finished(metadata);
                            }
                        }
                        Ok(Async::NotReady) => return Ok(Async::NotReady),
                        Err(err) => return Err(err),
                    }
                }
                Loading::ApiVersions(ref metadata, ref mut future) => {
                    match future.poll() {
                        Ok(Async::Ready(api_versions)) => {
                            let metadata = Rc::new(metadata.with_api_versions(api_versions));

                            state = Loading::Finished(metadata);
                        }
                        Ok(Async::NotReady) => return Ok(Async::NotReady),
                        Err(err) => return Err(err),
                    }
                }
                Loading::Finished(ref metadata) => {
                    (*self.inner.state)
                        .borrow_mut()
                        .update_metadata(metadata.clone());

                    return Ok(Async::Ready(metadata.clone()));
                }
            }

            self.state = state;
        }
    }
}

pub struct StaticBoxFuture<T = (), E = Error>(Box<Future<Item = T, Error = E> + 'static>)
    where T: 'static,
          E: 'static;

impl<T, E> StaticBoxFuture<T, E> {
    pub fn new<F>(inner: F) -> Self
        where F: IntoFuture<Item = T, Error = E> + 'static,
              T: 'static,
              E: 'static
    {
        StaticBoxFuture(Box::new(inner.into_future()))
    }

    pub fn ok(item: T) -> Self {
        StaticBoxFuture(Box::new(future::ok(item)))
    }

    pub fn err(err: E) -> Self {
        StaticBoxFuture(Box::new(future::err(err)))
    }
}

impl<T, E> From<ErrorKind> for StaticBoxFuture<T, E>
    where E: From<ErrorKind>
{
    fn from(err: ErrorKind) -> Self {
        Self::err(err.into())
    }
}

impl<T, E> Future for StaticBoxFuture<T, E> {
    type Item = T;
    type Error = E;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        self.0.poll()
    }
}

/// Lets call sites finish a plain `Result`/`Future` with `.static_boxed()`
/// instead of threading `StaticBoxFuture::new` through every branch -
/// what `client::middleware::InFlightMiddleware::call` does to its
/// upstream's future.
pub trait ToStaticBoxFuture<T, E> {
    fn static_boxed(self) -> StaticBoxFuture<T, E>;
}

impl<F, T, E> ToStaticBoxFuture<T, E> for F
    where F: IntoFuture<Item = T, Error = E> + 'static,
          T: 'static,
          E: 'static
{
    fn static_boxed(self) -> StaticBoxFuture<T, E> {
        StaticBoxFuture::new(self)
    }
}

pub type GetMetadata = StaticBoxFuture<Rc<Metadata>>;
pub type FetchMetadata = StaticBoxFuture<Rc<Metadata>>;
pub type FetchApiVersions = StaticBoxFuture<UsableApiVersions>;
pub type LoadApiVersions = StaticBoxFuture<HashMap<BrokerRef, UsableApiVersions>>;
