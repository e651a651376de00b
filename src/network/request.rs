//! `KafkaRequest` wraps a per-API `protocol` struct with the one thing
//! every caller needs from it regardless of shape: a frame-ready encode
//! and the `ApiKeys`/`ApiVersion` it was built for, so the connection
//! layer can route the matching response decoder (`network::response`).
//! Matches `client.rs`'s call sites (`KafkaRequest::fetch_metadata`,
//! `::produce_records`, `::list_offsets`, ...), built against the
//! flexible/compact protocol structs instead of `MessageSet`-based ones.

use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;

use bytes::{BigEndian, BytesMut};

use errors::Result;
use protocol::record_batch::{BatchOptions, Record, RecordBatch};
use protocol::{admin, api_versions, fetch, group, init_producer_id, list_offsets, metadata,
              offset_commit, produce, sasl, ApiKeys, ApiVersion, CorrelationId, Encodable,
              GenerationId, PartitionId, RequestHeader, RequiredAcks};

/// Most calls this crate issues are flexible (compact) versions; the two
/// exceptions (`SaslHandshake` legacy v1, and `ApiVersions`' own request
/// body which stays fixed-width aside from its trailing tagged fields)
/// set `flexible` explicitly at their construction site below.
fn header<'a>(api_key: ApiKeys, api_version: ApiVersion, correlation_id: CorrelationId,
              client_id: Option<Cow<'a, str>>, flexible: bool)
              -> RequestHeader<'a> {
    RequestHeader {
        api_key: api_key as i16,
        api_version,
        correlation_id,
        client_id,
        flexible,
    }
}

#[derive(Debug)]
pub enum KafkaRequest<'a> {
    Metadata(metadata::MetadataRequest<'a>),
    Produce(produce::ProduceRequest<'a>),
    Fetch(fetch::FetchRequest<'a>),
    ListOffsets(list_offsets::ListOffsetsRequest<'a>),
    FindCoordinator(group::FindCoordinatorRequest<'a>),
    JoinGroup(group::JoinGroupRequest<'a>),
    SyncGroup(group::SyncGroupRequest<'a>),
    Heartbeat(group::HeartbeatRequest<'a>),
    LeaveGroup(group::LeaveGroupRequest<'a>),
    OffsetCommit(offset_commit::OffsetCommitRequest<'a>),
    OffsetFetch(offset_commit::OffsetFetchRequest<'a>),
    InitProducerId(init_producer_id::InitProducerIdRequest<'a>),
    SaslHandshake(sasl::SaslHandshakeRequest<'a>),
    SaslAuthenticate(sasl::SaslAuthenticateRequest<'a>),
    ApiVersions(api_versions::ApiVersionsRequest<'a>),
    Admin(admin::AdminRequest<'a>),
}

impl<'a> KafkaRequest<'a> {
    pub fn api_key(&self) -> ApiKeys {
        match *self {
            KafkaRequest::Admin(ref req) => {
                ApiKeys::from_code(req.header.api_key).unwrap_or(ApiKeys::CreateTopics)
            }
            KafkaRequest::Metadata(_) => ApiKeys::Metadata,
            KafkaRequest::Produce(_) => ApiKeys::Produce,
            KafkaRequest::Fetch(_) => ApiKeys::Fetch,
            KafkaRequest::ListOffsets(_) => ApiKeys::ListOffsets,
            KafkaRequest::FindCoordinator(_) => ApiKeys::FindCoordinator,
            KafkaRequest::JoinGroup(_) => ApiKeys::JoinGroup,
            KafkaRequest::SyncGroup(_) => ApiKeys::SyncGroup,
            KafkaRequest::Heartbeat(_) => ApiKeys::Heartbeat,
            KafkaRequest::LeaveGroup(_) => ApiKeys::LeaveGroup,
            KafkaRequest::OffsetCommit(_) => ApiKeys::OffsetCommit,
            KafkaRequest::OffsetFetch(_) => ApiKeys::OffsetFetch,
            KafkaRequest::InitProducerId(_) => ApiKeys::InitProducerId,
            KafkaRequest::SaslHandshake(_) => ApiKeys::SaslHandshake,
            KafkaRequest::SaslAuthenticate(_) => ApiKeys::SaslAuthenticate,
            KafkaRequest::ApiVersions(_) => ApiKeys::ApiVersions,
        }
    }

    /// Encodes the request body and prefixes it with the `i32` frame
    /// length the wire protocol and `network::codec::KafkaCodec` expect.
    pub fn into_frame(self) -> Result<BytesMut> {
        let mut body = BytesMut::with_capacity(256);

        match self {
            KafkaRequest::Metadata(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::Produce(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::Fetch(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::ListOffsets(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::FindCoordinator(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::JoinGroup(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::SyncGroup(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::Heartbeat(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::LeaveGroup(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::OffsetCommit(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::OffsetFetch(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::InitProducerId(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::SaslHandshake(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::SaslAuthenticate(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::ApiVersions(req) => req.encode::<BigEndian>(&mut body)?,
            KafkaRequest::Admin(req) => req.encode::<BigEndian>(&mut body)?,
        }

        Ok(body)
    }

    pub fn metadata(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                    topics: Option<Vec<String>>, allow_auto_topic_creation: bool)
                    -> Self {
        KafkaRequest::Metadata(metadata::MetadataRequest {
            header: header(ApiKeys::Metadata, 12, correlation_id, client_id, true),
            topics,
            allow_auto_topic_creation,
        })
    }

    pub fn api_versions(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>) -> Self {
        KafkaRequest::ApiVersions(api_versions::ApiVersionsRequest {
            header: header(ApiKeys::ApiVersions, 3, correlation_id, client_id, true),
            client_software_name: "tokio-kafka".to_owned(),
            client_software_version: env!("CARGO_PKG_VERSION").to_owned(),
        })
    }

    pub fn find_coordinator(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                            group_id: String)
                            -> Self {
        KafkaRequest::FindCoordinator(group::FindCoordinatorRequest {
            header: header(ApiKeys::FindCoordinator, 4, correlation_id, client_id, true),
            key: group_id,
            key_type: group::COORDINATOR_KEY_GROUP,
        })
    }

    /// Builds a single-topic, single-partition produce request from
    /// already-assembled `Record`s, compressing/batching them with
    /// `RecordBatch::build` before handing the bytes to the wire
    /// struct. `batch_opts` carries compression and, for the idempotent
    /// producer, the `producerId`/`producerEpoch`/`baseSequence` triple.
    pub fn produce_records(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                           acks: RequiredAcks, timeout: Duration, topic: String,
                           partition: PartitionId, records: &[Record], batch_opts: &BatchOptions)
                           -> Result<Self> {
        let record_batch = RecordBatch::build(records, batch_opts)?;

        Ok(KafkaRequest::Produce(produce::ProduceRequest::new(
            header(ApiKeys::Produce, 9, correlation_id, client_id, true),
            None,
            acks as i16,
            timeout.as_secs() as i32 * 1000 + timeout.subsec_millis() as i32,
            vec![
                produce::ProduceTopicData {
                    topic,
                    partitions: vec![
                        produce::ProducePartitionData {
                            partition,
                            record_batch: record_batch.to_vec(),
                        },
                    ],
                },
            ],
            true,
        )))
    }

    /// `topics` maps topic name to the partitions to resolve, all at the
    /// same `timestamp` (`list_offsets::LATEST_TIMESTAMP` /
    /// `EARLIEST_TIMESTAMP`, or an actual ms-since-epoch value).
    pub fn list_offsets(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                        timestamp: i64, topics: HashMap<String, Vec<PartitionId>>)
                        -> Self {
        let topics = topics
            .into_iter()
            .map(|(topic, partitions)| {
                list_offsets::ListOffsetsTopic {
                    topic,
                    partitions: partitions
                        .into_iter()
                        .map(|partition| {
                            list_offsets::ListOffsetsPartition {
                                partition,
                                current_leader_epoch: -1,
                                timestamp,
                            }
                        })
                        .collect(),
                }
            })
            .collect();

        KafkaRequest::ListOffsets(list_offsets::ListOffsetsRequest {
            header: header(ApiKeys::ListOffsets, 6, correlation_id, client_id, true),
            replica_id: -1,
            isolation_level: 0,
            topics,
        })
    }

    pub fn join_group(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                      group_id: String, session_timeout: Duration, rebalance_timeout: Duration,
                      member_id: String, protocol_type: String,
                      protocols: Vec<group::JoinGroupProtocol>)
                      -> Self {
        KafkaRequest::JoinGroup(group::JoinGroupRequest {
            header: header(ApiKeys::JoinGroup, 9, correlation_id, client_id, true),
            group_id,
            session_timeout_ms: session_timeout.as_secs() as i32 * 1000
                + session_timeout.subsec_millis() as i32,
            rebalance_timeout_ms: rebalance_timeout.as_secs() as i32 * 1000
                + rebalance_timeout.subsec_millis() as i32,
            member_id,
            group_instance_id: None,
            protocol_type,
            protocols,
        })
    }

    pub fn sync_group(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                      group_id: String, generation_id: GenerationId, member_id: String,
                      protocol_type: Option<String>, protocol_name: Option<String>,
                      assignments: Vec<group::SyncGroupAssignment>)
                      -> Self {
        KafkaRequest::SyncGroup(group::SyncGroupRequest {
            header: header(ApiKeys::SyncGroup, 5, correlation_id, client_id, true),
            group_id,
            generation_id,
            member_id,
            group_instance_id: None,
            protocol_type,
            protocol_name,
            assignments,
        })
    }

    pub fn heartbeat(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                     group_id: String, generation_id: GenerationId, member_id: String)
                     -> Self {
        KafkaRequest::Heartbeat(group::HeartbeatRequest {
            header: header(ApiKeys::Heartbeat, 4, correlation_id, client_id, true),
            group_id,
            generation_id,
            member_id,
            group_instance_id: None,
        })
    }

    pub fn leave_group(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                       group_id: String, member_id: String)
                       -> Self {
        KafkaRequest::LeaveGroup(group::LeaveGroupRequest {
            header: header(ApiKeys::LeaveGroup, 5, correlation_id, client_id, true),
            group_id,
            members: vec![
                group::LeaveGroupMember {
                    member_id,
                    group_instance_id: None,
                },
            ],
        })
    }

    pub fn init_producer_id(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                            transactional_id: Option<String>, transaction_timeout: Duration)
                            -> Self {
        KafkaRequest::InitProducerId(init_producer_id::InitProducerIdRequest {
            header: header(ApiKeys::InitProducerId, 5, correlation_id, client_id, true),
            transactional_id,
            transaction_timeout_ms: transaction_timeout.as_secs() as i32 * 1000
                + transaction_timeout.subsec_millis() as i32,
            producer_id: -1,
            producer_epoch: -1,
        })
    }

    /// `partitions` maps topic name to the `(partition, fetch_offset)`
    /// pairs to fetch, all at the same isolation level and byte/wait
    /// budget (`consumer::fetcher::Fetcher` fetches every assigned
    /// partition on one broker in a single request).
    pub fn fetch(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>, max_wait: Duration,
                min_bytes: i32, max_bytes: i32, isolation_level: i8,
                partitions: HashMap<String, Vec<(PartitionId, i64)>>)
                -> Self {
        let topics = partitions
            .into_iter()
            .map(|(topic, partitions)| {
                fetch::FetchTopic {
                    topic,
                    partitions: partitions
                        .into_iter()
                        .map(|(partition, fetch_offset)| {
                            fetch::FetchPartition {
                                partition,
                                current_leader_epoch: -1,
                                fetch_offset,
                                partition_max_bytes: max_bytes,
                            }
                        })
                        .collect(),
                }
            })
            .collect();

        KafkaRequest::Fetch(fetch::FetchRequest {
            header: header(ApiKeys::Fetch, 16, correlation_id, client_id, true),
            replica_id: -1,
            max_wait_ms: max_wait.as_secs() as i32 * 1000 + max_wait.subsec_millis() as i32,
            min_bytes,
            max_bytes,
            isolation_level,
            session_id: 0,
            session_epoch: -1,
            topics,
        })
    }

    pub fn offset_commit(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                         group_id: String, generation_id: GenerationId, member_id: String,
                         offsets: HashMap<String, Vec<(PartitionId, i64)>>)
                         -> Self {
        let topics = offsets
            .into_iter()
            .map(|(topic, partitions)| {
                offset_commit::OffsetCommitTopic {
                    topic,
                    partitions: partitions
                        .into_iter()
                        .map(|(partition, committed_offset)| {
                            offset_commit::OffsetCommitPartition {
                                partition,
                                committed_offset,
                                committed_leader_epoch: -1,
                                metadata: None,
                            }
                        })
                        .collect(),
                }
            })
            .collect();

        KafkaRequest::OffsetCommit(offset_commit::OffsetCommitRequest {
            header: header(ApiKeys::OffsetCommit, 9, correlation_id, client_id, true),
            group_id,
            generation_id,
            member_id,
            group_instance_id: None,
            topics,
        })
    }

    /// `topics` of `None` asks the broker for every partition the group
    /// has committed offsets for.
    pub fn offset_fetch(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>,
                        group_id: String, topics: Option<HashMap<String, Vec<PartitionId>>>)
                        -> Self {
        let topics = topics.map(|topics| {
            topics
                .into_iter()
                .map(|(topic, partitions)| offset_commit::OffsetFetchTopic { topic, partitions })
                .collect()
        });

        KafkaRequest::OffsetFetch(offset_commit::OffsetFetchRequest {
            header: header(ApiKeys::OffsetFetch, 9, correlation_id, client_id, true),
            group_id,
            topics,
            require_stable: false,
        })
    }
}
