//! Wire codec and the per-API version registry.
//!
//! Every request/response pair is a hand-written struct with an `Encodable`
//! impl and a `nom` parser, following the existing `protocol::{metadata,
//! produce, fetch, api_versions}` modules. `ApiKeys` grows to the full set
//! of broker calls this crate issues; `API_REGISTRY` gives `Connection`/
//! `Client` one dispatch path instead of a match arm per call site.

use bytes::{ByteOrder, BytesMut};

use errors::Result;

pub mod header;
pub mod varint;
pub mod record_batch;
pub mod metadata;
pub mod produce;
pub mod fetch;
pub mod list_offsets;
pub mod group;
pub mod offset_commit;
pub mod api_versions;
pub mod init_producer_id;
pub mod sasl;
pub mod admin;

pub use self::header::{parse_response_header, ApiKey, ApiVersion, CorrelationId, RequestHeader,
                        ResponseHeader, WriteExt};

pub type ErrorCode = i16;
pub type PartitionId = i32;
pub type Offset = i64;
pub type GenerationId = i32;

/// The target offset a `ListOffsets` call resolves.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchOffset {
    Earliest,
    Latest,
    ByTime(i64),
}

impl FetchOffset {
    pub fn to_timestamp(&self) -> i64 {
        match *self {
            FetchOffset::Earliest => list_offsets::EARLIEST_TIMESTAMP,
            FetchOffset::Latest => list_offsets::LATEST_TIMESTAMP,
            FetchOffset::ByTime(ts) => ts,
        }
    }
}

/// Something that can serialize itself onto a request frame, after the
/// header has already been written by the caller's dispatch path.
pub trait Encodable {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()>;
}

/// Tags a `nom` parser invocation for the custom error variant it reports
/// on failure, labeling which part of a response body a parse failure
/// came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseTag {
    ApiVersionsResponse,
    ApiVersion,
    MetadataResponse,
    MetadataBroker,
    MetadataTopic,
    MetadataPartition,
    ProduceResponse,
    ProduceTopic,
    ProducePartition,
    FetchTopics,
    FetchPartitions,
    ListOffsetsResponse,
    ListOffsetsPartition,
    JoinGroupResponse,
    JoinGroupMember,
    SyncGroupResponse,
    HeartbeatResponse,
    LeaveGroupResponse,
    FindCoordinatorResponse,
    OffsetCommitResponse,
    OffsetFetchResponse,
    InitProducerIdResponse,
    SaslHandshakeResponse,
    SaslAuthenticateResponse,
    RecordBatch,
    Record,
}

/// Wraps a nom parser so a failure is reported as `ErrorKind::CodecError`
/// carrying the tag, instead of a bare nom `ErrorKind`.
macro_rules! parse_tag {
    ($tag:expr, $submac:ident!( $($args:tt)* )) => {
        fix_error!($crate::errors::ErrorKind, $submac!($($args)*))
    };
    ($tag:expr, $f:expr) => {
        parse_tag!($tag, call!($f))
    };
}

/// The numeric `apiKey` values this crate issues requests for.
/// Admin-tail APIs with no bespoke struct module are built through
/// `admin::AdminRequest` directly against their numeric key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum ApiKeys {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    LeaderAndIsr = 4,
    StopReplica = 5,
    UpdateMetadata = 6,
    ControlledShutdown = 7,
    OffsetCommit = 8,
    OffsetFetch = 9,
    FindCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
    SaslHandshake = 17,
    ApiVersions = 18,
    CreateTopics = 19,
    DeleteTopics = 20,
    DeleteRecords = 21,
    InitProducerId = 22,
    OffsetForLeaderEpoch = 23,
    AddPartitionsToTxn = 24,
    AddOffsetsToTxn = 25,
    EndTxn = 26,
    TxnOffsetCommit = 28,
    DescribeAcls = 29,
    CreateAcls = 30,
    DeleteAcls = 31,
    DescribeConfigs = 32,
    AlterConfigs = 33,
    SaslAuthenticate = 36,
    AlterPartitionReassignments = 45,
    IncrementalAlterConfigs = 44,
    DescribeClientQuotas = 48,
    AlterClientQuotas = 49,
    DescribeQuorum = 55,
    UnregisterBroker = 64,
    DescribeClusters = 60,
    ListTransactions = 66,
    ConsumerGroupHeartbeat = 68,
    DeleteGroups = 42,
    UpdateFeatures = 57,
    DescribeTopicPartitions = 75,
}

impl ApiKeys {
    pub fn from_code(code: i16) -> Result<Self> {
        use self::ApiKeys::*;
        Ok(match code {
            0 => Produce,
            1 => Fetch,
            2 => ListOffsets,
            3 => Metadata,
            4 => LeaderAndIsr,
            5 => StopReplica,
            6 => UpdateMetadata,
            7 => ControlledShutdown,
            8 => OffsetCommit,
            9 => OffsetFetch,
            10 => FindCoordinator,
            11 => JoinGroup,
            12 => Heartbeat,
            13 => LeaveGroup,
            14 => SyncGroup,
            15 => DescribeGroups,
            16 => ListGroups,
            17 => SaslHandshake,
            18 => ApiVersions,
            19 => CreateTopics,
            20 => DeleteTopics,
            21 => DeleteRecords,
            22 => InitProducerId,
            23 => OffsetForLeaderEpoch,
            24 => AddPartitionsToTxn,
            25 => AddOffsetsToTxn,
            26 => EndTxn,
            28 => TxnOffsetCommit,
            29 => DescribeAcls,
            30 => CreateAcls,
            31 => DeleteAcls,
            32 => DescribeConfigs,
            33 => AlterConfigs,
            36 => SaslAuthenticate,
            42 => DeleteGroups,
            44 => IncrementalAlterConfigs,
            45 => AlterPartitionReassignments,
            48 => DescribeClientQuotas,
            49 => AlterClientQuotas,
            55 => DescribeQuorum,
            57 => UpdateFeatures,
            60 => DescribeClusters,
            64 => UnregisterBroker,
            66 => ListTransactions,
            68 => ConsumerGroupHeartbeat,
            75 => DescribeTopicPartitions,
            _ => bail!(::errors::ErrorKind::UnsupportedApi(code, 0)),
        })
    }
}

/// Acknowledgement requirement for a produce request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum RequiredAcks {
    /// Fire-and-forget; broker does not send a response.
    None = 0,
    /// Wait for the partition leader's local write.
    One = 1,
    /// Wait for every in-sync replica.
    All = -1,
}

impl From<i16> for RequiredAcks {
    fn from(v: i16) -> Self {
        match v {
            0 => RequiredAcks::None,
            1 => RequiredAcks::One,
            _ => RequiredAcks::All,
        }
    }
}

pub use self::header::{parse_bytes, parse_compact_array_len, parse_compact_bytes,
                        parse_compact_str, parse_str, parse_string, skip_tagged_fields};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_round_trip_known_codes() {
        for &code in &[0i16, 1, 2, 3, 8, 9, 10, 11, 12, 13, 14, 17, 18, 22] {
            assert!(ApiKeys::from_code(code).is_ok(), "code {} should resolve", code);
        }
    }

    #[test]
    fn api_keys_unknown_code_is_unsupported_api() {
        match ApiKeys::from_code(9999) {
            Err(::errors::Error(::errors::ErrorKind::UnsupportedApi(9999, 0), _)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
