//! Error taxonomy for the client.
//!
//! Mirrors the broker's own error table (`KafkaCode`) plus the client-side
//! taxonomy: network/timeout/protocol/response/authentication/
//! unsupported-api/unsupported-compression/out-of-bounds/user/multiple.
//! Every variant carries a stable string code so callers can pattern-match
//! without depending on type identity (`PLT_KFK_*`).

use std::fmt;

use hexplay::HexViewBuilder;

/// Various errors reported by a remote Kafka server.
///
/// We use numeric codes to indicate what problem occurred on the server.
/// See also [Kafka Errors](http://kafka.apache.org/protocol.html).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum KafkaCode {
    Unknown = -1,
    None = 0,
    OffsetOutOfRange = 1,
    CorruptMessage = 2,
    UnknownTopicOrPartition = 3,
    InvalidMessageSize = 4,
    LeaderNotAvailable = 5,
    NotLeaderOrFollower = 6,
    RequestTimedOut = 7,
    BrokerNotAvailable = 8,
    ReplicaNotAvailable = 9,
    MessageSizeTooLarge = 10,
    StaleControllerEpoch = 11,
    OffsetMetadataTooLarge = 12,
    NetworkException = 13,
    GroupLoadInProgress = 14,
    GroupCoordinatorNotAvailable = 15,
    NotCoordinatorForGroup = 16,
    InvalidTopic = 17,
    RecordListTooLarge = 18,
    NotEnoughReplicas = 19,
    NotEnoughReplicasAfterAppend = 20,
    InvalidRequiredAcks = 21,
    IllegalGeneration = 22,
    InconsistentGroupProtocol = 23,
    InvalidGroupId = 24,
    UnknownMemberId = 25,
    InvalidSessionTimeout = 26,
    RebalanceInProgress = 27,
    InvalidCommitOffsetSize = 28,
    TopicAuthorizationFailed = 29,
    GroupAuthorizationFailed = 30,
    ClusterAuthorizationFailed = 31,
    InvalidTimestamp = 32,
    UnsupportedSaslMechanism = 33,
    IllegalSaslState = 34,
    UnsupportedVersion = 35,
    TopicAlreadyExists = 36,
    InvalidPartitions = 37,
    InvalidReplicationFactor = 38,
    InvalidReplicaAssignment = 39,
    InvalidConfig = 40,
    NotController = 41,
    InvalidRequest = 42,
    UnsupportedForMessageFormat = 43,
    PolicyViolation = 44,
    MemberIdRequired = 79,
}

impl KafkaCode {
    pub fn from_code(code: i16) -> Self {
        match code {
            -1 => KafkaCode::Unknown,
            0 => KafkaCode::None,
            1 => KafkaCode::OffsetOutOfRange,
            2 => KafkaCode::CorruptMessage,
            3 => KafkaCode::UnknownTopicOrPartition,
            4 => KafkaCode::InvalidMessageSize,
            5 => KafkaCode::LeaderNotAvailable,
            6 => KafkaCode::NotLeaderOrFollower,
            7 => KafkaCode::RequestTimedOut,
            8 => KafkaCode::BrokerNotAvailable,
            9 => KafkaCode::ReplicaNotAvailable,
            10 => KafkaCode::MessageSizeTooLarge,
            11 => KafkaCode::StaleControllerEpoch,
            12 => KafkaCode::OffsetMetadataTooLarge,
            13 => KafkaCode::NetworkException,
            14 => KafkaCode::GroupLoadInProgress,
            15 => KafkaCode::GroupCoordinatorNotAvailable,
            16 => KafkaCode::NotCoordinatorForGroup,
            17 => KafkaCode::InvalidTopic,
            18 => KafkaCode::RecordListTooLarge,
            19 => KafkaCode::NotEnoughReplicas,
            20 => KafkaCode::NotEnoughReplicasAfterAppend,
            21 => KafkaCode::InvalidRequiredAcks,
            22 => KafkaCode::IllegalGeneration,
            23 => KafkaCode::InconsistentGroupProtocol,
            24 => KafkaCode::InvalidGroupId,
            25 => KafkaCode::UnknownMemberId,
            26 => KafkaCode::InvalidSessionTimeout,
            27 => KafkaCode::RebalanceInProgress,
            28 => KafkaCode::InvalidCommitOffsetSize,
            29 => KafkaCode::TopicAuthorizationFailed,
            30 => KafkaCode::GroupAuthorizationFailed,
            31 => KafkaCode::ClusterAuthorizationFailed,
            32 => KafkaCode::InvalidTimestamp,
            33 => KafkaCode::UnsupportedSaslMechanism,
            34 => KafkaCode::IllegalSaslState,
            35 => KafkaCode::UnsupportedVersion,
            36 => KafkaCode::TopicAlreadyExists,
            37 => KafkaCode::InvalidPartitions,
            38 => KafkaCode::InvalidReplicationFactor,
            39 => KafkaCode::InvalidReplicaAssignment,
            40 => KafkaCode::InvalidConfig,
            41 => KafkaCode::NotController,
            42 => KafkaCode::InvalidRequest,
            43 => KafkaCode::UnsupportedForMessageFormat,
            44 => KafkaCode::PolicyViolation,
            79 => KafkaCode::MemberIdRequired,
            _ => KafkaCode::Unknown,
        }
    }

    /// Whether the client should retry the request that produced this code.
    pub fn can_retry(&self) -> bool {
        matches!(
            self,
            KafkaCode::CorruptMessage
                | KafkaCode::UnknownTopicOrPartition
                | KafkaCode::LeaderNotAvailable
                | KafkaCode::NotLeaderOrFollower
                | KafkaCode::RequestTimedOut
                | KafkaCode::NetworkException
                | KafkaCode::GroupLoadInProgress
                | KafkaCode::GroupCoordinatorNotAvailable
                | KafkaCode::NotCoordinatorForGroup
                | KafkaCode::NotEnoughReplicas
                | KafkaCode::NotEnoughReplicasAfterAppend
                | KafkaCode::RebalanceInProgress
        )
    }

    /// Whether this code indicates the client's metadata cache is out of date.
    pub fn has_stale_metadata(&self) -> bool {
        matches!(
            self,
            KafkaCode::UnknownTopicOrPartition
                | KafkaCode::LeaderNotAvailable
                | KafkaCode::NotLeaderOrFollower
        )
    }

    /// Whether the consumer must drop membership and rejoin its group.
    pub fn needs_rejoin(&self) -> bool {
        matches!(
            self,
            KafkaCode::IllegalGeneration
                | KafkaCode::UnknownMemberId
                | KafkaCode::RebalanceInProgress
                | KafkaCode::MemberIdRequired
        )
    }

    pub fn is_rebalance_in_progress(&self) -> bool {
        matches!(self, KafkaCode::RebalanceInProgress)
    }

    pub fn is_unknown_member(&self) -> bool {
        matches!(self, KafkaCode::UnknownMemberId)
    }
}

impl From<i16> for KafkaCode {
    fn from(v: i16) -> Self {
        KafkaCode::from_code(v)
    }
}

/// A frame that arrived with a correlation id no longer (or never) tracked
/// as in-flight. Carries the raw bytes so callers/logs can see what came
/// back without re-parsing from a live socket.
#[derive(Clone)]
pub struct UnexpectedFrame {
    pub correlation_id: i32,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UnexpectedFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let view = HexViewBuilder::new(&self.bytes).finish();
        write!(
            f,
            "UnexpectedFrame {{ correlation_id: {}, bytes:\n{} }}",
            self.correlation_id, view
        )
    }
}

impl fmt::Display for UnexpectedFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unexpected correlation id {} ({} bytes)",
            self.correlation_id,
            self.bytes.len()
        )
    }
}

/// `{path -> (apiCode, apiMessage)}` preserved alongside an aggregated
/// response error so callers can branch on per-partition outcomes without
/// re-parsing the decoded body.
pub type ResponseErrors = Vec<(String, KafkaCode, Option<String>)>;

error_chain! {
    foreign_links {
        IoError(::std::io::Error) #[doc = "Underlying socket I/O error."];
        ParseError(::nom::ErrorKind) #[doc = "Wire-format parser failure."];
    }

    errors {
        /// Socket closed/reset/error. Retriable by default.
        Network(reason: String) {
            description("network error")
            display("{} [{}]", reason, "PLT_KFK_NETWORK")
        }

        /// Operation deadline exceeded. Deliberately a distinct code from
        /// `Network` (the source this is ported from passed `NetworkError`'s
        /// code into its `TimeoutError` constructor, which looks like a
        /// copy-paste bug; we don't reproduce it).
        Timeout(label: String) {
            description("operation timed out")
            display("{} timed out [{}]", label, "PLT_KFK_TIMEOUT")
        }

        /// A response frame's correlation id was not in the in-flight table.
        UnexpectedCorrelationId(frame: UnexpectedFrame) {
            description("unexpected correlation id")
            display("{} [{}]", frame, "PLT_KFK_UNEXPECTED_CORRELATION_ID")
        }

        /// A `Writer` invariant was violated (e.g. length not prepended).
        UnfinishedWriteBuffer(reason: &'static str) {
            description("writer invariant violated")
            display("{} [{}]", reason, "PLT_KFK_UNFINISHED_WRITE_BUFFER")
        }

        /// A decoded broker error code.
        KafkaError(code: KafkaCode) {
            description("kafka protocol error")
            display("kafka error {:?} [{}]", code, "PLT_KFK_PROTOCOL")
        }

        /// Malformed wire data (truncated frame, bad length, etc).
        CodecError(reason: String) {
            description("malformed wire data")
            display("malformed: {} [{}]", reason, "PLT_KFK_PROTOCOL")
        }

        /// Aggregate of per-path protocol errors from one response.
        ResponseErrors(label: String, errors: ResponseErrors) {
            description("response contained per-partition errors")
            display("{}: {} errors [{}]", label, errors.len(), "PLT_KFK_RESPONSE")
        }

        /// SASL handshake/authenticate failure.
        Authentication(reason: String) {
            description("authentication failed")
            display("{} [{}]", reason, "PLT_KFK_AUTHENTICATION")
        }

        /// Broker doesn't expose the requested (apiKey, version).
        UnsupportedApi(api_key: i16, api_version: i16) {
            description("unsupported api")
            display("api {} version {} not supported by broker [{}]", api_key, api_version, "PLT_KFK_UNSUPPORTED_API")
        }

        /// Requested compression codec has no registered implementation.
        UnsupportedCompression(name: String) {
            description("unsupported compression codec")
            display("unsupported compression codec `{}` [{}]", name, "PLT_KFK_UNSUPPORTED_COMPRESSION")
        }

        /// Reader/writer window violation (reading/writing past the frame).
        OutOfBounds(reason: String) {
            description("out of bounds")
            display("{} [{}]", reason, "PLT_KFK_OUT_OF_BOUNDS")
        }

        /// Caller misuse or option validation failure.
        UserError(reason: String) {
            description("invalid use of the client")
            display("{} [{}]", reason, "PLT_KFK_USER")
        }

        /// Aggregate across retries or broker fan-out.
        MultipleErrors(label: String, errors: Vec<Error>) {
            description("multiple errors")
            display("{}: {} errors [{}]", label, errors.len(), "PLT_KFK_MULTIPLE")
        }

        /// A oneshot single-flight waiter was dropped before completion.
        Canceled(reason: &'static str) {
            description("operation canceled")
            display("canceled: {}", reason)
        }

        /// No broker in the current metadata snapshot matches a `BrokerRef`.
        BrokerNotFound(broker_ref: i32) {
            description("broker not found")
            display("broker #{} not found in the current metadata snapshot", broker_ref)
        }

        /// A response carried an api key the caller wasn't expecting.
        UnexpectedResponse(api_key: i16) {
            description("unexpected response")
            display("unexpected response for api key {}", api_key)
        }

        /// No assignor registered matches the group's selected protocol name.
        UnsupportedAssignmentStrategy(name: String) {
            description("unsupported assignment strategy")
            display("unsupported assignment strategy `{}`", name)
        }

        /// `JoinGroup` rejected an empty member id and handed back the one
        /// to retry with. Not a terminal failure: the caller should rejoin
        /// immediately using the returned id.
        MemberIdRequired(member_id: String) {
            description("member id required")
            display("group requires member id `{}` to rejoin [{}]", member_id, "PLT_KFK_MEMBER_ID_REQUIRED")
        }
    }
}

impl From<KafkaCode> for Error {
    fn from(code: KafkaCode) -> Self {
        ErrorKind::KafkaError(code).into()
    }
}
