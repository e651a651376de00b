mod version;
mod config;
mod cluster;
mod metadata;
mod metrics;
mod middleware;
mod service;
mod record;
mod client;
mod builder;

pub use self::version::KafkaVersion;
pub use self::config::{ClientConfig, DEFAULT_MAX_CONNECTION_IDLE_TIMEOUT_MILLIS,
                       DEFAULT_METADATA_MAX_AGE_MILLS, DEFAULT_REQUEST_TIMEOUT_MILLS};
pub use self::cluster::{Broker, BrokerRef, Cluster, PartitionInfo};
pub use self::metadata::{Metadata, TopicPartitions};
pub use self::metrics::Metrics;
pub use self::service::{FutureResponse, KafkaService};
pub use self::record::{PartitionRecord, TopicRecord};
pub use self::client::{Client, CommitOffsets, CommittedOffset, ConsumerGroup,
                       ConsumerGroupAssignment, ConsumerGroupMember, ConsumerGroupProtocol, Fetch,
                       FetchCommittedOffsets, FetchOffsets, Generation, GroupCoordinator, Heartbeat,
                       InitProducerId, IsolationLevel, JoinGroup, KafkaClient, LeaveGroup,
                       LoadMetadata, PartitionData, PartitionOffset, ProduceRecords,
                       ProducerIdAndEpoch, StaticBoxFuture, SyncGroup, ToStaticBoxFuture};
pub use self::builder::ClientBuilder;
