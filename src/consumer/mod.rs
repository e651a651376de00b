mod config;
mod protocol;
mod assignor;
mod subscriptions;
mod fetcher;
mod coordinator;
mod consumer;
mod builder;

pub use self::config::{AutoOffsetReset, ConsumerConfig, DEFAULT_AUTO_COMMIT_INTERVAL_MILLIS,
                       DEFAULT_HEARTBEAT_INTERVAL_MILLIS, DEFAULT_MAX_POLL_RECORDS,
                       DEFAULT_SESSION_TIMEOUT_MILLIS};
pub use self::protocol::{Schema, CONSUMER_PROTOCOL, ConsumerProtocol};
pub use self::assignor::{Assignment, AssignmentStrategy, PartitionAssignor, RoundRobinAssignor,
                         Subscription};
pub use self::subscriptions::Subscriptions;
pub use self::fetcher::Fetcher;
pub use self::coordinator::{ConsumerCoordinator, Coordinator};
pub use self::consumer::{Commit, Consumer, ConsumerRecord, Join, KafkaConsumer, PollRecords};
pub use self::builder::ConsumerBuilder;
