//! The connection layer: wire framing, the
//! request/response sum types `client::service::KafkaService` dispatches
//! through, and the per-broker connection pool.

mod codec;
mod proto;
mod pool;
mod request;
mod response;

pub use self::pool::{Connection, ConnectFuture, Pool};
pub use self::proto::KafkaProto;
pub use self::request::KafkaRequest;
pub use self::response::KafkaResponse;

use std::borrow::Cow;

use protocol::PartitionId;

/// A topic/partition pair, the unit callers address produce/fetch/offset
/// calls to, matching `client.rs`'s `TopicPartition<'a>` usage
/// (`fn produce_records(..., topic_partition: TopicPartition<'a>, ...)`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopicPartition<'a> {
    pub topic_name: Cow<'a, str>,
    pub partition: PartitionId,
}

impl<'a> TopicPartition<'a> {
    pub fn new<S: Into<Cow<'a, str>>>(topic_name: S, partition: PartitionId) -> Self {
        TopicPartition {
            topic_name: topic_name.into(),
            partition,
        }
    }
}
