//! `ProducerRecord`/`RecordMetadata`, the producer's public message and
//! per-send result types. Grounded on `producer::mod`'s re-export names;
//! shaped after `protocol::record_batch::Record` with the extra fields
//! (`topic`, optional `partition`) a producer call site needs before the
//! batch engine ever sees it.

use protocol::record_batch::RecordHeader;
use protocol::{Offset, PartitionId};

/// One message handed to `Producer::send`. `partition` is `None` until
/// `partitioner::Partitioner` assigns one.
#[derive(Clone, Debug, PartialEq)]
pub struct ProducerRecord {
    pub topic: String,
    pub partition: Option<PartitionId>,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub timestamp: Option<i64>,
    pub headers: Vec<RecordHeader>,
}

impl ProducerRecord {
    pub fn from_value<S: Into<String>>(topic: S, value: Vec<u8>) -> Self {
        ProducerRecord {
            topic: topic.into(),
            partition: None,
            key: None,
            value: Some(value),
            timestamp: None,
            headers: Vec::new(),
        }
    }

    pub fn from_key_value<S: Into<String>>(topic: S, key: Vec<u8>, value: Vec<u8>) -> Self {
        ProducerRecord {
            topic: topic.into(),
            partition: None,
            key: Some(key),
            value: Some(value),
            timestamp: None,
            headers: Vec::new(),
        }
    }

    pub fn with_partition(mut self, partition: PartitionId) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// What the broker acknowledged for one sent record.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordMetadata {
    pub topic: String,
    pub partition: PartitionId,
    pub offset: Offset,
}
