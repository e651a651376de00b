//! Per-partition record grouping handed to `Inner::produce_records`,
//! replacing a single flat `Vec` argument with a shape that can batch
//! several topics/partitions into one `Produce` request body
//! (`protocol::produce::ProduceRequest` already nests topics/partitions
//! this way).

use protocol::record_batch::Record;
use protocol::PartitionId;

#[derive(Clone, Debug)]
pub struct PartitionRecord {
    pub partition: PartitionId,
    pub records: Vec<Record>,
}

impl PartitionRecord {
    pub fn new(partition: PartitionId, records: Vec<Record>) -> Self {
        PartitionRecord { partition, records }
    }
}

#[derive(Clone, Debug)]
pub struct TopicRecord {
    pub topic: String,
    pub partitions: Vec<PartitionRecord>,
}

impl TopicRecord {
    pub fn new<S: Into<String>>(topic: S, partitions: Vec<PartitionRecord>) -> Self {
        TopicRecord {
            topic: topic.into(),
            partitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::record_batch::Record;

    #[test]
    fn groups_records_by_partition_then_topic() {
        let tr = TopicRecord::new(
            "orders",
            vec![PartitionRecord::new(0, vec![Record::new(1, None, Some(b"v".to_vec()))])],
        );
        assert_eq!(tr.topic, "orders");
        assert_eq!(tr.partitions[0].partition, 0);
    }
}
