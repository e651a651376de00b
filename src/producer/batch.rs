//! A single partition's worth of buffered records plus the completion
//! handles their callers are waiting on. Grounded on `protocol::record_batch
//! ::Record`'s shape; the thunk-per-record pattern mirrors the way
//! `client::client::Inner`'s futures resolve a single value per caller.

use std::time::{Duration, Instant};

use futures::unsync::oneshot;

use errors::Result;
use protocol::record_batch::{Record, RecordHeader};

use producer::record::RecordMetadata;

/// The callback half of one buffered record: fulfilled with its
/// `RecordMetadata` once the batch it landed in is acknowledged, or with an
/// error if the send failed.
pub struct Thunk {
    sender: oneshot::Sender<Result<RecordMetadata>>,
}

impl Thunk {
    pub fn new(sender: oneshot::Sender<Result<RecordMetadata>>) -> Self {
        Thunk { sender }
    }

    pub fn complete(self, result: Result<RecordMetadata>) {
        // Caller may have dropped the receiving future; nothing to do then.
        let _ = self.sender.send(result);
    }
}

/// Records accumulated for one `(topic, partition)` pending a produce call.
pub struct ProducerBatch {
    topic: String,
    partition: i32,
    records: Vec<Record>,
    thunks: Vec<Thunk>,
    size: usize,
    created_at: Instant,
}

impl ProducerBatch {
    pub fn new(topic: String, partition: i32) -> Self {
        ProducerBatch {
            topic,
            partition,
            records: Vec::new(),
            thunks: Vec::new(),
            size: 0,
            created_at: Instant::now(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    pub fn push(&mut self,
                timestamp: i64,
                key: Option<Vec<u8>>,
                value: Option<Vec<u8>>,
                headers: Vec<RecordHeader>,
                thunk: Thunk) {
        self.size += key.as_ref().map_or(0, Vec::len) + value.as_ref().map_or(0, Vec::len) + 16;
        self.records.push(Record { timestamp, key, value, headers });
        self.thunks.push(thunk);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rough estimate of the wire size this batch will build to; used to
    /// decide whether the batch is full, not an exact `RecordBatch::build`
    /// size.
    pub fn estimated_size(&self) -> usize {
        self.size
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Splits the batch into its wire-ready records and the thunks waiting
    /// on the eventual produce result, in matching order.
    pub fn into_parts(self) -> (String, i32, Vec<Record>, Vec<Thunk>) {
        (self.topic, self.partition, self.records, self.thunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_length_and_emptiness() {
        let mut batch = ProducerBatch::new("t".to_owned(), 0);
        assert!(batch.is_empty());

        let (tx, _rx) = oneshot::channel();
        batch.push(0, None, Some(b"v".to_vec()), Vec::new(), Thunk::new(tx));

        assert_eq!(batch.len(), 1);
        assert!(!batch.is_empty());
        assert!(batch.estimated_size() >= 1);
    }

    #[test]
    fn into_parts_preserves_order() {
        let mut batch = ProducerBatch::new("t".to_owned(), 2);
        let (tx0, _rx0) = oneshot::channel();
        let (tx1, _rx1) = oneshot::channel();
        batch.push(0, None, Some(b"a".to_vec()), Vec::new(), Thunk::new(tx0));
        batch.push(1, None, Some(b"b".to_vec()), Vec::new(), Thunk::new(tx1));

        let (topic, partition, records, thunks) = batch.into_parts();
        assert_eq!(topic, "t");
        assert_eq!(partition, 2);
        assert_eq!(records.len(), 2);
        assert_eq!(thunks.len(), 2);
        assert_eq!(records[0].value, Some(b"a".to_vec()));
        assert_eq!(records[1].value, Some(b"b".to_vec()));
    }
}
