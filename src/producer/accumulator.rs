//! Buffers records per `(topic, partition)` until a batch is ready to send,
//! the way `client::client::Inner`'s `MetadataStatus::Loading` buffers
//! waiters behind a `RefCell` until the value they want becomes available.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use futures::Future;
use futures::unsync::oneshot;

use errors::{Error, Result};
use protocol::PartitionId;
use protocol::record_batch::RecordHeader;

use client::StaticBoxFuture;
use producer::batch::{ProducerBatch, Thunk};
use producer::record::RecordMetadata;

/// The future of `Accumulator::append`: resolves once the batch the record
/// landed in has been sent and acknowledged.
pub type PushRecord = StaticBoxFuture<RecordMetadata>;

/// Buffers records for later draining into produce requests.
pub trait Accumulator {
    fn append(&self,
              topic: String,
              partition: PartitionId,
              timestamp: i64,
              key: Option<Vec<u8>>,
              value: Option<Vec<u8>>,
              headers: Vec<RecordHeader>)
              -> PushRecord;
}

/// A `RecordAccumulator` groups records by partition and hands back whole
/// batches once they're full or have lingered long enough.
#[derive(Default)]
pub struct RecordAccumulator {
    batches: RefCell<HashMap<(String, PartitionId), ProducerBatch>>,
    batch_size: usize,
}

impl RecordAccumulator {
    pub fn new(batch_size: usize) -> Self {
        RecordAccumulator {
            batches: RefCell::new(HashMap::new()),
            batch_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batches.borrow().is_empty()
    }

    /// Removes every batch that is full (by estimated size) or has lingered
    /// at least `linger`, regardless of fullness.
    pub fn drain_ready(&self, linger: Duration) -> Vec<((String, PartitionId), ProducerBatch)> {
        let mut batches = self.batches.borrow_mut();
        let batch_size = self.batch_size;

        let ready: Vec<(String, PartitionId)> = batches
            .iter()
            .filter(|&(_, batch)| batch.estimated_size() >= batch_size || batch.age() >= linger)
            .map(|(key, _)| key.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|key| batches.remove(&key).map(|batch| (key, batch)))
            .collect()
    }

    /// Removes every buffered batch, ready or not; used when flushing or
    /// shutting down the producer.
    pub fn drain_all(&self) -> Vec<((String, PartitionId), ProducerBatch)> {
        self.batches.borrow_mut().drain().collect()
    }
}

impl Accumulator for RecordAccumulator {
    fn append(&self,
              topic: String,
              partition: PartitionId,
              timestamp: i64,
              key: Option<Vec<u8>>,
              value: Option<Vec<u8>>,
              headers: Vec<RecordHeader>)
              -> PushRecord {
        let (tx, rx) = oneshot::channel();

        {
            let mut batches = self.batches.borrow_mut();
            let batch = batches
                .entry((topic.clone(), partition))
                .or_insert_with(|| ProducerBatch::new(topic, partition));

            batch.push(timestamp, key, value, headers, Thunk::new(tx));
        }

        let future = rx.then(|res| match res {
            Ok(result) => result,
            Err(_) => Err(Error::from("producer batch dropped before it was sent")),
        });

        PushRecord::new(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_until_size_threshold() {
        let accumulator = RecordAccumulator::new(4);
        assert!(accumulator.is_empty());

        let _push = accumulator.append("t".to_owned(), 0, 0, None, Some(b"v".to_vec()), Vec::new());
        assert!(!accumulator.is_empty());

        let ready = accumulator.drain_ready(Duration::from_secs(3600));
        assert_eq!(ready.len(), 1);
        assert!(accumulator.is_empty());
    }

    #[test]
    fn lingering_batch_drains_even_if_small() {
        let accumulator = RecordAccumulator::new(1024 * 1024);
        let _push = accumulator.append("t".to_owned(), 0, 0, None, Some(b"v".to_vec()), Vec::new());

        assert!(accumulator.drain_ready(Duration::from_secs(3600)).is_empty());
        assert_eq!(accumulator.drain_ready(Duration::from_secs(0)).len(), 1);
    }

    #[test]
    fn drain_all_removes_regardless_of_linger() {
        let accumulator = RecordAccumulator::new(1024 * 1024);
        let _push = accumulator.append("t".to_owned(), 0, 0, None, Some(b"v".to_vec()), Vec::new());

        let drained = accumulator.drain_all();
        assert_eq!(drained.len(), 1);
        assert!(accumulator.is_empty());
    }
}
