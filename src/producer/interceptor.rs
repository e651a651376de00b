//! A chain of `ProducerInterceptor`s run around every `Producer::send`,
//! the same shape `client::middleware` uses to wrap a `Service` except
//! interceptors observe rather than transform the transport: each one
//! gets a chance to rewrite the outgoing record and to see the eventual
//! result, in registration order.

use errors::Result;
use producer::record::{ProducerRecord, RecordMetadata};

/// One link in the interceptor chain. Errors from either hook are logged
/// and otherwise ignored; an interceptor bug must never stop a record
/// from being produced.
pub trait ProducerInterceptor {
    /// Called with the record just as the caller handed it to `send`,
    /// before a partition has been assigned. May return a modified copy
    /// (e.g. to stamp a tracing header).
    fn on_send(&self, record: ProducerRecord) -> Result<ProducerRecord> {
        Ok(record)
    }

    /// Called once the record's produce attempt has resolved, whichever
    /// way. `result` carries whatever `Producer::send`'s future resolved
    /// to for this record.
    fn on_acknowledgement(&self, _result: &Result<RecordMetadata>) {}
}

pub trait Interceptors<T> {
    fn add(&mut self, interceptor: T);
}

/// Holds the registered chain and runs it around `KafkaProducer::send`.
#[derive(Default)]
pub struct ProducerInterceptors {
    chain: Vec<Box<ProducerInterceptor>>,
}

impl ProducerInterceptors {
    pub fn new() -> Self {
        ProducerInterceptors { chain: Vec::new() }
    }

    pub fn on_send(&self, record: ProducerRecord) -> ProducerRecord {
        self.chain.iter().fold(record, |record, interceptor| {
            match interceptor.on_send(record.clone()) {
                Ok(next) => next,
                Err(err) => {
                    warn!("producer interceptor failed on_send, {}", err);
                    record
                }
            }
        })
    }

    pub fn on_acknowledgement(&self, result: &Result<RecordMetadata>) {
        for interceptor in &self.chain {
            interceptor.on_acknowledgement(result);
        }
    }
}

impl Interceptors<Box<ProducerInterceptor>> for ProducerInterceptors {
    fn add(&mut self, interceptor: Box<ProducerInterceptor>) {
        self.chain.push(interceptor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingInterceptor(Rc<Cell<usize>>);

    impl ProducerInterceptor for CountingInterceptor {
        fn on_send(&self, record: ProducerRecord) -> Result<ProducerRecord> {
            self.0.set(self.0.get() + 1);
            Ok(record.with_partition(7))
        }
    }

    #[test]
    fn chain_runs_every_interceptor_in_order() {
        let calls = Rc::new(Cell::new(0));
        let mut interceptors = ProducerInterceptors::new();
        interceptors.add(Box::new(CountingInterceptor(calls.clone())));

        let record = ProducerRecord::from_value("t", b"v".to_vec());
        let record = interceptors.on_send(record);

        assert_eq!(calls.get(), 1);
        assert_eq!(record.partition, Some(7));
    }

    #[test]
    fn empty_chain_passes_record_through_unchanged() {
        let interceptors = ProducerInterceptors::new();
        let record = ProducerRecord::from_value("t", b"v".to_vec());
        let passed = interceptors.on_send(record.clone());
        assert_eq!(passed, record);
    }
}
