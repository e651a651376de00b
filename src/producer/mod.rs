mod record;
mod partitioner;
mod config;
mod batch;
mod accumulator;
mod sender;
mod producer;
mod serialization;
mod interceptor;
mod builder;

pub use self::record::{ProducerRecord, RecordMetadata};
pub use self::partitioner::{DefaultPartitioner, Partitioner};
pub use self::config::{DEFAULT_ACK_TIMEOUT_MILLIS, DEFAULT_BATCH_SIZE, DEFAULT_LINGER_MILLIS,
                       DEFAULT_MAX_REQUEST_SIZE, ProducerConfig};
pub use self::batch::{ProducerBatch, Thunk};
pub use self::accumulator::{Accumulator, PushRecord, RecordAccumulator};
pub use self::sender::{SendBatch, Sender};
pub use self::producer::{Flush, KafkaProducer, Producer, SendRecord};
pub use self::serialization::{BytesSerializer, NoopSerializer, RawSerializer, Serializer};
#[cfg(feature = "encoding")]
pub use self::serialization::StrEncodingSerializer;
pub use self::interceptor::{Interceptors, ProducerInterceptor, ProducerInterceptors};
pub use self::builder::ProducerBuilder;
