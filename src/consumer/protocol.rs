//! Wire format for the `"consumer"` embedded protocol: the
//! `Subscription`/`Assignment` payloads carried as opaque bytes inside
//! `JoinGroup`'s `group_protocols` and `SyncGroup`'s `group_assignment`.
//! Encoded the legacy way (`i16`-length strings, `i32`-length bytes,
//! `i32`-counted arrays) regardless of whether the request that embeds
//! them is itself flexible, since this payload predates the
//! tagged-fields convention.

use bytes::{BigEndian, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::{parse_bytes, parse_string, WriteExt};
use network::TopicPartition;
use consumer::assignor::{Assignment, Subscription};

pub const CONSUMER_PROTOCOL: &str = "consumer";

const SCHEMA_VERSION: i16 = 0;

/// Serializes/deserializes a protocol payload to/from its wire bytes.
pub trait Schema: Sized {
    fn serialize(&self) -> Result<Vec<u8>>;
    fn deserialize(buf: &[u8]) -> Result<Self>;
}

/// Marker for the `"consumer"` protocol family. Exists so
/// `consumer::builder::ConsumerBuilder` has a type to name in its
/// `protocol_type` default the same way `assignor::AssignmentStrategy`
/// names a strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsumerProtocol;

impl Schema for Subscription {
    fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_i16::<BigEndian>(SCHEMA_VERSION);
        buf.put_array::<BigEndian, _, _>(self.topics.iter(), |buf, topic| {
                buf.put_str::<BigEndian, _>(Some(topic.clone()))
            })?;
        buf.put_bytes::<BigEndian, _>(self.user_data.clone())?;
        Ok(buf.to_vec())
    }

    fn deserialize(buf: &[u8]) -> Result<Self> {
        let version = read_i16(buf)?;
        if version < 0 {
            bail!(ErrorKind::CodecError("negative subscription version".to_owned()));
        }

        let mut rest = &buf[2..];
        let count = read_i32(rest)?;
        rest = &rest[4..];

        let mut topics = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match parse_string(rest) {
                ::nom::IResult::Done(r, topic) => {
                    rest = r;
                    topics.push(topic);
                }
                _ => bail!(ErrorKind::CodecError("truncated subscription topic".to_owned())),
            }
        }

        let user_data = match parse_bytes(rest) {
            ::nom::IResult::Done(_, user_data) => user_data,
            _ => bail!(ErrorKind::CodecError("truncated subscription user data".to_owned())),
        };

        Ok(Subscription { topics, user_data })
    }
}

impl Schema for Assignment {
    fn serialize(&self) -> Result<Vec<u8>> {
        let mut by_topic: Vec<(String, Vec<i32>)> = Vec::new();

        for tp in &self.partitions {
            match by_topic.iter_mut().find(|&&mut (ref topic, _)| *topic == tp.topic_name) {
                Some(&mut (_, ref mut partitions)) => partitions.push(tp.partition),
                None => by_topic.push((tp.topic_name.clone().into_owned(), vec![tp.partition])),
            }
        }

        let mut buf = BytesMut::with_capacity(64);
        buf.put_i16::<BigEndian>(SCHEMA_VERSION);
        buf.put_array::<BigEndian, _, _>(by_topic.into_iter(), |buf, (topic, partitions)| {
                buf.put_str::<BigEndian, _>(Some(topic))?;
                buf.put_array::<BigEndian, _, _>(partitions.into_iter(), |buf, partition| {
                        buf.put_i32::<BigEndian>(partition);
                        Ok(())
                    })
            })?;
        buf.put_bytes::<BigEndian, _>(self.user_data.clone())?;
        Ok(buf.to_vec())
    }

    fn deserialize(buf: &[u8]) -> Result<Self> {
        let version = read_i16(buf)?;
        if version < 0 {
            bail!(ErrorKind::CodecError("negative assignment version".to_owned()));
        }

        let mut rest = &buf[2..];
        let topic_count = read_i32(rest)?;
        rest = &rest[4..];

        let mut partitions = Vec::new();

        for _ in 0..topic_count {
            let topic = match parse_string(rest) {
                ::nom::IResult::Done(r, topic) => {
                    rest = r;
                    topic
                }
                _ => bail!(ErrorKind::CodecError("truncated assignment topic".to_owned())),
            };

            let partition_count = read_i32(rest)?;
            rest = &rest[4..];

            for _ in 0..partition_count {
                let partition = read_i32(rest)?;
                rest = &rest[4..];
                partitions.push(TopicPartition::new(topic.clone(), partition));
            }
        }

        let user_data = match parse_bytes(rest) {
            ::nom::IResult::Done(_, user_data) => user_data,
            _ => bail!(ErrorKind::CodecError("truncated assignment user data".to_owned())),
        };

        Ok(Assignment { partitions, user_data })
    }
}

fn read_i16(input: &[u8]) -> Result<i16> {
    if input.len() < 2 {
        bail!(ErrorKind::CodecError("truncated i16".to_owned()));
    }
    Ok(BigEndian::read_i16(&input[..2]))
}

fn read_i32(input: &[u8]) -> Result<i32> {
    if input.len() < 4 {
        bail!(ErrorKind::CodecError("truncated i32".to_owned()));
    }
    Ok(BigEndian::read_i32(&input[..4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_round_trips() {
        let subscription = Subscription {
            topics: vec!["orders".to_owned(), "payments".to_owned()],
            user_data: Some(b"meta".to_vec()),
        };

        let bytes = subscription.serialize().unwrap();
        let decoded = Subscription::deserialize(&bytes).unwrap();

        assert_eq!(decoded, subscription);
    }

    #[test]
    fn assignment_round_trips() {
        let assignment = Assignment {
            partitions: vec![TopicPartition::new("orders".to_owned(), 0),
                             TopicPartition::new("orders".to_owned(), 1)],
            user_data: None,
        };

        let bytes = assignment.serialize().unwrap();
        let decoded = Assignment::deserialize(&bytes).unwrap();

        assert_eq!(decoded, assignment);
    }
}
