//! ListOffsets (apiKey 2, v6+, flexible). Timestamps `-1`/`-2` request the
//! LATEST/EARLIEST offset. Built on the same
//! request/response shape as `produce`/`fetch`, simplified since each
//! partition result is a handful of fixed-width fields.

use bytes::{BigEndian, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::header::{parse_compact_array_len, parse_compact_str};
use protocol::{skip_tagged_fields, Encodable, RequestHeader, ResponseHeader, WriteExt};

pub const LATEST_TIMESTAMP: i64 = -1;
pub const EARLIEST_TIMESTAMP: i64 = -2;

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsRequest<'a> {
    pub header: RequestHeader<'a>,
    pub replica_id: i32,
    pub isolation_level: i8,
    pub topics: Vec<ListOffsetsTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsTopic {
    pub topic: String,
    pub partitions: Vec<ListOffsetsPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsPartition {
    pub partition: i32,
    pub current_leader_epoch: i32,
    pub timestamp: i64,
}

impl<'a> Encodable for ListOffsetsRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_i32::<T>(self.replica_id);
        dst.put_i8(self.isolation_level);
        dst.put_compact_array(self.topics, |buf, topic| {
            buf.put_compact_str(Some(topic.topic));
            buf.put_compact_array(topic.partitions, |buf, partition| {
                buf.put_i32::<T>(partition.partition);
                buf.put_i32::<T>(partition.current_leader_epoch);
                buf.put_i64::<T>(partition.timestamp);
                buf.put_tagged_fields(&[]);
                Ok(())
            })?;
            buf.put_tagged_fields(&[]);
            Ok(())
        })?;
        dst.put_tagged_fields(&[]);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsResponse {
    pub header: ResponseHeader,
    pub throttle_time_ms: i32,
    pub topics: Vec<ListOffsetsTopicResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsTopicResult {
    pub topic: String,
    pub partitions: Vec<ListOffsetsPartitionResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsPartitionResult {
    pub partition: i32,
    pub error_code: i16,
    pub timestamp: i64,
    pub offset: i64,
    pub leader_epoch: i32,
}

pub fn parse_list_offsets_response(input: &[u8]) -> Result<ListOffsetsResponse> {
    let (header, rest) = match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => (h, rest),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    };
    let mut rest = skip_tagged_fields(rest)?;

    let throttle_time_ms = read_i32(rest)?;
    rest = &rest[4..];

    let (topic_count, r) = parse_compact_array_len(rest)?;
    rest = r;
    let mut topics = Vec::with_capacity(topic_count.unwrap_or(0));
    for _ in 0..topic_count.unwrap_or(0) {
        let (name, r) = parse_compact_str(rest)?;
        rest = r;
        let (partition_count, r) = parse_compact_array_len(rest)?;
        rest = r;
        let mut partitions = Vec::with_capacity(partition_count.unwrap_or(0));
        for _ in 0..partition_count.unwrap_or(0) {
            if rest.len() < 26 {
                bail!(ErrorKind::CodecError("truncated list offsets partition".into()));
            }
            let partition = BigEndian::read_i32(&rest[0..4]);
            let error_code = BigEndian::read_i16(&rest[4..6]);
            let timestamp = BigEndian::read_i64(&rest[6..14]);
            let offset = BigEndian::read_i64(&rest[14..22]);
            let leader_epoch = BigEndian::read_i32(&rest[22..26]);
            rest = &rest[26..];
            rest = skip_tagged_fields(rest)?;
            partitions.push(ListOffsetsPartitionResult {
                partition,
                error_code,
                timestamp,
                offset,
                leader_epoch,
            });
        }
        rest = skip_tagged_fields(rest)?;
        topics.push(ListOffsetsTopicResult {
            topic: name.unwrap_or_default(),
            partitions,
        });
    }

    Ok(ListOffsetsResponse {
        header,
        throttle_time_ms,
        topics,
    })
}

fn read_i32(input: &[u8]) -> Result<i32> {
    if input.len() < 4 {
        bail!(ErrorKind::CodecError("truncated i32".into()));
    }
    Ok(BigEndian::read_i32(&input[..4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_request_smoke() {
        let req = ListOffsetsRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::ListOffsets as i16,
                api_version: 7,
                correlation_id: 1,
                client_id: Some("c".into()),
                flexible: true,
            },
            replica_id: -1,
            isolation_level: 0,
            topics: vec![ListOffsetsTopic {
                topic: "orders".to_owned(),
                partitions: vec![ListOffsetsPartition {
                    partition: 0,
                    current_leader_epoch: -1,
                    timestamp: LATEST_TIMESTAMP,
                }],
            }],
        };
        let mut buf = BytesMut::with_capacity(64);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }
}
