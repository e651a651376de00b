//! OffsetCommit (apiKey 8, v9) and OffsetFetch (apiKey 9, v9), both
//! flexible. Grounded on the same request/response shape as `group.rs`;
//! `OffsetFetch`'s grouped-by-group request form (v8+) lets one call cover
//! several consumer groups, which the single-group helper constructors
//! below collapse back to the common case.

use bytes::{BigEndian, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::header::{parse_compact_array_len, parse_compact_str};
use protocol::{skip_tagged_fields, Encodable, RequestHeader, ResponseHeader, WriteExt};

// ---- OffsetCommit ----

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub topics: Vec<OffsetCommitTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitTopic {
    pub topic: String,
    pub partitions: Vec<OffsetCommitPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitPartition {
    pub partition: i32,
    pub committed_offset: i64,
    pub committed_leader_epoch: i32,
    pub metadata: Option<String>,
}

impl<'a> Encodable for OffsetCommitRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_compact_str(Some(self.group_id));
        dst.put_i32::<T>(self.generation_id);
        dst.put_compact_str(Some(self.member_id));
        dst.put_compact_str(self.group_instance_id);
        dst.put_compact_array(self.topics, |buf, topic| {
            buf.put_compact_str(Some(topic.topic));
            buf.put_compact_array(topic.partitions, |buf, partition| {
                buf.put_i32::<T>(partition.partition);
                buf.put_i64::<T>(partition.committed_offset);
                buf.put_i32::<T>(partition.committed_leader_epoch);
                buf.put_compact_str(partition.metadata);
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
pub struct OffsetCommitResponse {
    pub header: ResponseHeader,
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetCommitTopicResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitTopicResult {
    pub topic: String,
    pub partitions: Vec<OffsetCommitPartitionResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitPartitionResult {
    pub partition: i32,
    pub error_code: i16,
}

pub fn parse_offset_commit_response(input: &[u8]) -> Result<OffsetCommitResponse> {
    let (header, rest) = parse_header(input)?;
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
            let partition = read_i32(rest)?;
            rest = &rest[4..];
            let error_code = read_i16(rest)?;
            rest = &rest[2..];
            rest = skip_tagged_fields(rest)?;
            partitions.push(OffsetCommitPartitionResult { partition, error_code });
        }
        rest = skip_tagged_fields(rest)?;
        topics.push(OffsetCommitTopicResult {
            topic: name.unwrap_or_default(),
            partitions,
        });
    }

    Ok(OffsetCommitResponse {
        header,
        throttle_time_ms,
        topics,
    })
}

// ---- OffsetFetch ----

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
    /// `None` requests offsets for every partition the group has committed.
    pub topics: Option<Vec<OffsetFetchTopic>>,
    pub require_stable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchTopic {
    pub topic: String,
    pub partitions: Vec<i32>,
}

impl<'a> Encodable for OffsetFetchRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_compact_str(Some(self.group_id));
        match self.topics {
            None => ::protocol::varint::put_varint(dst, 0),
            Some(topics) => {
                dst.put_compact_array(topics, |buf, topic| {
                    buf.put_compact_str(Some(topic.topic));
                    buf.put_compact_array(topic.partitions, |buf, partition| {
                        buf.put_i32::<T>(partition);
                        Ok(())
                    })?;
                    buf.put_tagged_fields(&[]);
                    Ok(())
                })?;
            }
        }
        dst.put_u8(if self.require_stable { 1 } else { 0 });
        dst.put_tagged_fields(&[]);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchResponse {
    pub header: ResponseHeader,
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetFetchTopicResult>,
    pub error_code: i16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchTopicResult {
    pub topic: String,
    pub partitions: Vec<OffsetFetchPartitionResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchPartitionResult {
    pub partition: i32,
    pub committed_offset: i64,
    pub committed_leader_epoch: i32,
    pub metadata: Option<String>,
    pub error_code: i16,
}

pub fn parse_offset_fetch_response(input: &[u8]) -> Result<OffsetFetchResponse> {
    let (header, rest) = parse_header(input)?;
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
            let partition = read_i32(rest)?;
            rest = &rest[4..];
            let committed_offset = read_i64(rest)?;
            rest = &rest[8..];
            let committed_leader_epoch = read_i32(rest)?;
            rest = &rest[4..];
            let (metadata, r) = parse_compact_str(rest)?;
            rest = r;
            let error_code = read_i16(rest)?;
            rest = &rest[2..];
            rest = skip_tagged_fields(rest)?;
            partitions.push(OffsetFetchPartitionResult {
                partition,
                committed_offset,
                committed_leader_epoch,
                metadata,
                error_code,
            });
        }
        rest = skip_tagged_fields(rest)?;
        topics.push(OffsetFetchTopicResult {
            topic: name.unwrap_or_default(),
            partitions,
        });
    }

    let error_code = if rest.len() >= 2 { read_i16(rest)? } else { 0 };

    Ok(OffsetFetchResponse {
        header,
        throttle_time_ms,
        topics,
        error_code,
    })
}

fn parse_header(input: &[u8]) -> Result<(ResponseHeader, &[u8])> {
    match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => Ok((h, rest)),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    }
}

fn read_i32(input: &[u8]) -> Result<i32> {
    if input.len() < 4 {
        bail!(ErrorKind::CodecError("truncated i32".into()));
    }
    Ok(BigEndian::read_i32(&input[..4]))
}

fn read_i16(input: &[u8]) -> Result<i16> {
    if input.len() < 2 {
        bail!(ErrorKind::CodecError("truncated i16".into()));
    }
    Ok(BigEndian::read_i16(&input[..2]))
}

fn read_i64(input: &[u8]) -> Result<i64> {
    if input.len() < 8 {
        bail!(ErrorKind::CodecError("truncated i64".into()));
    }
    Ok(BigEndian::read_i64(&input[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_offset_commit_request() {
        let req = OffsetCommitRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::OffsetCommit as i16,
                api_version: 9,
                correlation_id: 1,
                client_id: Some("c".into()),
                flexible: true,
            },
            group_id: "g".to_owned(),
            generation_id: 1,
            member_id: "m1".to_owned(),
            group_instance_id: None,
            topics: vec![OffsetCommitTopic {
                topic: "orders".to_owned(),
                partitions: vec![OffsetCommitPartition {
                    partition: 0,
                    committed_offset: 42,
                    committed_leader_epoch: -1,
                    metadata: None,
                }],
            }],
        };
        let mut buf = BytesMut::with_capacity(128);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }

    #[test]
    fn encode_offset_fetch_request_all_topics() {
        let req = OffsetFetchRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::OffsetFetch as i16,
                api_version: 8,
                correlation_id: 1,
                client_id: None,
                flexible: true,
            },
            group_id: "g".to_owned(),
            topics: None,
            require_stable: true,
        };
        let mut buf = BytesMut::with_capacity(32);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }
}
