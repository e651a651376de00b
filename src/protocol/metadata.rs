//! Metadata request/response (apiKey 3, v12 — flexible, topic UUIDs),
//! built on the usual `protocol::metadata` shape (request/response
//! structs + `Encodable` + `named!` parser), generalized to the compact
//! encoding and UUID field v12 requires.

use bytes::{BigEndian, BufMut, ByteOrder, BytesMut};

use errors::Result;
use protocol::header::{parse_compact_array_len, parse_compact_str};
use protocol::{Encodable, RequestHeader, ResponseHeader, WriteExt};

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataRequest<'a> {
    pub header: RequestHeader<'a>,
    /// `None` requests metadata for all topics.
    pub topics: Option<Vec<String>>,
    pub allow_auto_topic_creation: bool,
}

impl<'a> Encodable for MetadataRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        encode_metadata_request::<T>(&self, dst)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataResponse {
    pub header: ResponseHeader,
    pub throttle_time_ms: i32,
    pub brokers: Vec<BrokerMetadata>,
    pub cluster_id: Option<String>,
    pub controller_id: i32,
    pub topics: Vec<TopicMetadata>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicMetadata {
    pub error_code: i16,
    pub name: String,
    pub topic_id: [u8; 16],
    pub is_internal: bool,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionMetadata {
    pub error_code: i16,
    pub partition_index: i32,
    pub leader_id: i32,
    pub leader_epoch: i32,
    pub replica_nodes: Vec<i32>,
    pub isr_nodes: Vec<i32>,
}

pub fn parse_metadata_response(input: &[u8]) -> Result<MetadataResponse> {
    let (header, rest) = {
        let header = ::protocol::parse_response_header(input);
        match header {
            ::nom::IResult::Done(rest, h) => (h, rest),
            _ => bail!(::errors::ErrorKind::CodecError("truncated response header".into())),
        }
    };
    let rest = ::protocol::skip_tagged_fields(rest)?;

    let throttle_time_ms = read_i32(rest)?;
    let rest = &rest[4..];

    let (broker_count, rest) = parse_compact_array_len(rest)?;
    let mut brokers = Vec::with_capacity(broker_count.unwrap_or(0));
    let mut rest = rest;
    for _ in 0..broker_count.unwrap_or(0) {
        let node_id = read_i32(rest)?;
        rest = &rest[4..];
        let (host, r) = parse_compact_str(rest)?;
        rest = r;
        let port = read_i32(rest)?;
        rest = &rest[4..];
        let (rack, r) = parse_compact_str(rest)?;
        rest = r;
        rest = ::protocol::skip_tagged_fields(rest)?;
        brokers.push(BrokerMetadata {
            node_id,
            host: host.unwrap_or_default(),
            port,
            rack,
        });
    }

    let (cluster_id, rest) = parse_compact_str(rest)?;
    let controller_id = read_i32(rest)?;
    let mut rest = &rest[4..];

    let (topic_count, r) = parse_compact_array_len(rest)?;
    rest = r;
    let mut topics = Vec::with_capacity(topic_count.unwrap_or(0));
    for _ in 0..topic_count.unwrap_or(0) {
        let error_code = read_i16(rest)?;
        rest = &rest[2..];
        let (name, r) = parse_compact_str(rest)?;
        rest = r;
        if rest.len() < 16 {
            bail!(::errors::ErrorKind::CodecError("truncated topic uuid".into()));
        }
        let mut topic_id = [0u8; 16];
        topic_id.copy_from_slice(&rest[..16]);
        rest = &rest[16..];
        let is_internal = rest[0] != 0;
        rest = &rest[1..];

        let (partition_count, r) = parse_compact_array_len(rest)?;
        rest = r;
        let mut partitions = Vec::with_capacity(partition_count.unwrap_or(0));
        for _ in 0..partition_count.unwrap_or(0) {
            let perr = read_i16(rest)?;
            rest = &rest[2..];
            let partition_index = read_i32(rest)?;
            rest = &rest[4..];
            let leader_id = read_i32(rest)?;
            rest = &rest[4..];
            let leader_epoch = read_i32(rest)?;
            rest = &rest[4..];

            let (replica_count, r) = parse_compact_array_len(rest)?;
            rest = r;
            let mut replica_nodes = Vec::with_capacity(replica_count.unwrap_or(0));
            for _ in 0..replica_count.unwrap_or(0) {
                replica_nodes.push(read_i32(rest)?);
                rest = &rest[4..];
            }

            let (isr_count, r) = parse_compact_array_len(rest)?;
            rest = r;
            let mut isr_nodes = Vec::with_capacity(isr_count.unwrap_or(0));
            for _ in 0..isr_count.unwrap_or(0) {
                isr_nodes.push(read_i32(rest)?);
                rest = &rest[4..];
            }

            let (offline_count, r) = parse_compact_array_len(rest)?;
            rest = r;
            for _ in 0..offline_count.unwrap_or(0) {
                rest = &rest[4..];
            }
            rest = ::protocol::skip_tagged_fields(rest)?;

            partitions.push(PartitionMetadata {
                error_code: perr,
                partition_index,
                leader_id,
                leader_epoch,
                replica_nodes,
                isr_nodes,
            });
        }

        rest = ::protocol::skip_tagged_fields(rest)?;

        topics.push(TopicMetadata {
            error_code,
            name: name.unwrap_or_default(),
            topic_id,
            is_internal,
            partitions,
        });
    }

    Ok(MetadataResponse {
        header,
        throttle_time_ms,
        brokers,
        cluster_id,
        controller_id,
        topics,
    })
}

fn read_i32(input: &[u8]) -> Result<i32> {
    if input.len() < 4 {
        bail!(::errors::ErrorKind::CodecError("truncated i32".into()));
    }
    Ok(BigEndian::read_i32(&input[..4]))
}

fn read_i16(input: &[u8]) -> Result<i16> {
    if input.len() < 2 {
        bail!(::errors::ErrorKind::CodecError("truncated i16".into()));
    }
    Ok(BigEndian::read_i16(&input[..2]))
}

/// Encodes the request body (separate from the `Encodable` impl above,
/// which only needs to special-case the null-topics marker once): writes
/// the compact topics array (by name, per v12 — no topic-id lookup path),
/// `allowAutoTopicCreation`, and an empty tagged-fields tail.
pub fn encode_metadata_request<T: ByteOrder>(req: &MetadataRequest, dst: &mut BytesMut) -> Result<()> {
    match &req.topics {
        None => ::protocol::varint::put_varint(dst, 0), // compact null array
        Some(names) => {
            dst.put_compact_array(names.iter().cloned(), |buf, name| {
                buf.put_compact_str(Some(name));
                buf.put_tagged_fields(&[]);
                Ok(())
            })?;
        }
    }
    dst.put_u8(if req.allow_auto_topic_creation { 1 } else { 0 });
    dst.put_tagged_fields(&[]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BigEndian;

    #[test]
    fn encode_request_with_no_topics_is_null_array() {
        let req = MetadataRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::Metadata as i16,
                api_version: 12,
                correlation_id: 1,
                client_id: Some("c".into()),
                flexible: true,
            },
            topics: None,
            allow_auto_topic_creation: true,
        };
        let mut buf = BytesMut::with_capacity(64);
        encode_metadata_request::<BigEndian>(&req, &mut buf).unwrap();
        // compact null array is a single zero byte
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn encode_request_with_topics() {
        let req = MetadataRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::Metadata as i16,
                api_version: 12,
                correlation_id: 1,
                client_id: None,
                flexible: true,
            },
            topics: Some(vec!["orders".to_owned()]),
            allow_auto_topic_creation: false,
        };
        let mut buf = BytesMut::with_capacity(64);
        encode_metadata_request::<BigEndian>(&req, &mut buf).unwrap();
        assert_eq!(buf[0], 2); // len+1 == 2 topics, 1 entry
    }
}
