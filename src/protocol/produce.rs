//! Produce request/response (apiKey 0, versions 7/10/11 — v10+ flexible),
//! built on the usual `protocol::produce` struct/`Encodable` shape,
//! generalized to carry a pre-built `RecordBatch` payload instead of
//! a `MessageSet`.

use bytes::{BigEndian, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::header::{parse_compact_array_len, parse_compact_str};
use protocol::{skip_tagged_fields, Encodable, RequestHeader, ResponseHeader, WriteExt};

#[derive(Clone, Debug, PartialEq)]
pub struct ProduceRequest<'a> {
    pub header: RequestHeader<'a>,
    pub transactional_id: Option<String>,
    pub acks: i16,
    pub timeout_ms: i32,
    pub topics: Vec<ProduceTopicData>,
    pub flexible: bool,
}

impl<'a> ProduceRequest<'a> {
    pub fn new(
        header: RequestHeader<'a>,
        transactional_id: Option<String>,
        acks: i16,
        timeout_ms: i32,
        topics: Vec<ProduceTopicData>,
        flexible: bool,
    ) -> Self {
        ProduceRequest {
            header,
            transactional_id,
            acks,
            timeout_ms,
            topics,
            flexible,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProduceTopicData {
    pub topic: String,
    pub partitions: Vec<ProducePartitionData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProducePartitionData {
    pub partition: i32,
    /// Pre-built `RecordBatch` wire bytes (see `protocol::record_batch`).
    pub record_batch: Vec<u8>,
}

impl<'a> Encodable for ProduceRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        if self.flexible {
            dst.put_compact_str(self.transactional_id.as_ref());
            dst.put_i16::<T>(self.acks);
            dst.put_i32::<T>(self.timeout_ms);
            dst.put_compact_array(self.topics, |buf, topic| {
                buf.put_compact_str(Some(topic.topic));
                buf.put_compact_array(topic.partitions, |buf, partition| {
                    buf.put_i32::<T>(partition.partition);
                    buf.put_compact_bytes(Some(partition.record_batch));
                    buf.put_tagged_fields(&[]);
                    Ok(())
                })?;
                buf.put_tagged_fields(&[]);
                Ok(())
            })?;
            dst.put_tagged_fields(&[]);
        } else {
            dst.put_str::<T, _>(self.transactional_id)?;
            dst.put_i16::<T>(self.acks);
            dst.put_i32::<T>(self.timeout_ms);
            dst.put_array::<T, _, _>(self.topics, |buf, topic| {
                buf.put_str::<T, _>(Some(topic.topic))?;
                buf.put_array::<T, _, _>(topic.partitions, |buf, partition| {
                    buf.put_i32::<T>(partition.partition);
                    buf.put_bytes::<T, _>(Some(partition.record_batch))
                })
            })?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProduceResponse {
    pub header: ResponseHeader,
    pub topics: Vec<ProduceTopicResult>,
    pub throttle_time_ms: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProduceTopicResult {
    pub topic: String,
    pub partitions: Vec<ProducePartitionResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProducePartitionResult {
    pub partition: i32,
    pub error_code: i16,
    pub base_offset: i64,
    pub log_append_time_ms: i64,
}

pub fn parse_produce_response(input: &[u8], flexible: bool) -> Result<ProduceResponse> {
    let (header, mut rest) = match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => (h, rest),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    };
    if flexible {
        rest = skip_tagged_fields(rest)?;
    }

    let mut topics = Vec::new();
    if flexible {
        let (topic_count, r) = parse_compact_array_len(rest)?;
        rest = r;
        for _ in 0..topic_count.unwrap_or(0) {
            let (name, r) = parse_compact_str(rest)?;
            rest = r;
            let (partition_count, r) = parse_compact_array_len(rest)?;
            rest = r;
            let mut partitions = Vec::with_capacity(partition_count.unwrap_or(0));
            for _ in 0..partition_count.unwrap_or(0) {
                let (partition, error_code, base_offset, log_append_time_ms, r) = read_partition_result(rest)?;
                rest = skip_tagged_fields(r)?;
                partitions.push(ProducePartitionResult {
                    partition,
                    error_code,
                    base_offset,
                    log_append_time_ms,
                });
            }
            rest = skip_tagged_fields(rest)?;
            topics.push(ProduceTopicResult {
                topic: name.unwrap_or_default(),
                partitions,
            });
        }
    } else {
        let topic_count = read_i32(rest)?;
        rest = &rest[4..];
        for _ in 0..topic_count {
            match ::protocol::parse_string(rest) {
                ::nom::IResult::Done(r, name) => {
                    rest = r;
                    let partition_count = read_i32(rest)?;
                    rest = &rest[4..];
                    let mut partitions = Vec::with_capacity(partition_count as usize);
                    for _ in 0..partition_count {
                        let (partition, error_code, base_offset, log_append_time_ms, r) = read_partition_result(rest)?;
                        rest = r;
                        partitions.push(ProducePartitionResult {
                            partition,
                            error_code,
                            base_offset,
                            log_append_time_ms,
                        });
                    }
                    topics.push(ProduceTopicResult { topic: name, partitions });
                }
                _ => bail!(ErrorKind::CodecError("truncated produce response topic".into())),
            }
        }
    }

    let throttle_time_ms = if rest.len() >= 4 { read_i32(rest)? } else { 0 };

    Ok(ProduceResponse {
        header,
        topics,
        throttle_time_ms,
    })
}

fn read_partition_result(input: &[u8]) -> Result<(i32, i16, i64, i64, &[u8])> {
    if input.len() < 22 {
        bail!(ErrorKind::CodecError("truncated produce partition result".into()));
    }
    let partition = BigEndian::read_i32(&input[0..4]);
    let error_code = BigEndian::read_i16(&input[4..6]);
    let base_offset = BigEndian::read_i64(&input[6..14]);
    let log_append_time_ms = BigEndian::read_i64(&input[14..22]);
    Ok((partition, error_code, base_offset, log_append_time_ms, &input[22..]))
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
    fn encode_flexible_request_smoke() {
        let req = ProduceRequest::new(
            RequestHeader {
                api_key: ::protocol::ApiKeys::Produce as i16,
                api_version: 11,
                correlation_id: 7,
                client_id: Some("p".into()),
                flexible: true,
            },
            None,
            -1,
            5000,
            vec![ProduceTopicData {
                topic: "orders".to_owned(),
                partitions: vec![ProducePartitionData {
                    partition: 0,
                    record_batch: vec![1, 2, 3],
                }],
            }],
            true,
        );
        let mut buf = BytesMut::with_capacity(128);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }
}
