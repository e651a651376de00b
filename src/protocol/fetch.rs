//! Fetch request/response (apiKey 1, current flexible versions),
//! built on the usual `protocol::fetch` struct/`Encodable` shape,
//! generalized to flexible encoding and a `RecordBatch`-bearing response
//! (replacing a `MessageSet`). Carries the isolation level for
//! read-committed/uncommitted consumption.

use bytes::{BigEndian, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::header::{parse_compact_array_len, parse_compact_str};
use protocol::{skip_tagged_fields, Encodable, RequestHeader, ResponseHeader, WriteExt};

/// `0` = read_uncommitted, `1` = read_committed.
pub const ISOLATION_READ_UNCOMMITTED: i8 = 0;
pub const ISOLATION_READ_COMMITTED: i8 = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest<'a> {
    pub header: RequestHeader<'a>,
    pub replica_id: i32,
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub session_id: i32,
    pub session_epoch: i32,
    pub topics: Vec<FetchTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchTopic {
    pub topic: String,
    pub partitions: Vec<FetchPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchPartition {
    pub partition: i32,
    pub current_leader_epoch: i32,
    pub fetch_offset: i64,
    pub partition_max_bytes: i32,
}

impl<'a> Encodable for FetchRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_i32::<T>(self.replica_id);
        dst.put_i32::<T>(self.max_wait_ms);
        dst.put_i32::<T>(self.min_bytes);
        dst.put_i32::<T>(self.max_bytes);
        dst.put_i8(self.isolation_level);
        dst.put_i32::<T>(self.session_id);
        dst.put_i32::<T>(self.session_epoch);
        dst.put_compact_array(self.topics, |buf, topic| {
            buf.put_compact_str(Some(topic.topic));
            buf.put_compact_array(topic.partitions, |buf, partition| {
                buf.put_i32::<T>(partition.partition);
                buf.put_i32::<T>(partition.current_leader_epoch);
                buf.put_i64::<T>(partition.fetch_offset);
                buf.put_i32::<T>(-1); // lastFetchedEpoch, unused (no epoch tracking)
                buf.put_i32::<T>(partition.partition_max_bytes);
                buf.put_tagged_fields(&[]);
                Ok(())
            })?;
            buf.put_tagged_fields(&[]);
            Ok(())
        })?;
        dst.put_compact_array(Vec::<i32>::new(), |_, _: i32| Ok(()))?; // forgottenTopicsData, always empty
        dst.put_compact_str(None::<&str>); // rackId
        dst.put_tagged_fields(&[]);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchResponse {
    pub header: ResponseHeader,
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub session_id: i32,
    pub topics: Vec<FetchTopicData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchTopicData {
    pub topic: String,
    pub partitions: Vec<FetchPartitionData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchPartitionData {
    pub partition: i32,
    pub error_code: i16,
    pub high_watermark: i64,
    pub last_stable_offset: i64,
    pub log_start_offset: i64,
    /// Raw `RecordBatch` bytes for this partition; the caller decodes them
    /// via `record_batch::RecordBatch::parse` one batch at a time.
    pub records: Option<Vec<u8>>,
}

pub fn parse_fetch_response(input: &[u8]) -> Result<FetchResponse> {
    let (header, rest) = match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => (h, rest),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    };
    let mut rest = skip_tagged_fields(rest)?;

    let throttle_time_ms = read_i32(rest)?;
    rest = &rest[4..];
    let error_code = read_i16(rest)?;
    rest = &rest[2..];
    let session_id = read_i32(rest)?;
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
            let perr = read_i16(rest)?;
            rest = &rest[2..];
            let high_watermark = read_i64(rest)?;
            rest = &rest[8..];
            let last_stable_offset = read_i64(rest)?;
            rest = &rest[8..];
            let log_start_offset = read_i64(rest)?;
            rest = &rest[8..];

            let (aborted_count, r) = parse_compact_array_len(rest)?;
            rest = r;
            for _ in 0..aborted_count.unwrap_or(0) {
                if rest.len() < 16 {
                    bail!(ErrorKind::CodecError("truncated aborted transaction entry".into()));
                }
                rest = &rest[16..]; // producerId(8) + firstOffset(8)
                rest = skip_tagged_fields(rest)?;
            }

            let preferred_read_replica = read_i32(rest)?;
            let _ = preferred_read_replica;
            rest = &rest[4..];

            let (records, r) = ::protocol::parse_compact_bytes(rest)?;
            rest = r;
            rest = skip_tagged_fields(rest)?;

            partitions.push(FetchPartitionData {
                partition,
                error_code: perr,
                high_watermark,
                last_stable_offset,
                log_start_offset,
                records,
            });
        }
        rest = skip_tagged_fields(rest)?;
        topics.push(FetchTopicData {
            topic: name.unwrap_or_default(),
            partitions,
        });
    }

    Ok(FetchResponse {
        header,
        throttle_time_ms,
        error_code,
        session_id,
        topics,
    })
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
    fn encode_request_smoke() {
        let req = FetchRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::Fetch as i16,
                api_version: 16,
                correlation_id: 1,
                client_id: Some("c".into()),
                flexible: true,
            },
            replica_id: -1,
            max_wait_ms: 500,
            min_bytes: 1,
            max_bytes: 1 << 20,
            isolation_level: ISOLATION_READ_COMMITTED,
            session_id: 0,
            session_epoch: -1,
            topics: vec![FetchTopic {
                topic: "orders".to_owned(),
                partitions: vec![FetchPartition {
                    partition: 0,
                    current_leader_epoch: -1,
                    fetch_offset: 0,
                    partition_max_bytes: 1 << 16,
                }],
            }],
        };
        let mut buf = BytesMut::with_capacity(128);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }
}
