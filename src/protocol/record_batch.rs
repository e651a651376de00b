//! The magic-2 `RecordBatch` container, replacing the older magic
//! 0/1 `Message`/`MessageSet` (`protocol::message`, since removed). Built
//! the usual way: reserve a length/CRC slot in a `BytesMut`, write the
//! body, patch the slot — but with CRC32-C (Castagnoli) instead of
//! CRC32 IEEE, and varint-encoded record fields instead of fixed-width
//! ones.

use bytes::{BigEndian, ByteOrder, BytesMut};
use crc::{Crc, CRC_32_ISCSI};

use compression::Compression;
use errors::{ErrorKind, Result};
use protocol::varint::{parse_varint, parse_varint_zigzag, parse_varlong_zigzag, put_varint,
                        put_varint_zigzag, put_varlong_zigzag};

const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

const ATTR_COMPRESSION_MASK: i16 = 0x07;
const ATTR_TRANSACTIONAL: i16 = 1 << 4;
const ATTR_CONTROL: i16 = 1 << 5;

const RECORD_BATCH_HEADER_LEN: usize = 61;

pub const NO_PRODUCER_ID: i64 = -1;
pub const NO_PRODUCER_EPOCH: i16 = -1;
pub const NO_SEQUENCE: i32 = -1;

#[derive(Clone, Debug, PartialEq)]
pub struct RecordHeader {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// One record as handed to `RecordBatch::build`. `offset_delta` and
/// `timestamp_delta` are computed from this record's position and
/// `timestamp` — callers supply absolute timestamps, not deltas.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub timestamp: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Vec<RecordHeader>,
}

impl Record {
    pub fn new(timestamp: i64, key: Option<Vec<u8>>, value: Option<Vec<u8>>) -> Self {
        Record {
            timestamp,
            key,
            value,
            headers: Vec::new(),
        }
    }
}

/// A decoded record, reconstructed with an absolute timestamp and offset
/// (`base_offset + offset_delta`) rather than the wire deltas.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedRecord {
    pub offset: i64,
    pub timestamp: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Vec<RecordHeader>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordBatch {
    pub base_offset: i64,
    pub partition_leader_epoch: i32,
    pub compression: Compression,
    pub is_transactional: bool,
    pub is_control: bool,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub records: Vec<DecodedRecord>,
}

/// Inputs to `RecordBatch::build` — a batch's worth of messages already
/// routed to one partition, plus the idempotent-producer fields if any.
#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    pub compression: Compression,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub is_transactional: bool,
}

impl RecordBatch {
    /// Builds the on-wire bytes for `records`: CRC, length, and varint
    /// header fields are all computed and patched in here.
    /// `baseOffset` is always written as `0`; the broker reassigns offsets
    /// on append, but the field must still be present.
    pub fn build(records: &[Record], opts: &BatchOptions) -> Result<BytesMut> {
        if records.is_empty() {
            bail!(ErrorKind::UserError("record batch must have at least one record".into()));
        }

        let first_timestamp = records.iter().map(|r| r.timestamp).min().unwrap();
        let max_timestamp = records.iter().map(|r| r.timestamp).max().unwrap();
        let last_offset_delta = (records.len() - 1) as i32;

        let mut body = BytesMut::with_capacity(records.iter().map(record_size_hint).sum());
        for (index, record) in records.iter().enumerate() {
            encode_record(&mut body, record, index as i32, first_timestamp)?;
        }

        let mut attributes = opts.compression as i16 & ATTR_COMPRESSION_MASK;
        let payload = if opts.compression == Compression::None {
            body.to_vec()
        } else {
            opts.compression.compress(&body)?
        };
        if opts.is_transactional {
            attributes |= ATTR_TRANSACTIONAL;
        }

        let mut buf = BytesMut::with_capacity(RECORD_BATCH_HEADER_LEN + payload.len());
        buf.put_i64::<BigEndian>(0); // baseOffset
        let length_pos = buf.len();
        buf.put_i32::<BigEndian>(0); // batchLength, patched below
        buf.put_i32::<BigEndian>(0); // partitionLeaderEpoch
        buf.put_i8(2); // magic
        let crc_pos = buf.len();
        buf.put_i32::<BigEndian>(0); // crc32c, patched below
        buf.put_i16::<BigEndian>(attributes);
        buf.put_i32::<BigEndian>(last_offset_delta);
        buf.put_i64::<BigEndian>(first_timestamp);
        buf.put_i64::<BigEndian>(max_timestamp);
        buf.put_i64::<BigEndian>(opts.producer_id);
        buf.put_i16::<BigEndian>(opts.producer_epoch);
        buf.put_i32::<BigEndian>(opts.base_sequence);
        buf.put_i32::<BigEndian>(records.len() as i32);
        buf.extend_from_slice(&payload);

        let batch_length = (buf.len() - length_pos - 4) as i32;
        BigEndian::write_i32(&mut buf[length_pos..length_pos + 4], batch_length);

        let crc = CASTAGNOLI.checksum(&buf[crc_pos + 4..]);
        BigEndian::write_i32(&mut buf[crc_pos..crc_pos + 4], crc as i32);

        Ok(buf)
    }

    /// Parses one batch from `input`, validating its CRC. Returns the
    /// decoded batch and the remaining input after it.
    pub fn parse(input: &[u8]) -> Result<(RecordBatch, &[u8])> {
        if input.len() < RECORD_BATCH_HEADER_LEN {
            bail!(ErrorKind::CodecError("truncated record batch header".into()));
        }

        let base_offset = BigEndian::read_i64(&input[0..8]);
        let batch_length = BigEndian::read_i32(&input[8..12]) as usize;
        let partition_leader_epoch = BigEndian::read_i32(&input[12..16]);
        let magic = input[16] as i8;
        if magic != 2 {
            bail!(ErrorKind::CodecError(format!("unsupported record batch magic {}", magic)));
        }
        let crc = BigEndian::read_u32(&input[17..21]);
        let attributes = BigEndian::read_i16(&input[21..23]);
        let _last_offset_delta = BigEndian::read_i32(&input[23..27]);
        let first_timestamp = BigEndian::read_i64(&input[27..35]);
        let _max_timestamp = BigEndian::read_i64(&input[35..43]);
        let producer_id = BigEndian::read_i64(&input[43..51]);
        let producer_epoch = BigEndian::read_i16(&input[51..53]);
        let base_sequence = BigEndian::read_i32(&input[53..57]);
        let record_count = BigEndian::read_i32(&input[57..61]);

        let total_len = 12 + batch_length;
        if input.len() < total_len {
            bail!(ErrorKind::CodecError("truncated record batch body".into()));
        }

        let computed = CASTAGNOLI.checksum(&input[21..total_len]);
        if computed != crc {
            bail!(ErrorKind::CodecError("batch crc mismatch".into()));
        }

        let payload = &input[RECORD_BATCH_HEADER_LEN..total_len];
        let compression = Compression::from_attributes(attributes)?;
        let owned_decompressed;
        let records_bytes: &[u8] = if compression == Compression::None {
            payload
        } else {
            owned_decompressed = compression.decompress(payload)?;
            &owned_decompressed
        };

        let records = decode_records(records_bytes, record_count, base_offset, first_timestamp)?;

        Ok((
            RecordBatch {
                base_offset,
                partition_leader_epoch,
                compression,
                is_transactional: attributes & ATTR_TRANSACTIONAL != 0,
                is_control: attributes & ATTR_CONTROL != 0,
                producer_id,
                producer_epoch,
                base_sequence,
                records,
            },
            &input[total_len..],
        ))
    }
}

fn record_size_hint(r: &Record) -> usize {
    16 + r.key.as_ref().map_or(0, |k| k.len()) + r.value.as_ref().map_or(0, |v| v.len())
}

fn encode_record(dst: &mut BytesMut, record: &Record, offset_delta: i32, first_timestamp: i64) -> Result<()> {
    let mut body = BytesMut::with_capacity(record_size_hint(record));
    body.put_i8(0); // attributes, reserved
    put_varlong_zigzag(&mut body, record.timestamp - first_timestamp);
    put_varint_zigzag(&mut body, offset_delta);
    encode_opt_bytes(&mut body, record.key.as_ref().map(|v| v.as_slice()));
    encode_opt_bytes(&mut body, record.value.as_ref().map(|v| v.as_slice()));
    put_varint(&mut body, record.headers.len() as u64);
    for header in &record.headers {
        let key_bytes = header.key.as_bytes();
        put_varint_zigzag(&mut body, key_bytes.len() as i32);
        body.extend_from_slice(key_bytes);
        encode_opt_bytes(&mut body, header.value.as_ref().map(|v| v.as_slice()));
    }

    put_varint_zigzag(dst, body.len() as i32);
    dst.extend_from_slice(&body);
    Ok(())
}

fn encode_opt_bytes(dst: &mut BytesMut, value: Option<&[u8]>) {
    match value {
        None => put_varint_zigzag(dst, -1),
        Some(bytes) => {
            put_varint_zigzag(dst, bytes.len() as i32);
            dst.extend_from_slice(bytes);
        }
    }
}

fn decode_records(input: &[u8], count: i32, base_offset: i64, first_timestamp: i64) -> Result<Vec<DecodedRecord>> {
    let mut rest = input;
    let mut records = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let (record, remaining) = decode_record(rest, base_offset, first_timestamp)?;
        records.push(record);
        rest = remaining;
    }
    Ok(records)
}

fn decode_record(input: &[u8], base_offset: i64, first_timestamp: i64) -> Result<(DecodedRecord, &[u8])> {
    let (length, consumed) = read_zigzag(input)?;
    let mut rest = &input[consumed..];
    if length < 0 || rest.len() < length as usize {
        bail!(ErrorKind::CodecError("truncated record".into()));
    }
    let body = &rest[..length as usize];
    rest = &rest[length as usize..];

    let mut cursor = &body[1..]; // skip reserved attributes byte

    let (timestamp_delta, n) = parse_varlong(cursor)?;
    cursor = &cursor[n..];
    let (offset_delta, n) = read_zigzag(cursor)?;
    cursor = &cursor[n..];
    let (key, n) = decode_opt_bytes(cursor)?;
    cursor = &cursor[n..];
    let (value, n) = decode_opt_bytes(cursor)?;
    cursor = &cursor[n..];
    let (header_count, n) = read_unsigned(cursor)?;
    cursor = &cursor[n..];

    let mut headers = Vec::with_capacity(header_count as usize);
    for _ in 0..header_count {
        let (key_len, n) = read_zigzag(cursor)?;
        cursor = &cursor[n..];
        if key_len < 0 || cursor.len() < key_len as usize {
            bail!(ErrorKind::CodecError("truncated record header key".into()));
        }
        let key = ::std::str::from_utf8(&cursor[..key_len as usize])
            .map_err(|_| ErrorKind::CodecError("record header key is not utf8".into()))?
            .to_owned();
        cursor = &cursor[key_len as usize..];
        let (value, n) = decode_opt_bytes(cursor)?;
        cursor = &cursor[n..];
        headers.push(RecordHeader { key, value });
    }

    Ok((
        DecodedRecord {
            offset: base_offset + offset_delta as i64,
            timestamp: first_timestamp + timestamp_delta,
            key,
            value,
            headers,
        },
        rest,
    ))
}

fn decode_opt_bytes(input: &[u8]) -> Result<(Option<Vec<u8>>, usize)> {
    let (len, consumed) = read_zigzag(input)?;
    if len < 0 {
        return Ok((None, consumed));
    }
    let len = len as usize;
    if input.len() - consumed < len {
        bail!(ErrorKind::CodecError("truncated record field".into()));
    }
    Ok((Some(input[consumed..consumed + len].to_vec()), consumed + len))
}

fn read_unsigned(input: &[u8]) -> Result<(u64, usize)> {
    match parse_varint(input) {
        ::nom::IResult::Done(rest, v) => Ok((v, input.len() - rest.len())),
        _ => bail!(ErrorKind::CodecError("truncated varint".into())),
    }
}

fn read_zigzag(input: &[u8]) -> Result<(i32, usize)> {
    match parse_varint_zigzag(input) {
        ::nom::IResult::Done(rest, v) => Ok((v, input.len() - rest.len())),
        _ => bail!(ErrorKind::CodecError("truncated zigzag varint".into())),
    }
}

fn parse_varlong(input: &[u8]) -> Result<(i64, usize)> {
    match parse_varlong_zigzag(input) {
        ::nom::IResult::Done(rest, v) => Ok((v, input.len() - rest.len())),
        _ => bail!(ErrorKind::CodecError("truncated zigzag varlong".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(timestamp: i64, value: &str) -> Record {
        Record::new(timestamp, None, Some(value.as_bytes().to_vec()))
    }

    #[test]
    fn build_and_parse_round_trip_uncompressed() {
        let records = vec![sample_record(1_000, "hello"), sample_record(1_010, "world")];
        let opts = BatchOptions {
            compression: Compression::None,
            producer_id: NO_PRODUCER_ID,
            producer_epoch: NO_PRODUCER_EPOCH,
            base_sequence: NO_SEQUENCE,
            is_transactional: false,
        };
        let buf = RecordBatch::build(&records, &opts).unwrap();
        let (decoded, rest) = RecordBatch::parse(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].value.as_ref().map(|v| v.as_slice()), Some(b"hello".as_ref()));
        assert_eq!(decoded.records[1].value.as_ref().map(|v| v.as_slice()), Some(b"world".as_ref()));
        assert_eq!(decoded.records[0].timestamp, 1_000);
        assert_eq!(decoded.records[1].timestamp, 1_010);
        assert_eq!(decoded.records[0].offset, 0);
        assert_eq!(decoded.records[1].offset, 1);
        assert_eq!(decoded.producer_id, NO_PRODUCER_ID);
    }

    #[test]
    fn build_and_parse_round_trip_gzip() {
        let records = vec![sample_record(0, "compressible compressible compressible")];
        let opts = BatchOptions {
            compression: Compression::Gzip,
            ..Default::default()
        };
        let buf = RecordBatch::build(&records, &opts).unwrap();
        let (decoded, _rest) = RecordBatch::parse(&buf).unwrap();
        assert_eq!(decoded.compression, Compression::Gzip);
        assert_eq!(
            decoded.records[0].value.as_ref().map(|v| v.as_slice()),
            Some(b"compressible compressible compressible".as_ref())
        );
    }

    #[test]
    fn parse_rejects_corrupted_crc() {
        let records = vec![sample_record(0, "x")];
        let opts = BatchOptions::default();
        let mut buf = RecordBatch::build(&records, &opts).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xff;
        match RecordBatch::parse(&buf) {
            Err(::errors::Error(::errors::ErrorKind::CodecError(ref msg), _)) => {
                assert!(msg.contains("crc"));
            }
            other => panic!("expected crc mismatch, got {:?}", other),
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(RecordBatch::build(&[], &BatchOptions::default()).is_err());
    }

    #[test]
    fn headers_round_trip() {
        let mut record = sample_record(5, "v");
        record.headers.push(RecordHeader {
            key: "trace-id".to_owned(),
            value: Some(b"abc123".to_vec()),
        });
        let buf = RecordBatch::build(&[record], &BatchOptions::default()).unwrap();
        let (decoded, _) = RecordBatch::parse(&buf).unwrap();
        assert_eq!(decoded.records[0].headers.len(), 1);
        assert_eq!(decoded.records[0].headers[0].key, "trace-id");
        assert_eq!(decoded.records[0].headers[0].value.as_ref().map(|v| v.as_slice()), Some(b"abc123".as_ref()));
    }
}
