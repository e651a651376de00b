//! InitProducerId (apiKey 22, v5, flexible) — fetches the producer id and
//! epoch an idempotent/transactional producer stamps onto every
//! `RecordBatch` it sends, the idempotent-producer handshake.

use bytes::{BigEndian, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::{skip_tagged_fields, Encodable, RequestHeader, ResponseHeader, WriteExt};

#[derive(Clone, Debug, PartialEq)]
pub struct InitProducerIdRequest<'a> {
    pub header: RequestHeader<'a>,
    pub transactional_id: Option<String>,
    pub transaction_timeout_ms: i32,
    pub producer_id: i64,
    pub producer_epoch: i16,
}

impl<'a> Encodable for InitProducerIdRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_compact_str(self.transactional_id);
        dst.put_i32::<T>(self.transaction_timeout_ms);
        dst.put_i64::<T>(self.producer_id);
        dst.put_i16::<T>(self.producer_epoch);
        dst.put_tagged_fields(&[]);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InitProducerIdResponse {
    pub header: ResponseHeader,
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub producer_id: i64,
    pub producer_epoch: i16,
}

pub fn parse_init_producer_id_response(input: &[u8]) -> Result<InitProducerIdResponse> {
    let (header, rest) = match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => (h, rest),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    };
    let mut rest = skip_tagged_fields(rest)?;

    let throttle_time_ms = read_i32(rest)?;
    rest = &rest[4..];
    let error_code = read_i16(rest)?;
    rest = &rest[2..];
    let producer_id = read_i64(rest)?;
    rest = &rest[8..];
    let producer_epoch = read_i16(rest)?;
    let _rest = skip_tagged_fields(&rest[2..])?;

    Ok(InitProducerIdResponse {
        header,
        throttle_time_ms,
        error_code,
        producer_id,
        producer_epoch,
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
        let req = InitProducerIdRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::InitProducerId as i16,
                api_version: 5,
                correlation_id: 1,
                client_id: Some("c".into()),
                flexible: true,
            },
            transactional_id: None,
            transaction_timeout_ms: 60_000,
            producer_id: -1,
            producer_epoch: -1,
        };
        let mut buf = BytesMut::with_capacity(64);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }
}
