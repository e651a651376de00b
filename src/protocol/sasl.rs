//! SASL authentication: `SaslHandshake` (apiKey 17, v1 — legacy encoding,
//! predates the flexible-version convention) and `SaslAuthenticate`
//! (apiKey 36, v2, flexible). Uses the legacy `put_str`/`put_bytes` path
//! for the handshake and the compact path used elsewhere for the
//! authenticate exchange, matching each call's own flexibility version.

use bytes::{BigEndian, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::header::parse_compact_str;
use protocol::{skip_tagged_fields, Encodable, RequestHeader, ResponseHeader, WriteExt};

#[derive(Clone, Debug, PartialEq)]
pub struct SaslHandshakeRequest<'a> {
    pub header: RequestHeader<'a>,
    pub mechanism: String,
}

impl<'a> Encodable for SaslHandshakeRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_str::<T, _>(Some(self.mechanism))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaslHandshakeResponse {
    pub header: ResponseHeader,
    pub error_code: i16,
    pub enabled_mechanisms: Vec<String>,
}

pub fn parse_sasl_handshake_response(input: &[u8]) -> Result<SaslHandshakeResponse> {
    let (header, rest) = match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => (h, rest),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    };
    let error_code = read_i16(rest)?;
    let mut rest = &rest[2..];
    let count = read_i32(rest)?;
    rest = &rest[4..];
    let mut enabled_mechanisms = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match ::protocol::parse_string(rest) {
            ::nom::IResult::Done(r, s) => {
                rest = r;
                enabled_mechanisms.push(s);
            }
            _ => bail!(ErrorKind::CodecError("truncated sasl mechanism".into())),
        }
    }

    Ok(SaslHandshakeResponse {
        header,
        error_code,
        enabled_mechanisms,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaslAuthenticateRequest<'a> {
    pub header: RequestHeader<'a>,
    pub auth_bytes: Vec<u8>,
}

impl<'a> Encodable for SaslAuthenticateRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_compact_bytes(Some(self.auth_bytes));
        dst.put_tagged_fields(&[]);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaslAuthenticateResponse {
    pub header: ResponseHeader,
    pub error_code: i16,
    pub error_message: Option<String>,
    pub auth_bytes: Vec<u8>,
    pub session_lifetime_ms: i64,
}

pub fn parse_sasl_authenticate_response(input: &[u8]) -> Result<SaslAuthenticateResponse> {
    let (header, rest) = match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => (h, rest),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    };
    let mut rest = skip_tagged_fields(rest)?;
    let error_code = read_i16(rest)?;
    rest = &rest[2..];
    let (error_message, r) = parse_compact_str(rest)?;
    rest = r;
    let (auth_bytes, r) = ::protocol::parse_compact_bytes(rest)?;
    rest = r;
    let session_lifetime_ms = read_i64(rest)?;
    let _rest = skip_tagged_fields(&rest[8..])?;

    Ok(SaslAuthenticateResponse {
        header,
        error_code,
        error_message,
        auth_bytes: auth_bytes.unwrap_or_default(),
        session_lifetime_ms,
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
    fn encode_handshake_request() {
        let req = SaslHandshakeRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::SaslHandshake as i16,
                api_version: 1,
                correlation_id: 1,
                client_id: Some("c".into()),
                flexible: false,
            },
            mechanism: "PLAIN".to_owned(),
        };
        let mut buf = BytesMut::with_capacity(32);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }

    #[test]
    fn encode_authenticate_request() {
        let req = SaslAuthenticateRequest {
            header: RequestHeader {
                api_key: ::protocol::ApiKeys::SaslAuthenticate as i16,
                api_version: 2,
                correlation_id: 1,
                client_id: Some("c".into()),
                flexible: true,
            },
            auth_bytes: vec![0, b'u', b's', b'e', b'r'],
        };
        let mut buf = BytesMut::with_capacity(32);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }
}
