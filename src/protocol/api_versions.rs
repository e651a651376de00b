//! ApiVersions (apiKey 18, v3 — flexible), built on the usual
//! `protocol::api_versions` struct shape. v3 adds the client's software
//! name/version to the request and a `throttle_time_ms` plus tagged
//! fields to the response; `SupportedApiVersions::find` is how the
//! registry resolves which version of a given call a broker speaks.

use bytes::{BigEndian, ByteOrder, BytesMut};

use errors::{ErrorKind, Result};
use protocol::{skip_tagged_fields, ApiKey, ApiKeys, ApiVersion, Encodable, ErrorCode, RequestHeader,
               ResponseHeader, WriteExt};

#[derive(Clone, Debug, PartialEq)]
pub struct ApiVersionsRequest<'a> {
    pub header: RequestHeader<'a>,
    pub client_software_name: String,
    pub client_software_version: String,
}

impl<'a> Encodable for ApiVersionsRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_compact_str(Some(self.client_software_name));
        dst.put_compact_str(Some(self.client_software_version));
        dst.put_tagged_fields(&[]);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiVersionsResponse {
    pub header: ResponseHeader,
    pub error_code: ErrorCode,
    pub api_versions: Vec<SupportedApiVersion>,
    pub throttle_time_ms: i32,
}

/// API versions supported by the broker.
#[derive(Clone, Debug, PartialEq)]
pub struct SupportedApiVersion {
    pub api_key: ApiKey,
    pub min_version: ApiVersion,
    pub max_version: ApiVersion,
}

#[derive(Clone, Debug)]
pub struct SupportedApiVersions(pub Vec<SupportedApiVersion>);

impl SupportedApiVersions {
    pub fn find(&self, api_key: ApiKeys) -> Option<&SupportedApiVersion> {
        self.0.iter().find(|v| v.api_key == api_key as ApiKey)
    }
}

pub fn parse_api_versions_response(input: &[u8]) -> Result<ApiVersionsResponse> {
    let (header, rest) = match ::protocol::parse_response_header(input) {
        ::nom::IResult::Done(rest, h) => (h, rest),
        _ => bail!(ErrorKind::CodecError("truncated response header".into())),
    };
    let error_code = read_i16(rest)?;
    let mut rest = &rest[2..];

    let (count, r) = ::protocol::header::parse_compact_array_len(rest)?;
    rest = r;
    let mut api_versions = Vec::with_capacity(count.unwrap_or(0));
    for _ in 0..count.unwrap_or(0) {
        let api_key = read_i16(rest)?;
        rest = &rest[2..];
        let min_version = read_i16(rest)?;
        rest = &rest[2..];
        let max_version = read_i16(rest)?;
        rest = &rest[2..];
        rest = skip_tagged_fields(rest)?;
        api_versions.push(SupportedApiVersion {
            api_key,
            min_version,
            max_version,
        });
    }

    let throttle_time_ms = if rest.len() >= 4 { read_i32(rest)? } else { 0 };
    if rest.len() >= 4 {
        rest = &rest[4..];
    }
    let _rest = skip_tagged_fields(rest)?;

    Ok(ApiVersionsResponse {
        header,
        error_code,
        api_versions,
        throttle_time_ms,
    })
}

fn read_i16(input: &[u8]) -> Result<i16> {
    if input.len() < 2 {
        bail!(ErrorKind::CodecError("truncated i16".into()));
    }
    Ok(BigEndian::read_i16(&input[..2]))
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
    use bytes::BigEndian;

    #[test]
    fn encode_api_versions_request() {
        let req = ApiVersionsRequest {
            header: RequestHeader {
                api_key: ApiKeys::ApiVersions as ApiKey,
                api_version: 3,
                correlation_id: 123,
                client_id: Some("client".into()),
                flexible: true,
            },
            client_software_name: "tokio-kafka".to_owned(),
            client_software_version: "0.1".to_owned(),
        };

        let mut buf = BytesMut::with_capacity(128);
        req.encode::<BigEndian>(&mut buf).unwrap();
        assert!(!buf.is_empty());
    }

    #[test]
    fn supported_api_versions_find() {
        let versions = SupportedApiVersions(vec![SupportedApiVersion {
            api_key: ApiKeys::Produce as ApiKey,
            min_version: 0,
            max_version: 11,
        }]);
        let found = versions.find(ApiKeys::Produce).unwrap();
        assert_eq!(found.max_version, 11);
        assert!(versions.find(ApiKeys::Fetch).is_none());
    }
}
