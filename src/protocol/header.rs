//! Request/response frame headers and the `WriteExt`/tagged-field
//! helpers shared by every per-API encoder. Built on the usual
//! `protocol::{RequestHeader, ResponseHeader}` plus a `BufMut` extension
//! style (`buf.put_str::<T, _>`, `buf.put_array::<T, _, _>`), generalized
//! with compact variants and an optional tagged-fields tail.

use std::borrow::Cow;

use bytes::{BufMut, ByteOrder, BytesMut};
use nom::{be_i16, be_i32, IResult};

use errors::{ErrorKind, Result};
use protocol::varint::{parse_varint, put_varint};

pub type ApiKey = i16;
pub type ApiVersion = i16;
pub type CorrelationId = i32;

/// `i32 totalLength | i16 apiKey | i16 apiVersion | i32 correlationId |
/// nullable_string clientId | [tagged-fields if flexible]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestHeader<'a> {
    pub api_key: ApiKey,
    pub api_version: ApiVersion,
    pub correlation_id: CorrelationId,
    pub client_id: Option<Cow<'a, str>>,
    /// Whether this (apiKey, version) is a "flexible" version carrying a
    /// trailing empty tagged-fields section, per the API version registry.
    pub flexible: bool,
}

impl<'a> RequestHeader<'a> {
    pub fn encode<T: ByteOrder>(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_i16::<T>(self.api_key);
        dst.put_i16::<T>(self.api_version);
        dst.put_i32::<T>(self.correlation_id);
        dst.put_str::<T, _>(self.client_id.clone())?;
        if self.flexible {
            dst.put_tagged_fields(&[]);
        }
        Ok(())
    }
}

/// `i32 totalLength | i32 correlationId | [tagged-fields if flexible]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseHeader {
    pub correlation_id: CorrelationId,
}

pub fn parse_response_header(input: &[u8]) -> IResult<&[u8], ResponseHeader> {
    match be_i32(input) {
        IResult::Done(rest, correlation_id) => {
            IResult::Done(rest, ResponseHeader { correlation_id })
        }
        IResult::Incomplete(n) => IResult::Incomplete(n),
        IResult::Error(e) => IResult::Error(e),
    }
}

/// Skips a flexible response header's trailing tagged-fields section, if
/// present. The connection layer calls this once per frame before
/// handing the remainder to the per-API decoder.
pub fn skip_tagged_fields(input: &[u8]) -> Result<&[u8]> {
    let (count, consumed) = ::protocol::varint::read_varint(input)?;
    let mut rest = &input[consumed..];
    for _ in 0..count {
        let (_tag, tag_consumed) = ::protocol::varint::read_varint(rest)?;
        rest = &rest[tag_consumed..];
        let (len, len_consumed) = ::protocol::varint::read_varint(rest)?;
        rest = &rest[len_consumed..];
        if rest.len() < len as usize {
            bail!(ErrorKind::CodecError("truncated tagged field".into()));
        }
        rest = &rest[len as usize..];
    }
    Ok(rest)
}

/// `WriteExt` is the append-only writer contract every encoder builds on:
/// legacy and compact variants of every primitive, arrays via an element
/// callback, and a tagged-fields appender (empty by default).
pub trait WriteExt: BufMut + Sized {
    fn put_str<T: ByteOrder, S: Into<Cow<'static, str>>>(&mut self, value: Option<S>) -> Result<()>;
    fn put_compact_str<S: AsRef<str>>(&mut self, value: Option<S>);
    fn put_bytes<T: ByteOrder, B: AsRef<[u8]>>(&mut self, value: Option<B>) -> Result<()>;
    fn put_compact_bytes<B: AsRef<[u8]>>(&mut self, value: Option<B>);
    fn put_uuid(&mut self, value: [u8; 16]);
    fn put_array<T: ByteOrder, I, F>(&mut self, items: I, f: F) -> Result<()>
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(&mut Self, I::Item) -> Result<()>;
    fn put_compact_array<I, F>(&mut self, items: I, f: F) -> Result<()>
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(&mut Self, I::Item) -> Result<()>;
    fn put_tagged_fields(&mut self, fields: &[(u32, &[u8])]);
}

impl WriteExt for BytesMut {
    fn put_str<T: ByteOrder, S: Into<Cow<'static, str>>>(&mut self, value: Option<S>) -> Result<()> {
        match value {
            None => self.put_i16::<T>(-1),
            Some(s) => {
                let s = s.into();
                let bytes = s.as_bytes();
                if bytes.len() > i16::max_value() as usize {
                    bail!(ErrorKind::OutOfBounds("string too long for legacy encoding".into()));
                }
                self.put_i16::<T>(bytes.len() as i16);
                self.put_slice(bytes);
                Ok(())
            }
        }
    }

    fn put_compact_str<S: AsRef<str>>(&mut self, value: Option<S>) {
        match value {
            None => put_varint(self, 0),
            Some(s) => {
                let bytes = s.as_ref().as_bytes();
                put_varint(self, bytes.len() as u64 + 1);
                self.put_slice(bytes);
            }
        }
    }

    fn put_bytes<T: ByteOrder, B: AsRef<[u8]>>(&mut self, value: Option<B>) -> Result<()> {
        match value {
            None => self.put_i32::<T>(-1),
            Some(b) => {
                let b = b.as_ref();
                self.put_i32::<T>(b.len() as i32);
                self.put_slice(b);
            }
        }
        Ok(())
    }

    fn put_compact_bytes<B: AsRef<[u8]>>(&mut self, value: Option<B>) {
        match value {
            None => put_varint(self, 0),
            Some(b) => {
                let b = b.as_ref();
                put_varint(self, b.len() as u64 + 1);
                self.put_slice(b);
            }
        }
    }

    fn put_uuid(&mut self, value: [u8; 16]) {
        self.put_slice(&value);
    }

    fn put_array<T: ByteOrder, I, F>(&mut self, items: I, mut f: F) -> Result<()>
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(&mut Self, I::Item) -> Result<()>,
    {
        let iter = items.into_iter();
        self.put_i32::<T>(iter.len() as i32);
        for item in iter {
            f(self, item)?;
        }
        Ok(())
    }

    fn put_compact_array<I, F>(&mut self, items: I, mut f: F) -> Result<()>
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(&mut Self, I::Item) -> Result<()>,
    {
        let iter = items.into_iter();
        put_varint(self, iter.len() as u64 + 1);
        for item in iter {
            f(self, item)?;
        }
        Ok(())
    }

    fn put_tagged_fields(&mut self, fields: &[(u32, &[u8])]) {
        put_varint(self, fields.len() as u64);
        for &(tag, bytes) in fields {
            put_varint(self, tag as u64);
            put_varint(self, bytes.len() as u64 + 1);
            self.put_slice(bytes);
        }
    }
}

/// Parses a legacy nullable string (`i16` length, `-1` => null).
pub fn parse_str(input: &[u8]) -> IResult<&[u8], Option<String>> {
    match be_i16(input) {
        IResult::Done(rest, len) => {
            if len < 0 {
                IResult::Done(rest, None)
            } else {
                let len = len as usize;
                if rest.len() < len {
                    IResult::Incomplete(::nom::Needed::Size(len))
                } else {
                    match ::std::str::from_utf8(&rest[..len]) {
                        Ok(s) => IResult::Done(&rest[len..], Some(s.to_owned())),
                        Err(_) => IResult::Error(::nom::ErrorKind::Custom(2)),
                    }
                }
            }
        }
        IResult::Incomplete(n) => IResult::Incomplete(n),
        IResult::Error(e) => IResult::Error(e),
    }
}

/// Parses a legacy non-null string, failing rather than returning `None`.
pub fn parse_string(input: &[u8]) -> IResult<&[u8], String> {
    match parse_str(input) {
        IResult::Done(rest, Some(s)) => IResult::Done(rest, s),
        IResult::Done(_, None) => IResult::Error(::nom::ErrorKind::Custom(3)),
        IResult::Incomplete(n) => IResult::Incomplete(n),
        IResult::Error(e) => IResult::Error(e),
    }
}

/// Parses legacy nullable bytes (`i32` length, `-1` => null).
pub fn parse_bytes(input: &[u8]) -> IResult<&[u8], Option<Vec<u8>>> {
    match be_i32(input) {
        IResult::Done(rest, len) => {
            if len < 0 {
                IResult::Done(rest, None)
            } else {
                let len = len as usize;
                if rest.len() < len {
                    IResult::Incomplete(::nom::Needed::Size(len))
                } else {
                    IResult::Done(&rest[len..], Some(rest[..len].to_vec()))
                }
            }
        }
        IResult::Incomplete(n) => IResult::Incomplete(n),
        IResult::Error(e) => IResult::Error(e),
    }
}

/// Parses a compact nullable string (`len+1` varint, `0` => null).
pub fn parse_compact_str(input: &[u8]) -> Result<(Option<String>, &[u8])> {
    let (raw_len, consumed) = ::protocol::varint::read_varint(input)?;
    let rest = &input[consumed..];
    if raw_len == 0 {
        return Ok((None, rest));
    }
    let len = (raw_len - 1) as usize;
    if rest.len() < len {
        bail!(ErrorKind::CodecError("truncated compact string".into()));
    }
    let s = ::std::str::from_utf8(&rest[..len])
        .map_err(|_| ErrorKind::CodecError("compact string is not utf8".into()))?;
    Ok((Some(s.to_owned()), &rest[len..]))
}

/// Parses compact nullable bytes (`len+1` varint, `0` => null).
pub fn parse_compact_bytes(input: &[u8]) -> Result<(Option<Vec<u8>>, &[u8])> {
    let (raw_len, consumed) = ::protocol::varint::read_varint(input)?;
    let rest = &input[consumed..];
    if raw_len == 0 {
        return Ok((None, rest));
    }
    let len = (raw_len - 1) as usize;
    if rest.len() < len {
        bail!(ErrorKind::CodecError("truncated compact bytes".into()));
    }
    Ok((Some(rest[..len].to_vec()), &rest[len..]))
}

/// Parses a compact array's element count (`len+1` varint, `0` => empty/null
/// per the shared compact-length convention). Returns `None` for a null
/// array and the remaining input after the count.
pub fn parse_compact_array_len(input: &[u8]) -> Result<(Option<usize>, &[u8])> {
    let (raw_len, consumed) = ::protocol::varint::read_varint(input)?;
    let rest = &input[consumed..];
    if raw_len == 0 {
        Ok((None, rest))
    } else {
        Ok((Some((raw_len - 1) as usize), rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BigEndian, BytesMut};

    #[test]
    fn legacy_string_round_trip() {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_str::<BigEndian, _>(Some("client")).unwrap();
        match parse_str(&buf) {
            IResult::Done(rest, Some(s)) => {
                assert_eq!(s, "client");
                assert!(rest.is_empty());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn legacy_null_string() {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_str::<BigEndian, Option<String>>(None).unwrap();
        assert_eq!(&buf[..], &[0xff, 0xff]);
        match parse_str(&buf) {
            IResult::Done(_, None) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn compact_string_round_trip() {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_compact_str(Some("client-id"));
        let (s, rest) = parse_compact_str(&buf).unwrap();
        assert_eq!(s.as_deref(), Some("client-id"));
        assert!(rest.is_empty());
    }

    #[test]
    fn compact_null_string_is_zero_byte() {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_compact_str(None::<&str>);
        assert_eq!(&buf[..], &[0]);
        let (s, _rest) = parse_compact_str(&buf).unwrap();
        assert_eq!(s, None);
    }

    #[test]
    fn tagged_fields_skip() {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_tagged_fields(&[(5, b"hi")]);
        buf.put_slice(b"trailer");
        let rest = skip_tagged_fields(&buf).unwrap();
        assert_eq!(rest, b"trailer");
    }

    #[test]
    fn empty_tagged_fields_skip_is_noop() {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_tagged_fields(&[]);
        buf.put_slice(b"x");
        assert_eq!(skip_tagged_fields(&buf).unwrap(), b"x");
    }
}
