//! Unsigned LEB128 varints/varlongs with ZigZag for the signed variants, and
//! the compact (`len+1`, `0` = null) string/bytes/array length convention.
//! Built on the `bytes::BufMut`/`nom` combinator idiom used elsewhere in
//! this crate for fixed-width fields, generalized to
//! variable-width ones.

use bytes::{BufMut, BytesMut};
use nom::IResult;

use errors::{ErrorKind, Result};

/// Appends `value` as an unsigned varint (LEB128, 7 bits per byte, high bit
/// set on all but the last byte).
pub fn put_varint(buf: &mut BytesMut, value: u64) {
    let mut v = value;
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if v == 0 {
            break;
        }
    }
}

/// ZigZag-encodes `value` then writes it as an unsigned varint.
pub fn put_varlong_zigzag(buf: &mut BytesMut, value: i64) {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    put_varint(buf, zigzag);
}

/// ZigZag-encodes a 32-bit `value` then writes it as an unsigned varint
/// (used for record `offsetDelta`/key-value lengths, which are `i32`-ranged).
pub fn put_varint_zigzag(buf: &mut BytesMut, value: i32) {
    let zigzag = ((value << 1) ^ (value >> 31)) as u32;
    put_varint(buf, zigzag as u64);
}

pub fn parse_varint(input: &[u8]) -> IResult<&[u8], u64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    for &byte in input {
        consumed += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return IResult::Done(&input[consumed..], result);
        }
        shift += 7;
        if shift >= 64 {
            return IResult::Error(::nom::ErrorKind::Custom(1));
        }
    }

    IResult::Incomplete(::nom::Needed::Unknown)
}

pub fn parse_varint_zigzag(input: &[u8]) -> IResult<&[u8], i32> {
    match parse_varint(input) {
        IResult::Done(rest, raw) => {
            let raw = raw as u32;
            IResult::Done(rest, ((raw >> 1) as i32) ^ -((raw & 1) as i32))
        }
        IResult::Incomplete(n) => IResult::Incomplete(n),
        IResult::Error(e) => IResult::Error(e),
    }
}

pub fn parse_varlong_zigzag(input: &[u8]) -> IResult<&[u8], i64> {
    match parse_varint(input) {
        IResult::Done(rest, raw) => IResult::Done(rest, ((raw >> 1) as i64) ^ -((raw & 1) as i64)),
        IResult::Incomplete(n) => IResult::Incomplete(n),
        IResult::Error(e) => IResult::Error(e),
    }
}

/// Decodes a standalone varint from a fully-buffered slice, failing with a
/// `CodecError` rather than nom's `Incomplete`/`Error` when the buffer given
/// is meant to be complete (used outside combinator chains, e.g. tagged
/// field counts parsed one at a time while walking a response body).
pub fn read_varint(input: &[u8]) -> Result<(u64, usize)> {
    match parse_varint(input) {
        IResult::Done(rest, value) => Ok((value, input.len() - rest.len())),
        _ => bail!(ErrorKind::CodecError("truncated varint".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn varint_round_trip() {
        for &v in &[0u64, 1, 127, 128, 300, 16384, u64::max_value() >> 1] {
            let mut buf = BytesMut::with_capacity(16);
            put_varint(&mut buf, v);
            let (decoded, consumed) = read_varint(&buf).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn zigzag_round_trip() {
        for &v in &[0i64, -1, 1, -150, 150, i32::min_value() as i64, i32::max_value() as i64] {
            let mut buf = BytesMut::with_capacity(16);
            put_varlong_zigzag(&mut buf, v);
            match parse_varlong_zigzag(&buf) {
                IResult::Done(_, decoded) => assert_eq!(decoded, v),
                other => panic!("parse failed: {:?}", other),
            }
        }
    }

    #[test]
    fn known_byte_encodings() {
        // 300 => 0b1_0010_1100 -> low 7 bits 0101100 with continuation, then 10
        let mut buf = BytesMut::with_capacity(4);
        put_varint(&mut buf, 300);
        assert_eq!(&buf[..], &[0xAC, 0x02][..]);
    }
}
