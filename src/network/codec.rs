//! The `i32`-length-prefixed framing every Kafka request/response uses.
//! Matches what `client::service::KafkaService` expects on the wire, built
//! against the `Encoder`/`Decoder` idiom `tokio-proto` pipeline clients
//! expect.
//!
//! Errors stay `io::Error` here (not the crate's `errors::Error`) because
//! `tokio_proto::pipeline::ClientProto` binds its transport's error type to
//! `io::Error`; `network::response` re-wraps whatever this layer reports.

use std::io;

use bytes::{BigEndian, BufMut, ByteOrder, BytesMut};
use tokio_io::codec::{Decoder, Encoder};

/// Kafka's wire framing is a 4-byte big-endian length prefix followed by
/// that many bytes of request/response body. The codec only handles the
/// prefix; callers (`network::request`/`network::response`) own the body.
pub struct KafkaCodec {
    max_frame_size: usize,
}

impl KafkaCodec {
    pub fn new(max_frame_size: usize) -> Self {
        KafkaCodec { max_frame_size }
    }
}

impl Decoder for KafkaCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<BytesMut>> {
        if src.len() < 4 {
            return Ok(None);
        }

        let len = BigEndian::read_i32(&src[..4]) as usize;

        if len > self.max_frame_size {
            return Err(io::Error::new(io::ErrorKind::InvalidData,
                                      format!("response frame of {} bytes exceeds the {} byte limit",
                                             len,
                                             self.max_frame_size)));
        }

        if src.len() < 4 + len {
            src.reserve(4 + len - src.len());
            return Ok(None);
        }

        src.split_to(4);
        Ok(Some(src.split_to(len)))
    }
}

impl Encoder for KafkaCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn encode(&mut self, item: BytesMut, dst: &mut BytesMut) -> io::Result<()> {
        dst.reserve(4 + item.len());
        dst.put_i32::<BigEndian>(item.len() as i32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_io::codec::{Decoder, Encoder};

    #[test]
    fn round_trip_frame() {
        let mut codec = KafkaCodec::new(1 << 20);
        let mut dst = BytesMut::new();
        codec.encode(BytesMut::from(&b"hello"[..]), &mut dst).unwrap();

        let frame = codec.decode(&mut dst).unwrap().unwrap();
        assert_eq!(&frame[..], b"hello");
        assert!(dst.is_empty());
    }

    #[test]
    fn incomplete_frame_is_not_ready() {
        let mut codec = KafkaCodec::new(1 << 20);
        let mut src = BytesMut::from(&[0, 0, 0, 5, b'h', b'i'][..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut codec = KafkaCodec::new(4);
        let mut src = BytesMut::from(&[0, 0, 0, 5][..]);
        assert!(codec.decode(&mut src).is_err());
    }
}
