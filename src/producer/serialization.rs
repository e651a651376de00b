//! Pluggable key/value encoding for `ProducerRecord`, grounded on the
//! `Serializer`/`Deserializer` trait shape carried at the crate's top level
//! (`serialization::mod`'s `BufMut`/`Bytes`-based pattern, generic `Error`
//! associated type). Producers have no symmetric decode side, so only the
//! serializing half is reproduced here.

use std::io;
use std::marker::PhantomData;

use bytes::buf::FromBuf;
use bytes::{BufMut, Bytes};

#[cfg(feature = "encoding")]
use encoding::{EncoderTrap, Encoding};
#[cfg(feature = "encoding")]
use encoding::all::UTF_8;

/// Encodes a typed value into the bytes a `ProducerRecord`'s key or value
/// carries.
pub trait Serializer {
    type Item;
    type Error;

    fn serialize_to<B: BufMut>(&self, topic_name: &str, data: Self::Item, buf: &mut B) -> Result<(), Self::Error>;

    fn serialize(&self, topic_name: &str, data: Self::Item) -> Result<Bytes, Self::Error> {
        let mut buf = Vec::with_capacity(16);
        self.serialize_to(topic_name, data, &mut buf)?;
        Ok(Bytes::from_buf(buf))
    }
}

/// Identity for values already `Bytes`/`Vec<u8>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesSerializer;

impl Serializer for BytesSerializer {
    type Item = Bytes;
    type Error = io::Error;

    fn serialize_to<B: BufMut>(&self, _topic_name: &str, data: Bytes, buf: &mut B) -> Result<(), io::Error> {
        buf.put_slice(&data);
        Ok(())
    }
}

/// For keyless records: always produces an empty payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSerializer;

impl Serializer for NoopSerializer {
    type Item = ();
    type Error = io::Error;

    fn serialize_to<B: BufMut>(&self, _topic_name: &str, _data: (), _buf: &mut B) -> Result<(), io::Error> {
        Ok(())
    }
}

/// Any `AsRef<[u8]>`, copied into the buffer as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawSerializer<T>(PhantomData<T>);

impl<T> RawSerializer<T> {
    pub fn new() -> Self {
        RawSerializer(PhantomData)
    }
}

impl<T: AsRef<[u8]>> Serializer for RawSerializer<T> {
    type Item = T;
    type Error = io::Error;

    fn serialize_to<B: BufMut>(&self, _topic_name: &str, data: T, buf: &mut B) -> Result<(), io::Error> {
        buf.put_slice(data.as_ref());
        Ok(())
    }
}

/// `str`/`String`, encoded with the `encoding` crate's charset table
/// (UTF-8 by default).
#[cfg(feature = "encoding")]
pub struct StrEncodingSerializer {
    encoding: &'static (Encoding + Send + Sync),
}

#[cfg(feature = "encoding")]
impl Default for StrEncodingSerializer {
    fn default() -> Self {
        StrEncodingSerializer { encoding: UTF_8 as &'static (Encoding + Send + Sync) }
    }
}

#[cfg(feature = "encoding")]
impl StrEncodingSerializer {
    pub fn new(encoding: &'static (Encoding + Send + Sync)) -> Self {
        StrEncodingSerializer { encoding }
    }
}

#[cfg(feature = "encoding")]
impl Serializer for StrEncodingSerializer {
    type Item = String;
    type Error = io::Error;

    fn serialize_to<B: BufMut>(&self, _topic_name: &str, data: String, buf: &mut B) -> Result<(), io::Error> {
        let encoded = self.encoding
            .encode(&data, EncoderTrap::Strict)
            .map_err(|reason| io::Error::new(io::ErrorKind::InvalidData, reason.into_owned()))?;
        buf.put_slice(&encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_serializer_passes_through() {
        let ser = BytesSerializer::default();
        assert_eq!(ser.serialize("topic", Bytes::from_static(b"hi")).unwrap(), Bytes::from_static(b"hi"));
    }

    #[test]
    fn noop_serializer_is_empty() {
        let ser = NoopSerializer::default();
        assert_eq!(ser.serialize("topic", ()).unwrap(), Bytes::new());
    }

    #[test]
    fn raw_serializer_copies_str_bytes() {
        let ser: RawSerializer<&str> = RawSerializer::new();
        assert_eq!(ser.serialize("topic", "hi").unwrap(), Bytes::from_static(b"hi"));
    }

    #[cfg(feature = "encoding")]
    #[test]
    fn str_encoding_serializer_defaults_to_utf8() {
        let ser = StrEncodingSerializer::default();
        assert_eq!(ser.serialize("topic", "hi".to_owned()).unwrap(), Bytes::from_static(b"hi"));
    }
}
