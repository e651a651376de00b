//! Pluggable record-batch compression.
//!
//! Each codec implements `compress`/`decompress` over a flat byte buffer (the
//! concatenated, uncompressed records of one batch). Selection happens by
//! the `attributes` compression bits (0..3) on the record batch header; an
//! unregistered/disabled codec is `ErrorKind::UnsupportedCompression`.

#[cfg(feature = "gzip")]
mod gzip;
#[cfg(feature = "snappy")]
mod snappy;
#[cfg(feature = "lz4")]
mod lz4;
#[cfg(feature = "zstd")]
mod zstd_codec;

use errors::{ErrorKind, Result};

/// The compression codec recorded in a record batch's `attributes` field
/// (low 3 bits). `None` is value `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i8)]
pub enum Compression {
    #[allow(dead_code)]
    None = 0,
    Gzip = 1,
    Snappy = 2,
    Lz4 = 3,
    Zstd = 4,
}

impl Default for Compression {
    fn default() -> Self {
        Compression::None
    }
}

impl Compression {
    pub fn from_attributes(attrs: i16) -> Result<Self> {
        match attrs & 0x07 {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Snappy),
            3 => Ok(Compression::Lz4),
            4 => Ok(Compression::Zstd),
            other => bail!(ErrorKind::UnsupportedCompression(format!("codec id {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match *self {
            Compression::None => Ok(data.to_vec()),
            #[cfg(feature = "gzip")]
            Compression::Gzip => gzip::compress(data),
            #[cfg(feature = "snappy")]
            Compression::Snappy => snappy::compress(data),
            #[cfg(feature = "lz4")]
            Compression::Lz4 => lz4::compress(data),
            #[cfg(feature = "zstd")]
            Compression::Zstd => zstd_codec::compress(data),
            #[allow(unreachable_patterns)]
            other => bail!(ErrorKind::UnsupportedCompression(other.name().to_owned())),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match *self {
            Compression::None => Ok(data.to_vec()),
            #[cfg(feature = "gzip")]
            Compression::Gzip => gzip::decompress(data),
            #[cfg(feature = "snappy")]
            Compression::Snappy => snappy::decompress(data),
            #[cfg(feature = "lz4")]
            Compression::Lz4 => lz4::decompress(data),
            #[cfg(feature = "zstd")]
            Compression::Zstd => zstd_codec::decompress(data),
            #[allow(unreachable_patterns)]
            other => bail!(ErrorKind::UnsupportedCompression(other.name().to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_round_trips() {
        let data = b"hello kafka".to_vec();
        let compressed = Compression::None.compress(&data).unwrap();
        assert_eq!(compressed, data);
        assert_eq!(Compression::None.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn attribute_bits_round_trip() {
        for (attrs, expected) in &[
            (0i16, Compression::None),
            (1, Compression::Gzip),
            (2, Compression::Snappy),
            (3, Compression::Lz4),
            (4, Compression::Zstd),
        ] {
            assert_eq!(Compression::from_attributes(*attrs).unwrap(), *expected);
        }
    }

    #[test]
    fn unknown_codec_is_unsupported() {
        assert!(Compression::from_attributes(7).is_err());
    }
}
