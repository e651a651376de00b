use snap::{Reader as SnapReader, Writer as SnapWriter};
use std::io::{Read, Write};

use errors::Result;

/// Kafka's snappy framing is the "xerial" chunked format; the `snap` crate's
/// `Reader`/`Writer` already produce and consume that framing, so no extra
/// chunk header handling is needed here.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut writer = SnapWriter::new(Vec::with_capacity(data.len()));
    writer.write_all(data)?;
    Ok(writer.into_inner()?)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = SnapReader::new(data);
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let data = b"snappy snappy snappy".repeat(8);
        let compressed = compress(&data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }
}
