use lz4_compress as lz4;

use errors::{ErrorKind, Result};

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    Ok(lz4::compress(data))
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    lz4::decompress(data).map_err(|err| ErrorKind::CodecError(format!("lz4: {}", err)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let data = b"lz4 lz4 lz4 lz4".repeat(8);
        let compressed = compress(&data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }
}
