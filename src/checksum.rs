//! Running CRC-32 and length for the gzip trailer.
//!
//! Owned by the pipeline driver and only ever touched by the sequential
//! read step, so updates always happen in ascending block order.

use crc32fast::Hasher;

#[derive(Clone, Debug, Default)]
pub struct StreamChecksum {
    hasher: Hasher,
    total_in: u64,
}

impl StreamChecksum {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.total_in += bytes.len() as u64;
    }

    /// CRC-32 of everything seen so far
    pub fn crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// ISIZE field: uncompressed length modulo 2^32
    pub fn isize(&self) -> u32 {
        self.total_in as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_crc() {
        let mut sum = StreamChecksum::new();
        sum.update(b"1234");
        sum.update(b"56789");
        assert_eq!(sum.crc(), 0xCBF4_3926);
        assert_eq!(sum.total_in(), 9);
        // crc() must not consume the running state
        assert_eq!(sum.crc(), crc32fast::hash(b"123456789"));
    }

    #[test]
    fn test_empty_stream() {
        let sum = StreamChecksum::new();
        assert_eq!(sum.crc(), 0);
        assert_eq!(sum.isize(), 0);
    }

    #[test]
    fn test_isize_wraps() {
        let sum = StreamChecksum {
            hasher: Hasher::new(),
            total_in: (1u64 << 32) + 17,
        };
        assert_eq!(sum.isize(), 17);
    }
}
