//! Streaming image checksum
//!
//! CRC-32/ISO-HDLC (reflected IEEE 802.3 polynomial, the zlib CRC) fed
//! chunk by chunk as the image arrives. The value can be read at any time
//! without disturbing accumulation.

use crc::{Crc, Digest, CRC_32_ISO_HDLC};

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Check value of CRC-32/ISO-HDLC over `b"123456789"`
pub const CHECK_VALUE: u32 = 0xCBF4_3926;

/// Restartable CRC-32 accumulator
#[derive(Clone)]
pub struct Crc32 {
    digest: Digest<'static, u32>,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub fn new() -> Self {
        Self {
            digest: CRC32.digest(),
        }
    }

    /// One-shot checksum of a complete buffer
    pub fn checksum(bytes: &[u8]) -> u32 {
        CRC32.checksum(bytes)
    }

    /// Start over for a new transfer
    pub fn reset(&mut self) {
        self.digest = CRC32.digest();
    }

    /// Feed the next chunk
    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    /// Finalized value of everything fed so far
    pub fn value(&self) -> u32 {
        self.digest.clone().finalize()
    }

    /// Run the check-value self test
    pub fn self_test() -> bool {
        let mut crc = Self::new();
        crc.update(b"123456789");
        crc.value() == CHECK_VALUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_check_value() {
        let mut crc = Crc32::new();
        crc.update(b"123456789");
        assert_eq!(crc.value(), 0xCBF4_3926);
        assert!(Crc32::self_test());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Crc32::new().value(), 0);
    }

    #[test]
    fn test_value_does_not_consume() {
        let mut crc = Crc32::new();
        crc.update(b"1234");
        let _ = crc.value();
        crc.update(b"56789");
        assert_eq!(crc.value(), CHECK_VALUE);
    }

    #[test]
    fn test_reset() {
        let mut crc = Crc32::new();
        crc.update(b"garbage from an aborted transfer");
        crc.reset();
        crc.update(b"123456789");
        assert_eq!(crc.value(), CHECK_VALUE);
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_value(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            cut in any::<proptest::sample::Index>(),
        ) {
            let split = cut.index(data.len() + 1);
            let mut crc = Crc32::new();
            crc.update(&data[..split]);
            crc.update(&data[split..]);
            prop_assert_eq!(crc.value(), Crc32::checksum(&data));
        }
    }
}
