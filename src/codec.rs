//! Little-endian decoding of raw object bytes.
//!
//! Every storage object is a flat sequence of `u32` values. These helpers
//! turn byte buffers into integers and integer pairs with explicit length
//! checks, so a truncated or corrupt object surfaces as `InvalidSize`
//! instead of a panic on the request path.

use crate::error::{GraphError, Result};

/// Size of one encoded `u32`.
pub const U32_SIZE: usize = 4;

/// Size of one encoded pair of `u32`s.
pub const PAIR_SIZE: usize = 8;

/// Two consecutive little-endian `u32` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub first: u32,
    pub second: u32,
}

// ── Helper Functions ───────────────────────────────────────────────

/// Read u32 from a slice whose length was already validated.
#[inline]
fn le_u32(chunk: &[u8]) -> u32 {
    u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
}

// ── Public API ─────────────────────────────────────────────────────

/// Decode exactly four bytes as a little-endian `u32`.
pub fn decode_u32(bytes: &[u8]) -> Result<u32> {
    if bytes.len() != U32_SIZE {
        return Err(GraphError::invalid_size("exactly 4", bytes.len()));
    }
    Ok(le_u32(bytes))
}

/// Read the `u32` starting at `offset`.
pub fn read_u32_at(bytes: &[u8], offset: usize) -> Result<u32> {
    match bytes.get(offset..offset + U32_SIZE) {
        Some(chunk) => Ok(le_u32(chunk)),
        None => Err(GraphError::invalid_size(
            format!("at least {}", offset + U32_SIZE),
            bytes.len(),
        )),
    }
}

/// Decode a buffer whose length is a multiple of 4 into `u32`s.
pub fn decode_u32_array(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % U32_SIZE != 0 {
        return Err(GraphError::invalid_size("a multiple of 4", bytes.len()));
    }
    Ok(bytes.chunks_exact(U32_SIZE).map(le_u32).collect())
}

/// Decode a buffer whose length is a multiple of 8 into pairs.
pub fn decode_pairs(bytes: &[u8]) -> Result<Vec<Pair>> {
    if bytes.len() % PAIR_SIZE != 0 {
        return Err(GraphError::invalid_size("a multiple of 8", bytes.len()));
    }
    Ok(bytes
        .chunks_exact(PAIR_SIZE)
        .map(|chunk| Pair {
            first: le_u32(&chunk[..U32_SIZE]),
            second: le_u32(&chunk[U32_SIZE..]),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_single() {
        assert_eq!(decode_u32(&[1, 0, 0, 0]).unwrap(), 1);
        assert_eq!(decode_u32(&[0x01, 0x02, 0x03, 0x04]).unwrap(), 0x0403_0201);
    }

    #[test]
    fn test_decode_single_rejects_wrong_length() {
        for len in [0usize, 3, 5, 8] {
            let buf = vec![0u8; len];
            assert!(
                matches!(decode_u32(&buf), Err(GraphError::InvalidSize { actual, .. }) if actual == len),
                "length {} should be rejected",
                len
            );
        }
    }

    #[test]
    fn test_decode_array() {
        let bytes = [0xfa, 0x2a, 0xba, 0xac, 0x12, 0x91, 0x1d, 0xef];
        assert_eq!(decode_u32_array(&bytes).unwrap(), vec![0xacba_2afa, 0xef1d_9112]);
        assert!(decode_u32_array(&[]).unwrap().is_empty());
        assert!(matches!(
            decode_u32_array(&[1, 2, 3, 4, 5, 6]),
            Err(GraphError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_decode_pairs() {
        let bytes = [0xfa, 0x2a, 0xba, 0xac, 0x12, 0x91, 0x1d, 0xef];
        let pairs = decode_pairs(&bytes).unwrap();
        assert_eq!(
            pairs,
            vec![Pair { first: 0xacba_2afa, second: 0xef1d_9112 }]
        );
        assert!(matches!(
            decode_pairs(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]),
            Err(GraphError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_read_u32_at_bounds() {
        let bytes = [9, 0, 0, 0, 7, 0, 0, 0];
        assert_eq!(read_u32_at(&bytes, 4).unwrap(), 7);
        assert!(read_u32_at(&bytes, 5).is_err());
    }

    proptest! {
        #[test]
        fn prop_decode_matches_le_bytes(value in any::<u32>()) {
            prop_assert_eq!(decode_u32(&value.to_le_bytes()).unwrap(), value);
        }

        #[test]
        fn prop_bad_lengths_rejected(len in 0usize..64) {
            let buf = vec![0u8; len];
            prop_assert_eq!(decode_u32_array(&buf).is_ok(), len % 4 == 0);
            prop_assert_eq!(decode_pairs(&buf).is_ok(), len % 8 == 0);
        }
    }
}
