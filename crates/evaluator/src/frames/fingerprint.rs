use crate::{EvaluatorError, Result};

pub const THUMB_WIDTH: usize = 9;
pub const THUMB_HEIGHT: usize = 8;

/// 64-bit difference hash of a 9x8 grayscale thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Row-major 9x8 luma bytes. Bit `row * 8 + col` is set when a pixel is darker
    /// than its right neighbour.
    pub fn from_gray(pixels: &[u8]) -> Result<Self> {
        if pixels.len() != THUMB_WIDTH * THUMB_HEIGHT {
            return Err(EvaluatorError::Decoder(format!(
                "expected {} thumbnail bytes, got {}",
                THUMB_WIDTH * THUMB_HEIGHT,
                pixels.len()
            )));
        }

        let mut bits = 0u64;
        for row in 0..THUMB_HEIGHT {
            for col in 0..THUMB_WIDTH - 1 {
                let offset = row * THUMB_WIDTH + col;
                if pixels[offset] < pixels[offset + 1] {
                    bits |= 1u64 << (row * (THUMB_WIDTH - 1) + col);
                }
            }
        }
        Ok(Self(bits))
    }

    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

/// Indices of samples that survive collapsing runs of near-identical neighbours.
/// Each sample is compared against the last one kept.
pub fn dedup_consecutive(fingerprints: &[Fingerprint], threshold: u32) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::new();
    for (index, fingerprint) in fingerprints.iter().enumerate() {
        match kept.last() {
            Some(&last) if fingerprints[last].distance(fingerprint) <= threshold => {}
            _ => kept.push(index),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::gray_for_bits;

    #[test]
    fn test_from_gray_recovers_bits() {
        for bits in [0u64, u64::MAX, 0x0F0F_0F0F_0F0F_0F0F, 0x8000_0000_0000_0001] {
            assert_eq!(Fingerprint::from_gray(&gray_for_bits(bits)).unwrap(), Fingerprint(bits));
        }
    }

    #[test]
    fn test_from_gray_rejects_wrong_size() {
        assert!(matches!(
            Fingerprint::from_gray(&[0u8; 64]),
            Err(EvaluatorError::Decoder(_))
        ));
    }

    #[test]
    fn test_dedup_compares_against_last_kept() {
        let a = Fingerprint(0);
        let near = Fingerprint(0b111);
        let drift = Fingerprint(0b1111_1111);
        let far = Fingerprint(u64::MAX);

        // near is within 5 bits of a; drift is 8 bits away from a so it is kept
        let kept = dedup_consecutive(&[a, near, drift, far, far], 5);
        assert_eq!(kept, vec![0, 2, 3]);
    }
}
