use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{GenomeError, OutOfBounds};

const WORD: usize = u64::BITS as usize;

/// A fixed-length string of bits packed into 64-bit words.
///
/// Used for antigens and for per-site masks (conserved or fixed sites).
/// Position 0 is the leftmost character of the rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BitString {
    words: Vec<u64>,
    len: usize,
}

impl BitString {
    /// All-zero bit string of `len` bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD)],
            len,
        }
    }

    /// Uniformly random bit string of `len` bits.
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let mut bits = Self {
            words: (0..len.div_ceil(WORD)).map(|_| rng.random()).collect(),
            len,
        };
        bits.clear_tail();
        bits
    }

    /// Build from booleans.
    pub fn from_bools(values: &[bool]) -> Self {
        let mut bits = Self::zeros(values.len());
        for (i, &v) in values.iter().enumerate() {
            if v {
                bits.words[i / WORD] |= 1u64 << (i % WORD);
            }
        }
        bits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read bit `index`. Panics when out of range, like slice indexing.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.len, "bit index {index} out of range {}", self.len);
        (self.words[index / WORD] >> (index % WORD)) & 1 == 1
    }

    /// Checked variant of [`BitString::get`].
    pub fn try_get(&self, index: usize) -> Result<bool, OutOfBounds> {
        if index < self.len {
            Ok(self.get(index))
        } else {
            Err(OutOfBounds {
                index,
                len: self.len,
            })
        }
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.len, "bit index {index} out of range {}", self.len);
        let mask = 1u64 << (index % WORD);
        if value {
            self.words[index / WORD] |= mask;
        } else {
            self.words[index / WORD] &= !mask;
        }
    }

    #[inline]
    pub fn flip(&mut self, index: usize) {
        assert!(index < self.len, "bit index {index} out of range {}", self.len);
        self.words[index / WORD] ^= 1u64 << (index % WORD);
    }

    /// Read `width` bits starting at `start` as an integer, first bit most significant.
    pub fn window(&self, start: usize, width: u32) -> u64 {
        debug_assert!(width <= u64::BITS);
        debug_assert!(start + width as usize <= self.len);
        (start..start + width as usize).fold(0u64, |acc, i| (acc << 1) | self.get(i) as u64)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Positions of set bits in increasing order.
    pub fn ones(&self) -> Vec<usize> {
        (0..self.len).filter(|&i| self.get(i)).collect()
    }

    /// Mask of positions where `self` and `other` hold the same bit.
    pub fn agreement(&self, other: &BitString) -> BitString {
        debug_assert_eq!(self.len, other.len);
        let mut out = BitString {
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| !(a ^ b))
                .collect(),
            len: self.len,
        };
        out.clear_tail();
        out
    }

    /// Copy keeping only the first `len` bits.
    pub fn truncated(&self, len: usize) -> BitString {
        let len = len.min(self.len);
        let mut out = BitString {
            words: self.words[..len.div_ceil(WORD)].to_vec(),
            len,
        };
        out.clear_tail();
        out
    }

    fn clear_tail(&mut self) {
        let rem = self.len % WORD;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for BitString {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(GenomeError::Parse(format!("invalid bit '{other}'"))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_bools(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_zeros() {
        let bits = BitString::zeros(70);
        assert_eq!(bits.len(), 70);
        assert_eq!(bits.count_ones(), 0);
    }

    #[test]
    fn test_set_get_flip() {
        let mut bits = BitString::zeros(130);
        bits.set(0, true);
        bits.set(64, true);
        bits.flip(129);
        assert!(bits.get(0));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert_eq!(bits.ones(), vec![0, 64, 129]);
        bits.flip(64);
        assert!(!bits.get(64));
    }

    #[test]
    fn test_try_get_out_of_bounds() {
        let bits = BitString::zeros(4);
        assert_eq!(bits.try_get(4), Err(OutOfBounds { index: 4, len: 4 }));
    }

    #[test]
    fn test_window_reads_most_significant_first() {
        let bits: BitString = "0010110".parse().unwrap();
        assert_eq!(bits.window(0, 3), 0b001);
        assert_eq!(bits.window(2, 4), 0b1011);
        assert_eq!(bits.window(3, 4), 0b0110);
    }

    #[test]
    fn test_window_across_word_boundary() {
        let mut bits = BitString::zeros(100);
        bits.set(63, true);
        bits.set(64, true);
        assert_eq!(bits.window(62, 4), 0b0110);
    }

    #[test]
    fn test_random_clears_tail() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let bits = BitString::random(10, &mut rng);
        assert!(bits.count_ones() <= 10);
    }

    #[test]
    fn test_agreement() {
        let a: BitString = "1100".parse().unwrap();
        let b: BitString = "1010".parse().unwrap();
        assert_eq!(a.agreement(&b).to_string(), "1001");
    }

    #[test]
    fn test_truncated() {
        let a: BitString = "110101".parse().unwrap();
        assert_eq!(a.truncated(3).to_string(), "110");
        assert_eq!(a.truncated(10), a);
    }

    #[test]
    fn test_display_parse() {
        let bits: BitString = "0110001".parse().unwrap();
        assert_eq!(bits.to_string(), "0110001");
        assert!("01a".parse::<BitString>().is_err());
    }
}
