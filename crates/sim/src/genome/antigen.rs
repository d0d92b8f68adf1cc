use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::base::BitString;
use crate::errors::GenomeError;

/// A pathogen antigen: a bit string read by hosts through sliding epitopes.
///
/// Each epitope is a window of `epitope_bits` consecutive bits, the same
/// width as a host allele. Epitopes are cached and rebuilt whenever the bits
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Antigen {
    bits: BitString,
    epitope_bits: u32,
    epitopes: Vec<u64>,
}

impl Antigen {
    /// Wrap a bit string. It must be at least one epitope long.
    pub fn new(bits: BitString, epitope_bits: u32) -> Result<Self, GenomeError> {
        if epitope_bits == 0 || epitope_bits > u64::BITS {
            return Err(GenomeError::InvalidDomain(format!(
                "epitope width must be between 1 and 64 bits, got {epitope_bits}"
            )));
        }
        if bits.len() < epitope_bits as usize {
            return Err(GenomeError::InvalidDomain(format!(
                "antigen of {} bits is shorter than one {epitope_bits}-bit epitope",
                bits.len()
            )));
        }
        let mut antigen = Self {
            bits,
            epitope_bits,
            epitopes: Vec::new(),
        };
        antigen.refresh_epitopes();
        Ok(antigen)
    }

    /// Uniformly random antigen of `len` bits.
    pub fn random<R: Rng + ?Sized>(
        len: usize,
        epitope_bits: u32,
        rng: &mut R,
    ) -> Result<Self, GenomeError> {
        Self::new(BitString::random(len, rng), epitope_bits)
    }

    /// Copy of this antigen with every `nth` bit flipped, starting at bit 0.
    ///
    /// `nth == 1` complements the whole antigen.
    pub fn with_every_nth_flipped(&self, nth: usize) -> Self {
        let mut bits = self.bits.clone();
        for i in (0..bits.len()).step_by(nth.max(1)) {
            bits.flip(i);
        }
        let mut antigen = Self {
            bits,
            epitope_bits: self.epitope_bits,
            epitopes: Vec::new(),
        };
        antigen.refresh_epitopes();
        antigen
    }

    #[inline]
    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn epitope_bits(&self) -> u32 {
        self.epitope_bits
    }

    /// All epitopes, left to right.
    #[inline]
    pub fn epitopes(&self) -> &[u64] {
        &self.epitopes
    }

    /// Flip the given positions and rebuild the epitopes.
    pub(crate) fn flip_positions(&mut self, positions: &[usize]) {
        if positions.is_empty() {
            return;
        }
        for &p in positions {
            self.bits.flip(p);
        }
        self.refresh_epitopes();
    }

    fn refresh_epitopes(&mut self) {
        let width = self.epitope_bits as usize;
        self.epitopes = (0..=self.bits.len() - width)
            .map(|start| self.bits.window(start, self.epitope_bits))
            .collect();
    }
}

impl fmt::Display for Antigen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits)
    }
}
