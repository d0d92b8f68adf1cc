use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{GenomeError, InvalidAllele};

/// The finite alphabet a gene draws its alleles from.
///
/// Alleles are the integers `0..size` and are treated as bit patterns of
/// `bits()` bits for antigen matching. The domain is fixed when a genome is
/// built and is shared by every host of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct AlleleDomain {
    size: u64,
}

impl AlleleDomain {
    /// Largest bit width accepted by [`AlleleDomain::from_bits`].
    pub const MAX_BITS: u32 = 63;

    /// Create a domain holding `size` alleles.
    pub fn new(size: u64) -> Result<Self, GenomeError> {
        if size < 2 {
            return Err(GenomeError::InvalidDomain(format!(
                "domain must hold at least 2 alleles, got {size}"
            )));
        }
        Ok(Self { size })
    }

    /// Create the domain of all `bits`-wide bit patterns (`2^bits` alleles).
    pub fn from_bits(bits: u32) -> Result<Self, GenomeError> {
        if bits == 0 || bits > Self::MAX_BITS {
            return Err(GenomeError::InvalidDomain(format!(
                "bit width must be between 1 and {}, got {bits}",
                Self::MAX_BITS
            )));
        }
        Ok(Self { size: 1u64 << bits })
    }

    /// Number of alleles in the domain.
    #[inline]
    pub fn size(self) -> u64 {
        self.size
    }

    /// Bits needed to render any allele of the domain.
    #[inline]
    pub fn bits(self) -> u32 {
        u64::BITS - (self.size - 1).leading_zeros()
    }

    /// Mask selecting the low `bits()` bits.
    #[inline]
    pub fn mask(self) -> u64 {
        match self.bits() {
            64 => u64::MAX,
            b => (1u64 << b) - 1,
        }
    }

    #[inline]
    pub fn contains(self, value: u64) -> bool {
        value < self.size
    }

    /// Validate an allele value against the domain.
    #[inline]
    pub fn check(self, value: u64) -> Result<u64, InvalidAllele> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(InvalidAllele {
                value,
                domain_size: self.size,
            })
        }
    }

    /// Draw a uniformly random allele.
    #[inline]
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> u64 {
        rng.random_range(0..self.size)
    }

    /// Render an allele as zero-padded binary, most significant bit first.
    pub fn render(self, value: u64) -> String {
        format!("{value:0width$b}", width = self.bits() as usize)
    }

    /// Parse a binary rendering produced by [`AlleleDomain::render`].
    pub fn parse(self, text: &str) -> Result<u64, GenomeError> {
        if text.len() != self.bits() as usize {
            return Err(GenomeError::Parse(format!(
                "gene '{text}' has {} bits, expected {}",
                text.len(),
                self.bits()
            )));
        }
        let value = u64::from_str_radix(text, 2)
            .map_err(|e| GenomeError::Parse(format!("gene '{text}': {e}")))?;
        Ok(self.check(value)?)
    }
}

/// 8-bit alleles.
impl Default for AlleleDomain {
    fn default() -> Self {
        Self { size: 256 }
    }
}

impl TryFrom<u64> for AlleleDomain {
    type Error = GenomeError;

    fn try_from(size: u64) -> Result<Self, Self::Error> {
        Self::new(size)
    }
}

impl From<AlleleDomain> for u64 {
    fn from(domain: AlleleDomain) -> Self {
        domain.size
    }
}

impl fmt::Display for AlleleDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} alleles ({} bits)", self.size, self.bits())
    }
}
