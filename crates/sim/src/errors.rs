use std::error;
use std::fmt;

use thiserror::Error;

use crate::genome::SpeciesId;

/// Error returned when an allele value falls outside the configured domain.
///
/// The write that produced it is rejected and the genome is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidAllele {
    /// The rejected allele value
    pub value: u64,
    /// Number of alleles in the domain (valid values are `0..domain_size`)
    pub domain_size: u64,
}

impl fmt::Display for InvalidAllele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid allele {} (domain holds {} alleles)",
            self.value, self.domain_size
        )
    }
}

impl error::Error for InvalidAllele {}

/// Error returned when a locus index is outside a chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds {
    /// The index that was requested
    pub index: usize,

    /// The current length of the chromosome (upper bound)
    pub len: usize,
}

impl fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index {} out of bounds (len = {})", self.index, self.len)
    }
}

impl error::Error for OutOfBounds {}

/// Errors raised while constructing, editing or parsing genomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenomeError {
    /// An allele outside the domain was written
    InvalidAllele(InvalidAllele),
    /// A locus outside the chromosome was addressed
    OutOfBounds(OutOfBounds),
    /// The allele domain itself is unusable
    InvalidDomain(String),
    /// Two genomes built over different allele domains were combined
    DomainMismatch { left: u64, right: u64 },
    /// A rendered genome or bit string could not be parsed
    Parse(String),
}

impl fmt::Display for GenomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAllele(e) => write!(f, "{e}"),
            Self::OutOfBounds(e) => write!(f, "{e}"),
            Self::InvalidDomain(msg) => write!(f, "Invalid allele domain: {msg}"),
            Self::DomainMismatch { left, right } => {
                write!(f, "Allele domain mismatch: {left} vs {right}")
            }
            Self::Parse(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl error::Error for GenomeError {}

impl From<InvalidAllele> for GenomeError {
    fn from(e: InvalidAllele) -> Self {
        Self::InvalidAllele(e)
    }
}

impl From<OutOfBounds> for GenomeError {
    fn from(e: OutOfBounds) -> Self {
        Self::OutOfBounds(e)
    }
}

/// Errors that can occur in fitness calculations.
#[derive(Debug, Clone, PartialEq)]
pub enum FitnessError {
    /// Invalid parameter value
    InvalidParameter(String),
}

impl fmt::Display for FitnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessError::InvalidParameter(msg) => {
                write!(f, "Invalid fitness parameter: {msg}")
            }
        }
    }
}

impl error::Error for FitnessError {}

/// Errors that can occur while configuring mutation operators.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationError {
    /// Probability outside [0.0, 1.0]
    InvalidProbability(&'static str, f64),
    /// Any other inconsistent parameter
    InvalidParameter(String),
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationError::InvalidProbability(name, val) => {
                write!(
                    f,
                    "Invalid probability for {name}: {val} (must be between 0.0 and 1.0)"
                )
            }
            MutationError::InvalidParameter(msg) => {
                write!(f, "Invalid mutation parameter: {msg}")
            }
        }
    }
}

impl error::Error for MutationError {}

/// Raised when no mate satisfies the disassortative constraint.
///
/// Non-fatal: the pairing falls back to unrestricted mating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatingConstraintUnsatisfied {
    /// Slot of the focal host
    pub focal: usize,
    /// Slot of the fallback mate
    pub fallback: usize,
}

impl fmt::Display for MatingConstraintUnsatisfied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No mate satisfied the MHC constraint for host {}; mated with {} instead",
            self.focal, self.fallback
        )
    }
}

impl error::Error for MatingConstraintUnsatisfied {}

/// Raised when a pathogen species drops below the viable size and is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesExtinct {
    /// Identifier of the removed species
    pub species: SpeciesId,
    /// Size of the species when it was removed
    pub last_size: usize,
    /// Generation at which it was removed
    pub generation: usize,
}

impl fmt::Display for SpeciesExtinct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pathogen species {} went extinct at generation {} (size {})",
            self.species, self.generation, self.last_size
        )
    }
}

impl error::Error for SpeciesExtinct {}

/// Errors that can occur during simulation building.
#[derive(Debug)]
pub enum BuilderError {
    /// A required parameter is missing
    MissingRequired(&'static str),
    /// An invalid parameter value was provided
    InvalidParameter(String),
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired(param) => {
                write!(f, "Missing required parameter: {param}")
            }
            Self::InvalidParameter(msg) => {
                write!(f, "Invalid parameter: {msg}")
            }
        }
    }
}

impl error::Error for BuilderError {}

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Population-level invariants or configuration values contradict each other
    #[error("Configuration inconsistent: {0}")]
    ConfigurationInconsistent(String),

    /// A population has no members left
    #[error("Empty population: {0}")]
    EmptyPopulation(&'static str),

    #[error(transparent)]
    Genome(#[from] GenomeError),

    #[error(transparent)]
    Fitness(#[from] FitnessError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<InvalidAllele> for SimulationError {
    fn from(e: InvalidAllele) -> Self {
        Self::Genome(GenomeError::InvalidAllele(e))
    }
}
