//! Base types for allele and bit-string representation.
//!
//! This module provides the foundational value types shared by host genomes
//! and pathogen antigens in the mhcevo library.

mod allele;
mod bits;
pub mod fitness;
pub mod scaling;

pub use allele::AlleleDomain;
pub use bits::BitString;
pub use fitness::FitnessValue;
pub use scaling::mm_to_pm_scaling;
