//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use mhcevo_sim::prelude::*;
//!
//! let domain = AlleleDomain::from_bits(4).unwrap();
//! let genome = Genome::parse("0001 0010 | 0011", domain).unwrap();
//! assert_eq!(genome.gene_count(), 3);
//! ```

pub use crate::base::{AlleleDomain, BitString, FitnessValue};
pub use crate::errors::{self, SimulationError};
pub use crate::evolution::{
    FitnessModel, HostFitness, HostMutation, HostReproduction, InfectionScope, MatchRule,
    MateSelector, MatingScheme, PathogenMutation, PathogenReproduction, ZygosityModel,
};
pub use crate::genome::{Antigen, Chromosome, Genome, Homolog, Host, Pathogen, SpeciesId};
pub use crate::simulation::{
    Environment, GenerationSummary, HostPopulation, PathogenPopulation, SimulationBuilder,
    SimulationConfig, Species,
};
