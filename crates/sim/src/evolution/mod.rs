//! Evolutionary policies: presentation, fitness, mating, mutation and reproduction.
//!
//! - **Presentation**: which host genes recognise which pathogen epitopes
//! - **Fitness**: host scores computed from the presentation record
//! - **Mating**: random and MHC-disassortative mate choice
//! - **Mutation**: host point and copy-number mutation, restricted pathogen mutation
//! - **Reproduction**: host and pathogen generation turnover
//! - **Selection**: the roulette wheel shared by the policies above

pub mod fitness;
pub mod mating;
pub mod mutation;
pub mod presentation;
pub mod reproduction;
pub mod selection;

pub use fitness::{
    evaluate_hosts, AccChromSize, AlphaXSquared, ExpScaling, ExpScalingUniqAlleles, FitnessModel,
    ForDrift, HostFitness, PerGene, PlainPresent,
};
pub use mating::{
    DisassortativeMating, MateChoice, MateSearch, MateSelector, MatingPool, MatingScheme,
    MhcConstraint, RandomMating,
};
pub use mutation::{
    mutate_hosts, ConservationPattern, DeletionDuplication, HostMutation, MutationCounts,
    MutationRate, MutationRestriction, PathogenMutation, PointMutation, RateUnit,
};
pub use presentation::{InfectionScope, MatchRule, PresentationTally, Presenter, ZygosityModel};
pub use reproduction::{extinction_sweep, HostBrood, HostReproduction, PathogenReproduction};
pub use selection::Roulette;
