//! # mhcevo simulation crate
//!
//! Core engine for host/pathogen coevolution at the MHC. Hosts carry diploid
//! genomes of MHC genes; pathogens carry bit-string antigens. Each host
//! generation runs a presentation pass, scores hosts, breeds the next host
//! generation and mutates newborns, while pathogen species reproduce and
//! mutate in between.

pub mod base;
pub mod errors;
pub mod evolution;
pub mod genome;
pub mod prelude;
pub mod simulation;

pub use base::{AlleleDomain, BitString};
pub use simulation::{Environment, SimulationConfig};
