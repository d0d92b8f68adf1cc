//! Default values for a fresh configuration written by `init`.

pub const OUTPUT_CONFIG: &str = "mhcevo.json";

pub const HOST_POPULATION_SIZE: usize = 100;
pub const GENERATIONS: usize = 1000;
pub const ALLELES: u64 = 256;
pub const CHROMOSOME_LENGTH: usize = 4;

pub const PATHOGEN_POPULATION_SIZE: usize = 200;
pub const SPECIES: usize = 4;
pub const ANTIGEN_LENGTH: usize = 16;
pub const ANTIGENS_PER_PATHOGEN: usize = 1;

// Per-bit rates
pub const HOST_MUTATION_RATE: f64 = 1e-4;
pub const PATHOGEN_MUTATION_RATE: f64 = 1e-3;
