use clap::Args;
use std::path::PathBuf;

use crate::defaults;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Output configuration path
    #[arg(short, long, default_value = defaults::OUTPUT_CONFIG)]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,

    /// Host population size
    #[arg(short = 'n', long, default_value_t = defaults::HOST_POPULATION_SIZE)]
    pub hosts: usize,

    /// Number of host generations
    #[arg(short = 'g', long, default_value_t = defaults::GENERATIONS)]
    pub generations: usize,

    /// Allele alphabet size
    #[arg(long, default_value_t = defaults::ALLELES)]
    pub alleles: u64,

    /// MHC genes per chromosome
    #[arg(long, default_value_t = defaults::CHROMOSOME_LENGTH)]
    pub chromosome_length: usize,

    /// Total pathogens across all species
    #[arg(short = 'p', long, default_value_t = defaults::PATHOGEN_POPULATION_SIZE)]
    pub pathogens: usize,

    /// Number of pathogen species
    #[arg(short = 's', long, default_value_t = defaults::SPECIES)]
    pub species: usize,

    /// Antigen length in bits
    #[arg(long, default_value_t = defaults::ANTIGEN_LENGTH)]
    pub antigen_length: usize,

    /// Antigens carried by each pathogen
    #[arg(long, default_value_t = defaults::ANTIGENS_PER_PATHOGEN)]
    pub antigens_per_pathogen: usize,

    /// Host point mutation rate (per bit)
    #[arg(long, default_value_t = defaults::HOST_MUTATION_RATE)]
    pub host_mutation_rate: f64,

    /// Pathogen mutation rate (per bit)
    #[arg(long, default_value_t = defaults::PATHOGEN_MUTATION_RATE)]
    pub pathogen_mutation_rate: f64,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file
    #[arg(short, long, default_value = defaults::OUTPUT_CONFIG)]
    pub config: PathBuf,

    /// Override the number of generations
    #[arg(short = 'g', long)]
    pub generations: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print only the final summary
    #[arg(long)]
    pub last_only: bool,
}
