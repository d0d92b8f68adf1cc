//! Fluent construction of an [`Environment`].
//!
//! The builder collects the handful of required sizes and starts every
//! policy from its default, so small experiments only name what they change.

use super::configs::{
    ExecutionConfig, HostConfig, PathogenConfig, PresentationConfig, SimulationConfig,
};
use super::engine::Environment;
use super::initialization::{HostInit, PathogenInit};
use crate::base::AlleleDomain;
pub use crate::errors::BuilderError;
use crate::errors::SimulationError;
use crate::evolution::{
    ConservationPattern, FitnessModel, HostMutation, HostReproduction, InfectionScope, MatchRule,
    MatingScheme, PathogenMutation, PathogenReproduction, ZygosityModel,
};

/// Builder for [`Environment`] and [`SimulationConfig`].
///
/// # Examples
///
/// ```
/// use mhcevo_sim::evolution::{FitnessModel, MatingScheme};
/// use mhcevo_sim::simulation::SimulationBuilder;
///
/// let mut env = SimulationBuilder::new()
///     .host_population_size(20)
///     .generations(5)
///     .alleles(16)
///     .chromosome_length(2)
///     .pathogen_population_size(40)
///     .species(2)
///     .antigen_length(12)
///     .fitness(FitnessModel::PlainPresent)
///     .mating(MatingScheme::Random)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// let summaries = env.run().unwrap();
/// assert_eq!(summaries.len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    // Required
    host_population_size: Option<usize>,
    generations: Option<usize>,
    alleles: Option<u64>,
    chromosome_length: Option<usize>,
    pathogen_population_size: Option<usize>,
    antigen_length: Option<usize>,

    species: usize,
    species_antigen_lengths: Vec<usize>,
    antigens_per_pathogen: usize,
    pathogen_generations_per_host: usize,
    seed: Option<u64>,

    host_init: HostInit,
    host_mutation: HostMutation,
    mating: MatingScheme,
    fitness: FitnessModel,
    host_reproduction: HostReproduction,

    pathogen_init: PathogenInit,
    pathogen_mutation: PathogenMutation,
    conservation: ConservationPattern,
    pathogen_reproduction: PathogenReproduction,

    presentation: PresentationConfig,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self {
            host_population_size: None,
            generations: None,
            alleles: None,
            chromosome_length: None,
            pathogen_population_size: None,
            antigen_length: None,
            species: 1,
            species_antigen_lengths: Vec::new(),
            antigens_per_pathogen: 1,
            pathogen_generations_per_host: 1,
            seed: None,
            host_init: HostInit::default(),
            host_mutation: HostMutation::default(),
            mating: MatingScheme::default(),
            fitness: FitnessModel::default(),
            host_reproduction: HostReproduction::default(),
            pathogen_init: PathogenInit::default(),
            pathogen_mutation: PathogenMutation::default(),
            conservation: ConservationPattern::default(),
            pathogen_reproduction: PathogenReproduction::default(),
            presentation: PresentationConfig::default(),
        }
    }

    /// Start from a complete configuration.
    pub fn from_config(config: SimulationConfig) -> Self {
        let SimulationConfig {
            execution,
            host,
            pathogen,
            presentation,
        } = config;
        Self {
            host_population_size: Some(host.population_size),
            generations: Some(execution.total_generations),
            alleles: Some(host.alleles.size()),
            chromosome_length: Some(host.chromosome_length),
            pathogen_population_size: Some(pathogen.population_size),
            antigen_length: Some(pathogen.antigen_length),
            species: pathogen.species,
            species_antigen_lengths: pathogen.species_antigen_lengths,
            antigens_per_pathogen: pathogen.antigens_per_pathogen,
            pathogen_generations_per_host: execution.pathogen_generations_per_host,
            seed: execution.seed,
            host_init: host.init,
            host_mutation: host.mutation,
            mating: host.mating,
            fitness: host.fitness,
            host_reproduction: host.reproduction,
            pathogen_init: pathogen.init,
            pathogen_mutation: pathogen.mutation,
            conservation: pathogen.conservation,
            pathogen_reproduction: pathogen.reproduction,
            presentation,
        }
    }

    /// Number of hosts (required).
    pub fn host_population_size(mut self, size: usize) -> Self {
        self.host_population_size = Some(size);
        self
    }

    /// Number of host generations to run (required).
    pub fn generations(mut self, generations: usize) -> Self {
        self.generations = Some(generations);
        self
    }

    /// Allele alphabet size (required, at least 2).
    pub fn alleles(mut self, size: u64) -> Self {
        self.alleles = Some(size);
        self
    }

    /// Genes per chromosome at initialization (required).
    pub fn chromosome_length(mut self, length: usize) -> Self {
        self.chromosome_length = Some(length);
        self
    }

    /// Total pathogens across all species (required).
    pub fn pathogen_population_size(mut self, size: usize) -> Self {
        self.pathogen_population_size = Some(size);
        self
    }

    /// Antigen length in bits (required).
    pub fn antigen_length(mut self, bits: usize) -> Self {
        self.antigen_length = Some(bits);
        self
    }

    pub fn species(mut self, species: usize) -> Self {
        self.species = species;
        self
    }

    pub fn species_antigen_lengths(mut self, lengths: Vec<usize>) -> Self {
        self.species_antigen_lengths = lengths;
        self
    }

    pub fn antigens_per_pathogen(mut self, count: usize) -> Self {
        self.antigens_per_pathogen = count;
        self
    }

    pub fn pathogen_generations_per_host(mut self, count: usize) -> Self {
        self.pathogen_generations_per_host = count;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn host_init(mut self, init: HostInit) -> Self {
        self.host_init = init;
        self
    }

    pub fn host_mutation(mut self, mutation: HostMutation) -> Self {
        self.host_mutation = mutation;
        self
    }

    pub fn mating(mut self, mating: MatingScheme) -> Self {
        self.mating = mating;
        self
    }

    pub fn fitness(mut self, fitness: FitnessModel) -> Self {
        self.fitness = fitness;
        self
    }

    pub fn host_reproduction(mut self, reproduction: HostReproduction) -> Self {
        self.host_reproduction = reproduction;
        self
    }

    pub fn pathogen_init(mut self, init: PathogenInit) -> Self {
        self.pathogen_init = init;
        self
    }

    pub fn pathogen_mutation(mut self, mutation: PathogenMutation) -> Self {
        self.pathogen_mutation = mutation;
        self
    }

    pub fn conservation(mut self, pattern: ConservationPattern) -> Self {
        self.conservation = pattern;
        self
    }

    pub fn pathogen_reproduction(mut self, reproduction: PathogenReproduction) -> Self {
        self.pathogen_reproduction = reproduction;
        self
    }

    pub fn match_rule(mut self, rule: MatchRule) -> Self {
        self.presentation.rule = rule;
        self
    }

    pub fn zygosity(mut self, zygosity: ZygosityModel) -> Self {
        self.presentation.zygosity = zygosity;
        self
    }

    pub fn infection_scope(mut self, scope: InfectionScope) -> Self {
        self.presentation.scope = scope;
        self
    }

    /// Assemble the configuration without cross-checking it.
    pub fn build_config(self) -> Result<SimulationConfig, BuilderError> {
        let host_population_size = self
            .host_population_size
            .ok_or(BuilderError::MissingRequired("host_population_size"))?;
        let generations = self
            .generations
            .ok_or(BuilderError::MissingRequired("generations"))?;
        let alleles = self
            .alleles
            .ok_or(BuilderError::MissingRequired("alleles"))?;
        let chromosome_length = self
            .chromosome_length
            .ok_or(BuilderError::MissingRequired("chromosome_length"))?;
        let pathogen_population_size = self
            .pathogen_population_size
            .ok_or(BuilderError::MissingRequired("pathogen_population_size"))?;
        let antigen_length = self
            .antigen_length
            .ok_or(BuilderError::MissingRequired("antigen_length"))?;

        let alleles = AlleleDomain::new(alleles)
            .map_err(|e| BuilderError::InvalidParameter(e.to_string()))?;

        Ok(SimulationConfig {
            execution: ExecutionConfig {
                total_generations: generations,
                pathogen_generations_per_host: self.pathogen_generations_per_host,
                seed: self.seed,
            },
            host: HostConfig {
                population_size: host_population_size,
                alleles,
                chromosome_length,
                init: self.host_init,
                mutation: self.host_mutation,
                mating: self.mating,
                fitness: self.fitness,
                reproduction: self.host_reproduction,
            },
            pathogen: PathogenConfig {
                population_size: pathogen_population_size,
                species: self.species,
                antigen_length,
                species_antigen_lengths: self.species_antigen_lengths,
                antigens_per_pathogen: self.antigens_per_pathogen,
                init: self.pathogen_init,
                mutation: self.pathogen_mutation,
                conservation: self.conservation,
                reproduction: self.pathogen_reproduction,
            },
            presentation: self.presentation,
        })
    }

    /// Build, validate and initialize the environment.
    pub fn build(self) -> Result<Environment, SimulationError> {
        let config = self.build_config()?;
        Environment::new(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::{MateSearch, MutationRate};

    fn minimal() -> SimulationBuilder {
        SimulationBuilder::new()
            .host_population_size(10)
            .generations(4)
            .alleles(16)
            .chromosome_length(2)
            .pathogen_population_size(10)
            .antigen_length(8)
    }

    #[test]
    fn test_builder_minimal() {
        let env = minimal().seed(1).build().unwrap();
        assert_eq!(env.host_count(), 10);
        assert_eq!(env.generation(), 0);
        assert_eq!(env.total_generations(), 4);
        assert_eq!(env.pathogens().species_count(), 1);
    }

    #[test]
    fn test_builder_missing_host_population_size() {
        let result = SimulationBuilder::new()
            .generations(4)
            .alleles(16)
            .chromosome_length(2)
            .pathogen_population_size(10)
            .antigen_length(8)
            .build_config();
        match result {
            Err(BuilderError::MissingRequired(param)) => {
                assert_eq!(param, "host_population_size")
            }
            other => panic!("expected MissingRequired, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_missing_antigen_length() {
        let result = SimulationBuilder::new()
            .host_population_size(10)
            .generations(4)
            .alleles(16)
            .chromosome_length(2)
            .pathogen_population_size(10)
            .build();
        assert!(matches!(
            result,
            Err(SimulationError::Builder(BuilderError::MissingRequired(
                "antigen_length"
            )))
        ));
    }

    #[test]
    fn test_builder_invalid_alleles() {
        let result = minimal().alleles(1).build_config();
        assert!(matches!(result, Err(BuilderError::InvalidParameter(_))));
    }

    #[test]
    fn test_builder_invalid_mutation_rate() {
        let result = minimal()
            .pathogen_mutation(PathogenMutation {
                rate: MutationRate::per_bit(-0.1),
                ..Default::default()
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_round_trips_config() {
        let config = minimal()
            .species(2)
            .mating(MatingScheme::OneDifferentMhc {
                search: MateSearch::default(),
            })
            .match_rule(MatchRule::AnyBits { min_matching: 3 })
            .seed(9)
            .build_config()
            .unwrap();
        let again = SimulationBuilder::from_config(config.clone())
            .build_config()
            .unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_builder_all_options() {
        let env = minimal()
            .species(3)
            .species_antigen_lengths(vec![8, 10, 12])
            .antigens_per_pathogen(2)
            .pathogen_generations_per_host(2)
            .host_init(HostInit::Clonal)
            .pathogen_init(PathogenInit::DivSpecies)
            .conservation(ConservationPattern::Random { fraction: 0.25 })
            .zygosity(ZygosityModel::AllGenes)
            .infection_scope(InfectionScope::AllPathogens)
            .seed(3)
            .build()
            .unwrap();
        assert_eq!(env.pathogens().species()[2].antigen_length(), 12);
        assert!(env.distinct_alleles() <= 2);
    }
}
