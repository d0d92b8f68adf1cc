//! Simulation configuration.
//!
//! A [`SimulationConfig`] fully describes a run: population layout, every
//! policy choice and the seed. It round-trips through JSON, so a saved
//! configuration reproduces the run it came from.

use serde::{Deserialize, Serialize};

use super::initialization::{HostInit, PathogenInit, PathogenLayout};
use crate::base::AlleleDomain;
use crate::errors::SimulationError;
use crate::evolution::{
    ConservationPattern, FitnessModel, HostMutation, HostReproduction, InfectionScope, MatchRule,
    MatingScheme, PathogenMutation, PathogenReproduction, ZygosityModel,
};

/// The master configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub execution: ExecutionConfig,
    pub host: HostConfig,
    pub pathogen: PathogenConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

/// Run length and reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Host generations to simulate
    pub total_generations: usize,
    /// Pathogen generations per host generation
    #[serde(default = "default_one")]
    pub pathogen_generations_per_host: usize,
    /// Optional RNG seed for reproducibility
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Host population and host-side policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    pub population_size: usize,
    /// Allele alphabet size
    pub alleles: AlleleDomain,
    /// Genes per chromosome at initialization
    pub chromosome_length: usize,
    #[serde(default)]
    pub init: HostInit,
    #[serde(default)]
    pub mutation: HostMutation,
    #[serde(default)]
    pub mating: MatingScheme,
    #[serde(default)]
    pub fitness: FitnessModel,
    #[serde(default)]
    pub reproduction: HostReproduction,
}

/// Pathogen population and pathogen-side policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathogenConfig {
    /// Total pathogens across all species
    pub population_size: usize,
    /// Number of species
    pub species: usize,
    /// Antigen length in bits
    pub antigen_length: usize,
    /// Per-species antigen lengths overriding `antigen_length`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub species_antigen_lengths: Vec<usize>,
    #[serde(default = "default_one")]
    pub antigens_per_pathogen: usize,
    #[serde(default)]
    pub init: PathogenInit,
    #[serde(default)]
    pub mutation: PathogenMutation,
    #[serde(default)]
    pub conservation: ConservationPattern,
    #[serde(default)]
    pub reproduction: PathogenReproduction,
}

/// Host/pathogen interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresentationConfig {
    #[serde(default)]
    pub rule: MatchRule,
    #[serde(default)]
    pub zygosity: ZygosityModel,
    #[serde(default)]
    pub scope: InfectionScope,
}

fn default_one() -> usize {
    1
}

fn inconsistent(msg: impl Into<String>) -> SimulationError {
    SimulationError::ConfigurationInconsistent(msg.into())
}

impl ExecutionConfig {
    pub fn new(total_generations: usize, seed: Option<u64>) -> Self {
        Self {
            total_generations,
            pathogen_generations_per_host: 1,
            seed,
        }
    }
}

impl PathogenConfig {
    /// Antigen length list handed to the initialization presets.
    pub fn antigen_lengths(&self) -> Vec<usize> {
        if self.species_antigen_lengths.is_empty() {
            vec![self.antigen_length]
        } else {
            self.species_antigen_lengths.clone()
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            execution: ExecutionConfig::new(100, None),
            host: HostConfig {
                population_size: 100,
                alleles: AlleleDomain::default(),
                chromosome_length: 4,
                init: HostInit::default(),
                mutation: HostMutation::default(),
                mating: MatingScheme::default(),
                fitness: FitnessModel::default(),
                reproduction: HostReproduction::default(),
            },
            pathogen: PathogenConfig {
                population_size: 200,
                species: 4,
                antigen_length: 16,
                species_antigen_lengths: Vec::new(),
                antigens_per_pathogen: 1,
                init: PathogenInit::default(),
                mutation: PathogenMutation::default(),
                conservation: ConservationPattern::default(),
                reproduction: PathogenReproduction::default(),
            },
            presentation: PresentationConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse a configuration from JSON. The result is not yet validated.
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Layout handed to the pathogen initialization presets.
    pub fn pathogen_layout(&self) -> PathogenLayout {
        PathogenLayout {
            population_size: self.pathogen.population_size,
            species: self.pathogen.species,
            antigen_lengths: self.pathogen.antigen_lengths(),
            antigens_per_pathogen: self.pathogen.antigens_per_pathogen,
            epitope_bits: self.host.alleles.bits(),
        }
    }

    /// Check every parameter and every cross-parameter constraint.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let host = &self.host;
        let pathogen = &self.pathogen;
        let bits = host.alleles.bits();

        if self.execution.pathogen_generations_per_host == 0 {
            return Err(inconsistent(
                "pathogen_generations_per_host must be at least 1",
            ));
        }
        if host.population_size == 0 {
            return Err(inconsistent("host population size must be positive"));
        }
        if pathogen.population_size == 0 || pathogen.species == 0 {
            return Err(inconsistent(
                "pathogen population size and species count must be positive",
            ));
        }
        if pathogen.antigens_per_pathogen == 0 {
            return Err(inconsistent("pathogens need at least one antigen"));
        }
        let layout = self.pathogen_layout();
        let lengths = layout.lengths();
        if let Some(short) = lengths.iter().find(|&&l| l < bits as usize) {
            return Err(inconsistent(format!(
                "antigen length {short} is shorter than the {bits}-bit allele width"
            )));
        }
        if pathogen.init.is_chained() && lengths.windows(2).any(|w| w[0] != w[1]) {
            return Err(inconsistent(format!(
                "{:?} needs one antigen length for every species",
                pathogen.init
            )));
        }

        host.mutation.validate()?;
        pathogen.mutation.validate()?;
        pathogen.conservation.validate()?;
        host.fitness.build()?;
        host.mating.validate()?;
        host.reproduction.validate()?;
        pathogen.reproduction.validate()?;
        self.presentation.rule.validate(bits)?;

        if let HostReproduction::AddOffspring { ceiling, .. } = host.reproduction {
            if host.population_size > ceiling {
                return Err(inconsistent(format!(
                    "initial host population {} exceeds the ceiling {ceiling}",
                    host.population_size
                )));
            }
        }
        if let InfectionScope::SingleSpecies { species } = self.presentation.scope {
            if species as usize >= layout.species_count() {
                return Err(inconsistent(format!(
                    "infection scope names species {species}, but only {} exist",
                    layout.species_count()
                )));
            }
        }
        if let Some(del_dup) = &host.mutation.del_dup {
            if !matches!(host.init, HostInit::RandomSized { .. })
                && !(del_dup.min_genes..=del_dup.max_genes).contains(&host.chromosome_length)
            {
                return Err(inconsistent(format!(
                    "chromosome length {} lies outside the deletion/duplication bounds {}..={}",
                    host.chromosome_length, del_dup.min_genes, del_dup.max_genes
                )));
            }
        }
        Ok(())
    }
}
