//! Per-generation summary statistics.

use serde::{Deserialize, Serialize};

use super::population::SpeciesSize;
use crate::evolution::{MutationCounts, PresentationTally};
use crate::genome::SpeciesId;

/// Mean, maximum and total of a set of fitness values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessStats {
    pub mean: f64,
    pub max: f64,
    pub total: f64,
}

impl FitnessStats {
    /// All zeros for an empty slice.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let total: f64 = values.iter().sum();
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            mean: total / values.len() as f64,
            max,
            total,
        }
    }
}

/// What happened during one host generation.
///
/// Fitness and presentation figures describe the generation that was
/// evaluated and then replaced. Population figures describe the state after
/// the step: the new hosts, the surviving pathogen species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Generation number after the step
    pub generation: usize,
    pub host_count: usize,
    pub pathogen_count: usize,
    pub species_sizes: Vec<SpeciesSize>,
    pub fitness: FitnessStats,
    /// Summed over every pathogen generation of the step
    pub presentation: PresentationTally,
    pub distinct_alleles: usize,
    pub distinct_antigens: usize,
    pub mean_genes_per_chromosome: f64,
    /// Pairings that fell back to unconstrained mate choice
    pub mating_fallbacks: usize,
    /// Species removed during the step, in removal order
    pub extinct_species: Vec<SpeciesId>,
    pub mutations: MutationCounts,
}

impl GenerationSummary {
    /// One JSON object on a single line.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_stats() {
        let stats = FitnessStats::from_values(&[1.0, 3.0, 2.0]);
        assert_eq!(stats.total, 6.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert_eq!(FitnessStats::from_values(&[]), FitnessStats::default());
    }

    #[test]
    fn test_summary_json_line() {
        let summary = GenerationSummary {
            generation: 3,
            host_count: 10,
            pathogen_count: 5,
            species_sizes: vec![SpeciesSize {
                species: 0,
                size: 5,
            }],
            fitness: FitnessStats::from_values(&[1.0]),
            presentation: PresentationTally::default(),
            distinct_alleles: 4,
            distinct_antigens: 2,
            mean_genes_per_chromosome: 2.0,
            mating_fallbacks: 0,
            extinct_species: vec![1],
            mutations: MutationCounts::default(),
        };
        let line = summary.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["generation"], 3);
        assert_eq!(value["species_sizes"][0]["size"], 5);
        assert_eq!(value["extinct_species"][0], 1);
        let back: GenerationSummary = serde_json::from_str(&line).unwrap();
        assert_eq!(back, summary);
    }
}
