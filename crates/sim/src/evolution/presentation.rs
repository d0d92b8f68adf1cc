//! Antigen presentation: which hosts recognise which pathogens.
//!
//! A host gene presents a pathogen when its allele matches any epitope of
//! any of the pathogen's antigens under the configured [`MatchRule`]. The
//! host presents the pathogen when at least one of its genes does, pooling
//! both chromosomes (a heterozygote carries more distinct alleles and so
//! presents more). Unpresented encounters become infections: the host's
//! infection count and the pathogen's `hosts_infected` tally both grow.
//!
//! The pass itself is parallel over hosts. Which pathogens each host meets
//! is drawn from the master RNG beforehand, so results do not depend on the
//! thread count.

use std::ops::AddAssign;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::SimulationError;
use crate::genome::{Genome, Homolog, Host, Pathogen, PresentingGene, SpeciesId};
use crate::simulation::PathogenPopulation;

/// Predicate deciding whether one host allele binds one epitope.
///
/// Both values are compared over the allele domain's bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum MatchRule {
    /// Every bit equal.
    #[default]
    Exact,
    /// At least `min_matching` bits equal in corresponding positions.
    AnyBits { min_matching: u32 },
    /// At least `min_run` consecutive positions equal.
    Contiguous { min_run: u32 },
    /// Every set bit of the allele is also set in the epitope.
    Subset,
}

impl MatchRule {
    /// Evaluate the predicate over the low `bits` bits.
    pub fn matches(self, allele: u64, epitope: u64, bits: u32) -> bool {
        let mask = if bits >= u64::BITS {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        };
        let same = !(allele ^ epitope) & mask;
        match self {
            MatchRule::Exact => same == mask,
            MatchRule::AnyBits { min_matching } => same.count_ones() >= min_matching,
            MatchRule::Contiguous { min_run } => longest_run(same) >= min_run,
            MatchRule::Subset => allele & !epitope & mask == 0,
        }
    }

    /// Reject thresholds no `bits`-wide comparison can reach.
    pub fn validate(self, bits: u32) -> Result<(), SimulationError> {
        let threshold = match self {
            MatchRule::AnyBits { min_matching } => min_matching,
            MatchRule::Contiguous { min_run } => min_run,
            MatchRule::Exact | MatchRule::Subset => return Ok(()),
        };
        if threshold == 0 || threshold > bits {
            return Err(SimulationError::ConfigurationInconsistent(format!(
                "match threshold {threshold} must be between 1 and the allele width {bits}"
            )));
        }
        Ok(())
    }
}

fn longest_run(mut x: u64) -> u32 {
    let mut run = 0;
    while x != 0 {
        x &= x << 1;
        run += 1;
    }
    run
}

/// How a successful presentation is credited to the host's tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZygosityModel {
    /// One point per presented encounter, pooling both chromosomes.
    #[default]
    HeterozygoteUnion,
    /// One point for each chromosome that presents.
    PerChromosome,
    /// One point for every presenting gene.
    AllGenes,
}

/// Which pathogens each host meets in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum InfectionScope {
    /// One random individual from every non-empty species.
    #[default]
    OnePerSpecies,
    /// Every pathogen individual.
    AllPathogens,
    /// One random individual from the given species only.
    SingleSpecies { species: SpeciesId },
}

/// Totals of one presentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationTally {
    pub encounters: u64,
    pub presented: u64,
    pub infections: u64,
}

impl AddAssign for PresentationTally {
    fn add_assign(&mut self, rhs: Self) {
        self.encounters += rhs.encounters;
        self.presented += rhs.presented;
        self.infections += rhs.infections;
    }
}

/// Matching rule plus zygosity model: decides single host/pathogen encounters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presenter {
    pub rule: MatchRule,
    pub zygosity: ZygosityModel,
}

impl Presenter {
    pub fn new(rule: MatchRule, zygosity: ZygosityModel) -> Self {
        Self { rule, zygosity }
    }

    /// Genes of `genome` that present `pathogen`.
    pub fn presenting_genes(&self, genome: &Genome, pathogen: &Pathogen) -> Vec<PresentingGene> {
        let bits = genome.domain().bits();
        genome
            .genes()
            .filter(|(_, _, gene)| {
                pathogen.antigens().iter().any(|antigen| {
                    antigen
                        .epitopes()
                        .iter()
                        .any(|&e| self.rule.matches(gene.allele(), e, bits))
                })
            })
            .map(|(homolog, index, gene)| PresentingGene {
                homolog,
                index,
                allele: gene.allele(),
            })
            .collect()
    }

    /// Resolve one encounter and record it on the host.
    ///
    /// Returns `true` when the pathogen infects the host.
    pub fn encounter(&self, host: &mut Host, pathogen: &Pathogen) -> bool {
        let genes = self.presenting_genes(host.genome(), pathogen);
        if genes.is_empty() {
            host.presentation_mut().record_infected(pathogen.species());
            return true;
        }
        let credit = match self.zygosity {
            ZygosityModel::HeterozygoteUnion => 1,
            ZygosityModel::PerChromosome => {
                let first = genes.iter().any(|g| g.homolog == Homolog::First);
                let second = genes.iter().any(|g| g.homolog == Homolog::Second);
                first as u32 + second as u32
            }
            ZygosityModel::AllGenes => genes.len() as u32,
        };
        host.presentation_mut()
            .record_presented(pathogen.species(), &genes, credit);
        false
    }

    /// Run one presentation pass of every host against the pathogens chosen by `scope`.
    pub fn run_pass<R: Rng + ?Sized>(
        &self,
        hosts: &mut [Host],
        pathogens: &mut PathogenPopulation,
        scope: InfectionScope,
        rng: &mut R,
    ) -> PresentationTally {
        let shared = matches!(scope, InfectionScope::AllPathogens);
        // (species slot, member slot)
        let everyone: Vec<(usize, usize)> = match scope {
            InfectionScope::AllPathogens => pathogens
                .species()
                .iter()
                .enumerate()
                .flat_map(|(s, sp)| (0..sp.size()).map(move |m| (s, m)))
                .collect(),
            _ => Vec::new(),
        };
        let drawn: Vec<Vec<(usize, usize)>> = match scope {
            InfectionScope::AllPathogens => Vec::new(),
            InfectionScope::OnePerSpecies => hosts
                .iter()
                .map(|_| {
                    pathogens
                        .species()
                        .iter()
                        .enumerate()
                        .filter(|(_, sp)| !sp.is_empty())
                        .map(|(s, sp)| (s, rng.random_range(0..sp.size())))
                        .collect()
                })
                .collect(),
            InfectionScope::SingleSpecies { species } => {
                let slot = pathogens
                    .species()
                    .iter()
                    .position(|sp| sp.id() == species && !sp.is_empty());
                hosts
                    .iter()
                    .map(|_| match slot {
                        Some(s) => vec![(s, rng.random_range(0..pathogens.species()[s].size()))],
                        None => Vec::new(),
                    })
                    .collect()
            }
        };

        let population: &PathogenPopulation = pathogens;
        let infections: Vec<Vec<(usize, usize)>> = hosts
            .par_iter_mut()
            .enumerate()
            .map(|(h, host)| {
                let plan = if shared { &everyone } else { &drawn[h] };
                plan.iter()
                    .copied()
                    .filter(|&(s, m)| self.encounter(host, &population.species()[s].members()[m]))
                    .collect()
            })
            .collect();

        let encounters: u64 = if shared {
            (everyone.len() * hosts.len()) as u64
        } else {
            drawn.iter().map(|plan| plan.len() as u64).sum()
        };
        let mut tally = PresentationTally {
            encounters,
            ..Default::default()
        };
        for (s, m) in infections.into_iter().flatten() {
            pathogens.species_mut()[s].members_mut()[m].add_hosts_infected(1);
            tally.infections += 1;
        }
        tally.presented = tally.encounters - tally.infections;
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::AlleleDomain;
    use crate::genome::{Antigen, Chromosome};

    fn host(first: &[u64], second: &[u64]) -> Host {
        let domain = AlleleDomain::from_bits(4).unwrap();
        let genome = Genome::new(
            domain,
            Chromosome::from_alleles(first),
            Chromosome::from_alleles(second),
        )
        .unwrap();
        Host::new(genome, 0, 0)
    }

    fn pathogen(bits: &str) -> Pathogen {
        Pathogen::new(0, vec![Antigen::new(bits.parse().unwrap(), 4).unwrap()], 0, 0)
    }

    #[test]
    fn test_exact_rule() {
        assert!(MatchRule::Exact.matches(0b1010, 0b1010, 4));
        assert!(!MatchRule::Exact.matches(0b1010, 0b1011, 4));
        // Bits above the width are ignored.
        assert!(MatchRule::Exact.matches(0b1010, 0b11010, 4));
    }

    #[test]
    fn test_any_bits_rule() {
        let rule = MatchRule::AnyBits { min_matching: 3 };
        assert!(rule.matches(0b1010, 0b1011, 4));
        assert!(!rule.matches(0b1010, 0b0101, 4));
    }

    #[test]
    fn test_contiguous_rule() {
        let rule = MatchRule::Contiguous { min_run: 3 };
        // agreement 1110 -> run of 3
        assert!(rule.matches(0b1001, 0b1000, 4));
        // agreement 1011 -> longest run 2
        assert!(!rule.matches(0b1000, 0b1100, 4));
    }

    #[test]
    fn test_subset_rule() {
        assert!(MatchRule::Subset.matches(0b0100, 0b0110, 4));
        assert!(!MatchRule::Subset.matches(0b0101, 0b0110, 4));
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(0), 0);
        assert_eq!(longest_run(0b1011_1100), 4);
        assert_eq!(longest_run(u64::MAX), 64);
    }

    #[test]
    fn test_validate_threshold() {
        assert!(MatchRule::AnyBits { min_matching: 5 }.validate(4).is_err());
        assert!(MatchRule::Contiguous { min_run: 0 }.validate(4).is_err());
        assert!(MatchRule::Contiguous { min_run: 4 }.validate(4).is_ok());
        assert!(MatchRule::Exact.validate(4).is_ok());
    }

    #[test]
    fn test_presented_by_either_chromosome() {
        // Epitopes of 011010: 0110, 1101, 1010
        let p = pathogen("011010");
        let presenter = Presenter::default();

        let mut het = host(&[0b0000], &[0b1101]);
        assert!(!presenter.encounter(&mut het, &p));
        assert_eq!(het.presentation().presented(), 1);
        assert_eq!(het.presentation().presenting_genes().len(), 1);

        let mut miss = host(&[0b0000], &[0b1111]);
        assert!(presenter.encounter(&mut miss, &p));
        assert_eq!(miss.presentation().infections(), 1);
        assert_eq!(miss.presentation().presented(), 0);
    }

    #[test]
    fn test_zygosity_credit() {
        let p = pathogen("011010");
        let mut h = host(&[0b0110, 0b1010], &[0b1101]);

        let union = Presenter::new(MatchRule::Exact, ZygosityModel::HeterozygoteUnion);
        union.encounter(&mut h, &p);
        assert_eq!(h.presentation().presented(), 1);

        h.clear_infection_data();
        let per_chr = Presenter::new(MatchRule::Exact, ZygosityModel::PerChromosome);
        per_chr.encounter(&mut h, &p);
        assert_eq!(h.presentation().presented(), 2);

        h.clear_infection_data();
        let all = Presenter::new(MatchRule::Exact, ZygosityModel::AllGenes);
        all.encounter(&mut h, &p);
        assert_eq!(h.presentation().presented(), 3);
        assert!(h
            .presentation()
            .presenting_genes()
            .iter()
            .any(|g| g.homolog == Homolog::Second));
    }

    #[test]
    fn test_serde_tags() {
        let json = serde_json::to_string(&MatchRule::Contiguous { min_run: 3 }).unwrap();
        assert_eq!(json, r#"{"rule":"contiguous","min_run":3}"#);
        let scope: InfectionScope = serde_json::from_str(r#"{"scope":"all_pathogens"}"#).unwrap();
        assert_eq!(scope, InfectionScope::AllPathogens);
    }
}
