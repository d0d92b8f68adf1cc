//! Initial host and pathogen populations.
//!
//! Presets mirror the classic set-ups of the coevolution model: random or
//! clonal hosts, and pathogen species that are random, clonal per species, or
//! built as chains of templates that differ from one another in regular bit
//! patterns.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::population::{PathogenPopulation, Species};
use crate::base::{AlleleDomain, BitString};
use crate::errors::SimulationError;
use crate::genome::{Antigen, Chromosome, Genome, Host, Pathogen, SpeciesId, TagSource};

/// How the initial hosts are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum HostInit {
    /// Random genes, `chromosome_length` per chromosome.
    #[default]
    Random,
    /// Random genes; each host draws its chromosome length from the range.
    RandomSized { min_genes: usize, max_genes: usize },
    /// One random homozygous genome shared by every host.
    Clonal,
}

impl HostInit {
    /// Create `size` hosts born at `generation`.
    pub fn populate<R: Rng + ?Sized>(
        &self,
        size: usize,
        chromosome_length: usize,
        domain: AlleleDomain,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
    ) -> Result<Vec<Host>, SimulationError> {
        let hosts = match *self {
            HostInit::Random => (0..size)
                .map(|_| {
                    let genome = Genome::random(domain, chromosome_length, tags, generation, rng);
                    Host::new(genome, tags.next_tag(), generation)
                })
                .collect(),
            HostInit::RandomSized {
                min_genes,
                max_genes,
            } => {
                let (lo, hi) = if min_genes <= max_genes {
                    (min_genes, max_genes)
                } else {
                    (max_genes, min_genes)
                };
                (0..size)
                    .map(|_| {
                        let genes = rng.random_range(lo..=hi);
                        let genome = Genome::random(domain, genes, tags, generation, rng);
                        Host::new(genome, tags.next_tag(), generation)
                    })
                    .collect()
            }
            HostInit::Clonal => {
                let chromosome =
                    Chromosome::random(chromosome_length, domain, tags, generation, rng);
                let genome = Genome::homozygous(domain, chromosome)?;
                (0..size)
                    .map(|_| Host::new(genome.clone(), tags.next_tag(), generation))
                    .collect()
            }
        };
        Ok(hosts)
    }
}

/// How the initial pathogen species are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum PathogenInit {
    /// Every pathogen random.
    #[default]
    UniformGenome,
    /// One random template per species; members are clones.
    DivSpecies,
    /// Chained templates: each flips every `N`th bit of the previous one.
    DistinctSpecies,
    /// Four chained templates shared round-robin by the species.
    FourClades,
}

/// Species sizes for `total` individuals split over at most `species` species.
///
/// Each species gets `total / species`; the remainder is handed out from the
/// first species on, at most one extra per regular member.
pub fn species_sizes(total: usize, species: usize) -> Vec<usize> {
    let species = species.min(total);
    if species == 0 {
        return Vec::new();
    }
    let base = total / species;
    let mut left = total % species;
    (0..species)
        .map(|_| {
            let extra = left.min(base);
            left -= extra;
            base + extra
        })
        .collect()
}

/// Everything the pathogen presets need to know.
#[derive(Debug, Clone)]
pub struct PathogenLayout {
    pub population_size: usize,
    pub species: usize,
    /// Antigen length of each species; shorter lists repeat their last entry.
    pub antigen_lengths: Vec<usize>,
    pub antigens_per_pathogen: usize,
    pub epitope_bits: u32,
}

impl PathogenLayout {
    /// Number of species actually created.
    pub fn species_count(&self) -> usize {
        self.species.min(self.population_size)
    }

    /// Antigen length of every species.
    pub fn lengths(&self) -> Vec<usize> {
        let last = self.antigen_lengths.last().copied().unwrap_or(0);
        (0..self.species_count())
            .map(|i| self.antigen_lengths.get(i).copied().unwrap_or(last))
            .collect()
    }
}

impl PathogenInit {
    /// True for presets that derive species from one another and so need a
    /// single antigen length.
    pub fn is_chained(&self) -> bool {
        matches!(self, PathogenInit::DistinctSpecies | PathogenInit::FourClades)
    }

    /// Build the pathogen population. `masks` holds one conserved-site mask
    /// per species.
    pub fn populate<R: Rng + ?Sized>(
        &self,
        layout: &PathogenLayout,
        masks: Vec<BitString>,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
    ) -> Result<PathogenPopulation, SimulationError> {
        let lengths = layout.lengths();
        if self.is_chained() && lengths.windows(2).any(|w| w[0] != w[1]) {
            return Err(SimulationError::ConfigurationInconsistent(format!(
                "{self:?} needs one antigen length for every species, got {lengths:?}"
            )));
        }
        let sizes = species_sizes(layout.population_size, layout.species);
        if sizes.is_empty() {
            return Ok(PathogenPopulation::new(layout.epitope_bits, Vec::new()));
        }
        let random_antigens =
            |len: usize, rng: &mut R| -> Result<Vec<Antigen>, SimulationError> {
                (0..layout.antigens_per_pathogen)
                    .map(|_| Ok(Antigen::random(len, layout.epitope_bits, rng)?))
                    .collect()
            };

        let mut species = Vec::with_capacity(sizes.len());
        match self {
            PathogenInit::UniformGenome => {
                for (i, (&size, mask)) in sizes.iter().zip(masks).enumerate() {
                    let id = i as SpeciesId;
                    let members = (0..size)
                        .map(|_| {
                            let antigens = random_antigens(lengths[i], rng)?;
                            Ok(Pathogen::new(id, antigens, tags.next_tag(), generation))
                        })
                        .collect::<Result<Vec<_>, SimulationError>>()?;
                    species.push(Species::new(id, lengths[i], mask, members));
                }
            }
            PathogenInit::DivSpecies => {
                for (i, (&size, mask)) in sizes.iter().zip(masks).enumerate() {
                    let template = random_antigens(lengths[i], rng)?;
                    species.push(clone_species(
                        i as SpeciesId,
                        lengths[i],
                        mask,
                        &template,
                        size,
                        tags,
                        generation,
                    ));
                }
            }
            PathogenInit::DistinctSpecies | PathogenInit::FourClades => {
                let clades = matches!(self, PathogenInit::FourClades);
                let count = if clades { 4 } else { sizes.len() };
                let first = random_antigens(lengths.first().copied().unwrap_or(0), rng)?;
                let templates = chained_templates(first, count, |k| match (clades, k % 2 == 1) {
                    (true, true) => 2,
                    (false, true) => k,
                    (_, false) => 1,
                });
                for (i, (&size, mask)) in sizes.iter().zip(masks).enumerate() {
                    let s = clone_species(
                        i as SpeciesId,
                        lengths[i],
                        mask,
                        &templates[i % templates.len()],
                        size,
                        tags,
                        generation,
                    );
                    species.push(if clades { s.with_clade((i % 4) as u32) } else { s });
                }
            }
        }
        Ok(PathogenPopulation::new(layout.epitope_bits, species))
    }
}

/// `count` templates where template `k` flips every `nth(k)`th bit of template `k - 1`.
fn chained_templates(
    first: Vec<Antigen>,
    count: usize,
    nth: impl Fn(usize) -> usize,
) -> Vec<Vec<Antigen>> {
    let mut templates = vec![first];
    for k in 1..count {
        let next = templates[k - 1]
            .iter()
            .map(|a| a.with_every_nth_flipped(nth(k)))
            .collect();
        templates.push(next);
    }
    templates
}

fn clone_species(
    id: SpeciesId,
    antigen_length: usize,
    mask: BitString,
    template: &[Antigen],
    size: usize,
    tags: &TagSource,
    generation: usize,
) -> Species {
    let members = (0..size)
        .map(|_| Pathogen::new(id, template.to_vec(), tags.next_tag(), generation))
        .collect();
    Species::new(id, antigen_length, mask, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn layout(size: usize, species: usize) -> PathogenLayout {
        PathogenLayout {
            population_size: size,
            species,
            antigen_lengths: vec![12],
            antigens_per_pathogen: 2,
            epitope_bits: 4,
        }
    }

    fn masks(n: usize, len: usize) -> Vec<BitString> {
        (0..n).map(|_| BitString::zeros(len)).collect()
    }

    #[test]
    fn test_species_sizes() {
        assert_eq!(species_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(species_sizes(9, 3), vec![3, 3, 3]);
        assert_eq!(species_sizes(3, 5), vec![1, 1, 1]);
        assert_eq!(species_sizes(10, 6), vec![2, 2, 2, 2, 1, 1]);
        assert!(species_sizes(0, 2).is_empty());
        for (total, n) in [(17, 4), (100, 7), (5, 5)] {
            assert_eq!(species_sizes(total, n).iter().sum::<usize>(), total);
        }
    }

    #[test]
    fn test_host_presets() {
        let domain = AlleleDomain::from_bits(6).unwrap();
        let tags = TagSource::new(0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        let random = HostInit::Random
            .populate(5, 3, domain, &tags, 0, &mut rng)
            .unwrap();
        assert_eq!(random.len(), 5);
        assert!(random.iter().all(|h| h.genome().gene_count() == 6));

        let sized = HostInit::RandomSized {
            min_genes: 4,
            max_genes: 2,
        }
        .populate(20, 3, domain, &tags, 0, &mut rng)
        .unwrap();
        for h in &sized {
            for chr in h.genome().chromosomes() {
                assert!((2..=4).contains(&chr.len()));
            }
        }

        let clonal = HostInit::Clonal
            .populate(4, 3, domain, &tags, 0, &mut rng)
            .unwrap();
        assert!(clonal.iter().all(|h| h.genome().is_homozygous()));
        assert!(clonal
            .windows(2)
            .all(|w| w[0].genome().same_alleles(w[1].genome())));
        let tags_seen: std::collections::BTreeSet<_> = clonal.iter().map(Host::tag).collect();
        assert_eq!(tags_seen.len(), 4);
    }

    #[test]
    fn test_uniform_genome() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let pop = PathogenInit::UniformGenome
            .populate(&layout(10, 3), masks(3, 12), &TagSource::new(0), 0, &mut rng)
            .unwrap();
        assert_eq!(pop.species_count(), 3);
        assert_eq!(pop.total_size(), 10);
        let p = &pop.species()[0].members()[0];
        assert_eq!(p.antigens().len(), 2);
        assert_eq!(p.antigens()[0].epitopes().len(), 9);
    }

    #[test]
    fn test_div_species_clones() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let pop = PathogenInit::DivSpecies
            .populate(&layout(9, 3), masks(3, 12), &TagSource::new(0), 0, &mut rng)
            .unwrap();
        for s in pop.species() {
            let first = s.members()[0].antigens();
            assert!(s.members().iter().all(|p| p.antigens() == first));
            assert!(s.members().iter().all(|p| p.species() == s.id()));
        }
    }

    #[test]
    fn test_distinct_species_chain() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let pop = PathogenInit::DistinctSpecies
            .populate(&layout(6, 3), masks(3, 12), &TagSource::new(0), 0, &mut rng)
            .unwrap();
        let t0 = &pop.species()[0].members()[0].antigens()[0];
        let t1 = &pop.species()[1].members()[0].antigens()[0];
        let t2 = &pop.species()[2].members()[0].antigens()[0];
        // k = 1: every bit flipped; k = 2: every bit flipped again.
        assert_eq!(t1, &t0.with_every_nth_flipped(1));
        assert_eq!(t2, t0);
    }

    #[test]
    fn test_four_clades() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let pop = PathogenInit::FourClades
            .populate(&layout(12, 6), masks(6, 12), &TagSource::new(0), 0, &mut rng)
            .unwrap();
        let clades: Vec<_> = pop.species().iter().map(|s| s.clade()).collect();
        assert_eq!(
            clades,
            vec![Some(0), Some(1), Some(2), Some(3), Some(0), Some(1)]
        );
        assert_eq!(
            pop.species()[4].members()[0].antigens(),
            pop.species()[0].members()[0].antigens()
        );
        let t0 = &pop.species()[0].members()[0].antigens()[0];
        let t1 = &pop.species()[1].members()[0].antigens()[0];
        assert_eq!(t1, &t0.with_every_nth_flipped(2));
    }

    #[test]
    fn test_chained_presets_need_one_length() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(6);
        let mut l = layout(6, 2);
        l.antigen_lengths = vec![12, 16];
        let two_masks = || vec![BitString::zeros(12), BitString::zeros(16)];
        let err = PathogenInit::FourClades
            .populate(&l, two_masks(), &TagSource::new(0), 0, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SimulationError::ConfigurationInconsistent(_)));

        let pop = PathogenInit::DivSpecies
            .populate(&l, two_masks(), &TagSource::new(0), 0, &mut rng)
            .unwrap();
        assert_eq!(pop.species()[1].antigen_length(), 16);
        assert_eq!(pop.species()[1].members()[0].antigens()[0].len(), 16);
    }
}
