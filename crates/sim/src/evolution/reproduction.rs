//! Reproduction schemes for hosts and pathogens.
//!
//! Hosts reproduce sexually: a mother is drawn by fitness, a father by the
//! configured [`MateSelector`], and the child takes one random chromosome
//! from each. Pathogens reproduce clonally in proportion to the number of
//! hosts they infected.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::mating::{MateSelector, MatingPool};
use super::selection::Roulette;
use crate::errors::{GenomeError, SimulationError, SpeciesExtinct};
use crate::genome::{Genome, Host, Pathogen, TagSource};
use crate::simulation::PathogenPopulation;

/// How the next host generation is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum HostReproduction {
    /// The parents are replaced by exactly `population_size` children.
    #[default]
    Replace,
    /// `offspring` children join the parents; random parents die while the
    /// population exceeds `ceiling`.
    AddOffspring { offspring: usize, ceiling: usize },
}

/// Result of one round of host reproduction.
#[derive(Debug)]
pub struct HostBrood {
    /// The new population: surviving parents first, then children.
    pub hosts: Vec<Host>,
    /// Slot of the first child in `hosts`.
    pub offspring_start: usize,
    /// Pairings that fell back to unconstrained mate choice.
    pub mating_fallbacks: usize,
}

impl HostReproduction {
    pub fn validate(&self) -> Result<(), SimulationError> {
        match *self {
            HostReproduction::Replace => Ok(()),
            HostReproduction::AddOffspring { offspring, ceiling } => {
                if ceiling < 2 {
                    return Err(SimulationError::ConfigurationInconsistent(format!(
                        "host ceiling must be at least 2, got {ceiling}"
                    )));
                }
                if offspring == 0 {
                    return Err(SimulationError::ConfigurationInconsistent(
                        "AddOffspring needs at least one offspring per generation".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Produce the next host generation from `parents`.
    ///
    /// `population_size` is the target size under [`HostReproduction::Replace`].
    pub fn reproduce<R: Rng + ?Sized>(
        &self,
        parents: Vec<Host>,
        population_size: usize,
        selector: &dyn MateSelector,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
    ) -> Result<HostBrood, SimulationError> {
        if parents.is_empty() {
            return Err(SimulationError::EmptyPopulation("hosts"));
        }
        match *self {
            HostReproduction::Replace => {
                let (hosts, mating_fallbacks) =
                    breed(&parents, population_size, selector, tags, generation, rng)?;
                Ok(HostBrood {
                    hosts,
                    offspring_start: 0,
                    mating_fallbacks,
                })
            }
            HostReproduction::AddOffspring { offspring, ceiling } => {
                let (mut children, mating_fallbacks) =
                    breed(&parents, offspring, selector, tags, generation, rng)?;
                let excess = (parents.len() + children.len()).saturating_sub(ceiling);
                let deaths = excess.min(parents.len());
                let mut survivors = parents;
                if deaths > 0 {
                    let mut doomed = index::sample(rng, survivors.len(), deaths).into_vec();
                    doomed.sort_unstable();
                    for slot in doomed.into_iter().rev() {
                        survivors.swap_remove(slot);
                    }
                }
                children.truncate(ceiling.saturating_sub(survivors.len()));
                let offspring_start = survivors.len();
                survivors.extend(children);
                Ok(HostBrood {
                    hosts: survivors,
                    offspring_start,
                    mating_fallbacks,
                })
            }
        }
    }
}

/// Build `count` children of `parents`.
///
/// Each child draws from its own seeded RNG so the result does not depend on
/// the thread count. Lineage tags are handed out in child order afterwards.
fn breed<R: Rng + ?Sized>(
    parents: &[Host],
    count: usize,
    selector: &dyn MateSelector,
    tags: &TagSource,
    generation: usize,
    rng: &mut R,
) -> Result<(Vec<Host>, usize), SimulationError> {
    let pool = MatingPool::new(parents);
    let domain = parents[0].genome().domain();
    let seeds: Vec<u64> = (0..count).map(|_| rng.random()).collect();

    let zygotes: Vec<(Genome, bool, Option<u32>)> = seeds
        .par_iter()
        .map(|&seed| -> Result<(Genome, bool, Option<u32>), GenomeError> {
            let mut local_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let mother = pool.roulette().spin(&mut local_rng);
            let choice = selector.select_mate(mother, &pool, &mut local_rng);
            let father = choice.index();
            let genome = Genome::from_gametes(
                domain,
                parents[mother].genome().gamete(&mut local_rng),
                parents[father].genome().gamete(&mut local_rng),
            )?;
            Ok((genome, choice.is_fallback(), parents[mother].clade()))
        })
        .collect::<Result<_, _>>()
        .map_err(|e| {
            SimulationError::ConfigurationInconsistent(format!("parents cannot mate: {e}"))
        })?;

    let fallbacks = zygotes.iter().filter(|(_, fell_back, _)| *fell_back).count();
    // Children keep the mother's clade label.
    let children = zygotes
        .into_iter()
        .map(|(genome, _, clade)| {
            let mut child = Host::new(genome, tags.next_tag(), generation);
            child.set_clade(clade);
            child
        })
        .collect();
    Ok((children, fallbacks))
}

/// How pathogen species reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum PathogenReproduction {
    /// Every species keeps its size.
    #[default]
    FixedPopSizes,
    /// Species compete for `ceiling` slots; those left with fewer than
    /// `min_species_size` members go extinct.
    FlexPopSizes {
        ceiling: usize,
        min_species_size: usize,
    },
}

impl PathogenReproduction {
    pub fn validate(&self) -> Result<(), SimulationError> {
        match *self {
            PathogenReproduction::FixedPopSizes => Ok(()),
            PathogenReproduction::FlexPopSizes {
                ceiling,
                min_species_size,
            } => {
                if ceiling == 0 || ceiling < min_species_size {
                    return Err(SimulationError::ConfigurationInconsistent(format!(
                        "pathogen ceiling {ceiling} is below the minimum species size {min_species_size}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Smallest viable species, if the scheme enforces one.
    pub fn min_species_size(&self) -> Option<usize> {
        match *self {
            PathogenReproduction::FixedPopSizes => None,
            PathogenReproduction::FlexPopSizes {
                min_species_size, ..
            } => Some(min_species_size),
        }
    }

    /// Replace every species' members with offspring.
    pub fn reproduce<R: Rng + ?Sized>(
        &self,
        population: &mut PathogenPopulation,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
    ) {
        match *self {
            PathogenReproduction::FixedPopSizes => {
                for species in population.species_mut() {
                    let wheel = Roulette::new(
                        species
                            .members()
                            .iter()
                            .map(|p| f64::from(p.hosts_infected())),
                    );
                    if wheel.is_uniform() {
                        continue;
                    }
                    let parents = species.take_members();
                    let children = (0..parents.len())
                        .map(|_| parents[wheel.spin(rng)].offspring(tags.next_tag(), generation))
                        .collect();
                    species.set_members(children);
                }
            }
            PathogenReproduction::FlexPopSizes { ceiling, .. } => {
                let slots: Vec<(usize, usize)> = population
                    .species()
                    .iter()
                    .enumerate()
                    .flat_map(|(s, sp)| (0..sp.size()).map(move |m| (s, m)))
                    .collect();
                let wheel = Roulette::new(slots.iter().map(|&(s, m)| {
                    f64::from(population.species()[s].members()[m].hosts_infected())
                }));
                if wheel.is_empty() || wheel.is_uniform() {
                    return;
                }
                let parents: Vec<Vec<Pathogen>> = population
                    .species_mut()
                    .iter_mut()
                    .map(|s| s.take_members())
                    .collect();
                for _ in 0..ceiling {
                    let (s, m) = slots[wheel.spin(rng)];
                    let child = parents[s][m].offspring(tags.next_tag(), generation);
                    population.species_mut()[s].push(child);
                }
            }
        }
    }
}

/// Remove species below `min_size`, reporting each one.
pub fn extinction_sweep(
    population: &mut PathogenPopulation,
    min_size: usize,
    generation: usize,
) -> Vec<SpeciesExtinct> {
    population
        .remove_species_below(min_size)
        .into_iter()
        .map(|(species, last_size)| {
            let event = SpeciesExtinct {
                species,
                last_size,
                generation,
            };
            info!(species, last_size, generation, "{event}");
            event
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{AlleleDomain, BitString};
    use crate::evolution::mating::{DisassortativeMating, MateSearch, MhcConstraint, RandomMating};
    use crate::genome::{Antigen, Chromosome};
    use crate::simulation::Species;

    fn rng(seed: u64) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(seed)
    }

    fn hosts(n: usize) -> Vec<Host> {
        let domain = AlleleDomain::from_bits(4).unwrap();
        (0..n)
            .map(|i| {
                let chr = Chromosome::from_alleles(&[i as u64 % 16, (i as u64 + 1) % 16]);
                let mut h = Host::new(Genome::homozygous(domain, chr).unwrap(), i as u64, 0);
                h.set_fitness(1.0);
                h
            })
            .collect()
    }

    fn pathogen_population(sizes: &[usize]) -> PathogenPopulation {
        let species = sizes
            .iter()
            .enumerate()
            .map(|(s, &n)| {
                let members = (0..n)
                    .map(|m| {
                        let bits = BitString::from_bools(&[m % 2 == 0, true, false, s % 2 == 0]);
                        Pathogen::new(s as u32, vec![Antigen::new(bits, 2).unwrap()], 0, 0)
                    })
                    .collect();
                Species::new(s as u32, 4, BitString::zeros(4), members)
            })
            .collect();
        PathogenPopulation::new(2, species)
    }

    #[test]
    fn test_replace_keeps_size() {
        let tags = TagSource::new(100);
        let brood = HostReproduction::Replace
            .reproduce(hosts(8), 12, &RandomMating, &tags, 1, &mut rng(1))
            .unwrap();
        assert_eq!(brood.hosts.len(), 12);
        assert_eq!(brood.offspring_start, 0);
        assert!(brood.hosts.iter().all(|h| h.born() == 1 && h.tag() >= 100));
    }

    #[test]
    fn test_children_inherit_parent_chromosomes() {
        let parents = hosts(5);
        let parental: Vec<Chromosome> = parents
            .iter()
            .map(|h| h.genome().chromosome(crate::genome::Homolog::First).clone())
            .collect();
        let tags = TagSource::new(0);
        let brood = HostReproduction::Replace
            .reproduce(parents, 20, &RandomMating, &tags, 1, &mut rng(2))
            .unwrap();
        for child in &brood.hosts {
            for chr in child.genome().chromosomes() {
                assert!(parental.contains(chr));
            }
        }
    }

    #[test]
    fn test_children_keep_clade_label() {
        let mut parents = hosts(4);
        for h in &mut parents {
            h.set_clade(Some(3));
        }
        let tags = TagSource::new(0);
        let brood = HostReproduction::Replace
            .reproduce(parents, 6, &RandomMating, &tags, 1, &mut rng(4))
            .unwrap();
        assert!(brood.hosts.iter().all(|h| h.clade() == Some(3)));
    }

    #[test]
    fn test_add_offspring_respects_ceiling() {
        let tags = TagSource::new(0);
        let scheme = HostReproduction::AddOffspring {
            offspring: 4,
            ceiling: 10,
        };
        let brood = scheme
            .reproduce(hosts(8), 8, &RandomMating, &tags, 3, &mut rng(3))
            .unwrap();
        assert_eq!(brood.hosts.len(), 10);
        assert_eq!(brood.offspring_start, 6);
        assert!(brood.hosts[6..].iter().all(|h| h.born() == 3));
        assert!(brood.hosts[..6].iter().all(|h| h.born() == 0));

        let under = HostReproduction::AddOffspring {
            offspring: 2,
            ceiling: 100,
        };
        let brood = under
            .reproduce(hosts(8), 8, &RandomMating, &tags, 3, &mut rng(4))
            .unwrap();
        assert_eq!(brood.hosts.len(), 10);
        assert_eq!(brood.offspring_start, 8);
    }

    #[test]
    fn test_add_offspring_truncates_excess_children() {
        let tags = TagSource::new(0);
        let scheme = HostReproduction::AddOffspring {
            offspring: 30,
            ceiling: 10,
        };
        let brood = scheme
            .reproduce(hosts(4), 4, &RandomMating, &tags, 1, &mut rng(5))
            .unwrap();
        assert_eq!(brood.hosts.len(), 10);
        assert_eq!(brood.offspring_start, 0);
    }

    #[test]
    fn test_fallbacks_counted() {
        // Every host shares allele 1 with every other.
        let domain = AlleleDomain::from_bits(4).unwrap();
        let parents: Vec<Host> = (0..4)
            .map(|i| {
                let chr = Chromosome::from_alleles(&[1, i]);
                Host::new(Genome::homozygous(domain, chr).unwrap(), 0, 0)
            })
            .collect();
        let selector = DisassortativeMating::new(MhcConstraint::NoCommon, MateSearch::default());
        let brood = HostReproduction::Replace
            .reproduce(parents, 6, &selector, &TagSource::new(0), 1, &mut rng(6))
            .unwrap();
        assert_eq!(brood.mating_fallbacks, 6);
    }

    #[test]
    fn test_empty_parents_is_error() {
        let err = HostReproduction::Replace
            .reproduce(Vec::new(), 4, &RandomMating, &TagSource::new(0), 1, &mut rng(7))
            .unwrap_err();
        assert!(matches!(err, SimulationError::EmptyPopulation(_)));
    }

    #[test]
    fn test_validation() {
        assert!(HostReproduction::AddOffspring {
            offspring: 1,
            ceiling: 1
        }
        .validate()
        .is_err());
        assert!(PathogenReproduction::FlexPopSizes {
            ceiling: 3,
            min_species_size: 5
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_fixed_pop_sizes_follows_infections() {
        let mut pop = pathogen_population(&[4, 3]);
        pop.species_mut()[0].members_mut()[2].add_hosts_infected(5);
        let before: Vec<Pathogen> = pop.species()[1].members().to_vec();
        PathogenReproduction::FixedPopSizes.reproduce(&mut pop, &TagSource::new(0), 1, &mut rng(8));

        assert_eq!(pop.species()[0].size(), 4);
        let winner = pop.species()[0].members()[0].antigens().to_vec();
        assert!(pop.species()[0]
            .members()
            .iter()
            .all(|p| p.antigens() == winner.as_slice() && p.hosts_infected() == 0));
        // No infections: left unchanged.
        assert_eq!(pop.species()[1].members(), before.as_slice());
    }

    #[test]
    fn test_flex_pop_sizes_resamples_to_ceiling() {
        let mut pop = pathogen_population(&[3, 3]);
        pop.species_mut()[1].members_mut()[0].add_hosts_infected(2);
        let scheme = PathogenReproduction::FlexPopSizes {
            ceiling: 8,
            min_species_size: 2,
        };
        scheme.reproduce(&mut pop, &TagSource::new(0), 1, &mut rng(9));
        assert_eq!(pop.total_size(), 8);
        assert_eq!(pop.species()[0].size(), 0);

        let extinct = extinction_sweep(&mut pop, 2, 1);
        assert_eq!(extinct.len(), 1);
        assert_eq!(extinct[0].species, 0);
        assert_eq!(pop.species_count(), 1);
    }

    #[test]
    fn test_flex_pop_sizes_no_infections_unchanged() {
        let mut pop = pathogen_population(&[2, 5]);
        let scheme = PathogenReproduction::FlexPopSizes {
            ceiling: 20,
            min_species_size: 1,
        };
        scheme.reproduce(&mut pop, &TagSource::new(0), 1, &mut rng(10));
        assert_eq!(pop.total_size(), 7);
    }
}
