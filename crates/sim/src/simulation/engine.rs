//! The generational engine.
//!
//! An [`Environment`] owns one host population, one multi-species pathogen
//! population and the policies chosen at configuration time. Each call to
//! [`Environment::step`] advances the hosts by one generation:
//!
//! 1. check population invariants
//! 2. clear host presentation records
//! 3. per pathogen generation: clear pathogen tallies, run the presentation
//!    pass, reproduce pathogens, sweep extinct species, mutate pathogens
//! 4. score hosts
//! 5. breed the next host generation
//! 6. mutate the newborn hosts only

use std::collections::BTreeSet;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use tracing::{trace, warn};

use super::configs::SimulationConfig;
use super::population::{HostPopulation, PathogenPopulation, SpeciesSize};
use super::stats::{FitnessStats, GenerationSummary};
use crate::base::{AlleleDomain, BitString};
use crate::errors::{SimulationError, SpeciesExtinct};
use crate::evolution::{
    evaluate_hosts, extinction_sweep, mutate_hosts, HostFitness, HostMutation, HostReproduction,
    InfectionScope, MateSelector, MutationCounts, PathogenMutation, PathogenReproduction,
    PresentationTally, Presenter,
};
use crate::genome::{Homolog, Host, SpeciesId, TagSource};

/// Host and pathogen populations plus everything needed to evolve them.
#[derive(Debug)]
pub struct Environment {
    hosts: HostPopulation,
    pathogens: PathogenPopulation,
    domain: AlleleDomain,
    /// Target size under `HostReproduction::Replace`
    host_population_size: usize,
    fitness: Box<dyn HostFitness>,
    mating: Box<dyn MateSelector>,
    host_mutation: HostMutation,
    host_reproduction: HostReproduction,
    pathogen_mutation: PathogenMutation,
    pathogen_reproduction: PathogenReproduction,
    presenter: Presenter,
    scope: InfectionScope,
    pathogen_generations_per_host: usize,
    total_generations: usize,
    rng: Xoshiro256PlusPlus,
    tags: TagSource,
    generation: usize,
}

fn inconsistent(msg: impl Into<String>) -> SimulationError {
    SimulationError::ConfigurationInconsistent(msg.into())
}

impl Environment {
    /// Validate `config` and build both initial populations from its presets.
    pub fn new(config: &SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut rng = master_rng(config.execution.seed);
        let tags = TagSource::new(0);

        let host = &config.host;
        let hosts = host.init.populate(
            host.population_size,
            host.chromosome_length,
            host.alleles,
            &tags,
            0,
            &mut rng,
        )?;

        let layout = config.pathogen_layout();
        let masks = config
            .pathogen
            .conservation
            .draw_masks(&layout.lengths(), &mut rng);
        let pathogens = config
            .pathogen
            .init
            .populate(&layout, masks, &tags, 0, &mut rng)?;

        Self::assemble(config, HostPopulation::new(hosts), pathogens, rng, tags)
    }

    /// Build an environment around existing populations.
    ///
    /// Policies and run length come from `config`; its initialization
    /// presets are ignored.
    pub fn from_parts(
        config: &SimulationConfig,
        hosts: Vec<Host>,
        pathogens: PathogenPopulation,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let rng = master_rng(config.execution.seed);
        let next_tag = next_free_tag(&hosts, &pathogens);
        let env = Self::assemble(
            config,
            HostPopulation::new(hosts),
            pathogens,
            rng,
            TagSource::new(next_tag),
        )?;
        env.check_invariants()?;
        Ok(env)
    }

    fn assemble(
        config: &SimulationConfig,
        hosts: HostPopulation,
        pathogens: PathogenPopulation,
        rng: Xoshiro256PlusPlus,
        tags: TagSource,
    ) -> Result<Self, SimulationError> {
        let presentation = config.presentation;
        Ok(Self {
            hosts,
            pathogens,
            domain: config.host.alleles,
            host_population_size: config.host.population_size,
            fitness: config.host.fitness.build()?,
            mating: config.host.mating.build()?,
            host_mutation: config.host.mutation.clone(),
            host_reproduction: config.host.reproduction,
            pathogen_mutation: config.pathogen.mutation,
            pathogen_reproduction: config.pathogen.reproduction,
            presenter: Presenter::new(presentation.rule, presentation.zygosity),
            scope: presentation.scope,
            pathogen_generations_per_host: config.execution.pathogen_generations_per_host,
            total_generations: config.execution.total_generations,
            rng,
            tags,
            generation: 0,
        })
    }

    // ===== Policies =====

    pub fn set_fitness(&mut self, fitness: Box<dyn HostFitness>) {
        self.fitness = fitness;
    }

    pub fn set_mate_selector(&mut self, mating: Box<dyn MateSelector>) {
        self.mating = mating;
    }

    pub fn set_host_mutation(&mut self, mutation: HostMutation) -> Result<(), SimulationError> {
        mutation.validate()?;
        self.host_mutation = mutation;
        Ok(())
    }

    pub fn set_pathogen_mutation(
        &mut self,
        mutation: PathogenMutation,
    ) -> Result<(), SimulationError> {
        mutation.validate()?;
        self.pathogen_mutation = mutation;
        Ok(())
    }

    pub fn set_host_reproduction(
        &mut self,
        reproduction: HostReproduction,
    ) -> Result<(), SimulationError> {
        reproduction.validate()?;
        self.host_reproduction = reproduction;
        Ok(())
    }

    pub fn set_pathogen_reproduction(
        &mut self,
        reproduction: PathogenReproduction,
    ) -> Result<(), SimulationError> {
        reproduction.validate()?;
        self.pathogen_reproduction = reproduction;
        Ok(())
    }

    pub fn set_presenter(&mut self, presenter: Presenter) -> Result<(), SimulationError> {
        presenter.rule.validate(self.domain.bits())?;
        self.presenter = presenter;
        Ok(())
    }

    pub fn set_infection_scope(&mut self, scope: InfectionScope) {
        self.scope = scope;
    }

    // ===== Pipeline =====

    /// Check the population-level invariants the pipeline relies on.
    pub fn check_invariants(&self) -> Result<(), SimulationError> {
        if self.hosts.is_empty() {
            return Err(inconsistent("the host population is empty"));
        }
        if let Some(host) = self
            .hosts
            .hosts()
            .iter()
            .find(|h| h.genome().domain() != self.domain)
        {
            return Err(inconsistent(format!(
                "host {} uses allele domain {}, expected {}",
                host.tag(),
                host.genome().domain(),
                self.domain
            )));
        }
        if let HostReproduction::AddOffspring { ceiling, .. } = self.host_reproduction {
            if self.hosts.size() > ceiling {
                return Err(inconsistent(format!(
                    "{} hosts exceed the ceiling {ceiling}",
                    self.hosts.size()
                )));
            }
        }
        if self.pathogens.epitope_bits() != self.domain.bits() {
            return Err(inconsistent(format!(
                "epitopes are {} bits wide but alleles are {} bits wide",
                self.pathogens.epitope_bits(),
                self.domain.bits()
            )));
        }

        let mut ids = BTreeSet::new();
        for species in self.pathogens.species() {
            if !ids.insert(species.id()) {
                return Err(inconsistent(format!(
                    "species {} appears twice",
                    species.id()
                )));
            }
            if species.conserved().len() != species.antigen_length() {
                return Err(inconsistent(format!(
                    "species {} has a {}-bit conserved mask for {}-bit antigens",
                    species.id(),
                    species.conserved().len(),
                    species.antigen_length()
                )));
            }
            let stray = species.members().iter().find(|p| {
                p.species() != species.id()
                    || p.antigens().is_empty()
                    || p.antigens().iter().any(|a| {
                        a.len() != species.antigen_length()
                            || a.epitope_bits() != self.domain.bits()
                    })
            });
            if let Some(pathogen) = stray {
                return Err(inconsistent(format!(
                    "pathogen {} does not fit species {}",
                    pathogen.tag(),
                    species.id()
                )));
            }
        }
        Ok(())
    }

    pub fn clear_host_infection_data(&mut self) {
        self.hosts.clear_infection_data();
    }

    pub fn clear_pathogen_infection_data(&mut self) {
        self.pathogens.clear_infection_data();
    }

    /// One presentation pass of every host against the pathogens.
    pub fn infect(&mut self) -> PresentationTally {
        self.presenter.run_pass(
            self.hosts.hosts_mut(),
            &mut self.pathogens,
            self.scope,
            &mut self.rng,
        )
    }

    pub fn evaluate_fitness(&mut self) {
        evaluate_hosts(self.hosts.hosts_mut(), self.fitness.as_ref());
    }

    /// Replace the host population with the next generation.
    ///
    /// Returns the slot of the first newborn and the number of fallback
    /// pairings.
    pub fn reproduce_hosts(&mut self) -> Result<(usize, usize), SimulationError> {
        let parents = self.hosts.take_hosts();
        let brood = self.host_reproduction.reproduce(
            parents,
            self.host_population_size,
            self.mating.as_ref(),
            &self.tags,
            self.generation + 1,
            &mut self.rng,
        )?;
        self.hosts.set_hosts(brood.hosts);
        Ok((brood.offspring_start, brood.mating_fallbacks))
    }

    /// Reproduce every species, then remove species that fell below the
    /// viable size.
    pub fn reproduce_pathogens(&mut self) -> Vec<SpeciesExtinct> {
        self.pathogen_reproduction.reproduce(
            &mut self.pathogens,
            &self.tags,
            self.generation,
            &mut self.rng,
        );
        match self.pathogen_reproduction.min_species_size() {
            Some(min_size) => extinction_sweep(&mut self.pathogens, min_size, self.generation),
            None => Vec::new(),
        }
    }

    /// Mutate every species in parallel. Returns the number of flipped bits.
    pub fn mutate_pathogens(&mut self) -> u64 {
        let mutation = self.pathogen_mutation;
        let epitope_bits = self.pathogens.epitope_bits();
        let seeds: Vec<u64> = (0..self.pathogens.species_count())
            .map(|_| self.rng.random())
            .collect();
        self.pathogens
            .species_mut()
            .par_iter_mut()
            .zip(seeds.par_iter())
            .map(|(species, &seed)| {
                let mut local_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                let protected = species.protected_sites(mutation.restriction).cloned();
                mutation.mutate_members(
                    species.members_mut(),
                    protected.as_ref(),
                    epitope_bits,
                    &mut local_rng,
                )
            })
            .sum()
    }

    /// Mutate the hosts from slot `start` on.
    pub fn mutate_offspring(&mut self, start: usize) -> MutationCounts {
        let hosts = self.hosts.hosts_mut();
        let start = start.min(hosts.len());
        mutate_hosts(
            &mut hosts[start..],
            &self.host_mutation,
            &self.tags,
            self.generation + 1,
            &mut self.rng,
        )
    }

    /// Advance the hosts by one generation.
    ///
    /// An invariant failure returns before any state changes. A host
    /// reproduction failure is reported after this generation's pathogen
    /// stages have already run.
    pub fn step(&mut self) -> Result<GenerationSummary, SimulationError> {
        let started = Instant::now();
        self.check_invariants()?;

        self.clear_host_infection_data();
        let mut presentation = PresentationTally::default();
        let mut extinct = Vec::new();
        let mut mutations = MutationCounts::default();
        for _ in 0..self.pathogen_generations_per_host {
            self.clear_pathogen_infection_data();
            presentation += self.infect();
            extinct.extend(self.reproduce_pathogens());
            mutations.pathogen_bits += self.mutate_pathogens();
        }

        self.evaluate_fitness();
        let fitness = FitnessStats::from_values(&self.hosts.fitness_values());

        let (offspring_start, mating_fallbacks) = self.reproduce_hosts()?;
        if mating_fallbacks > 0 {
            warn!(
                generation = self.generation,
                mating_fallbacks, "mating constraint unsatisfied, used random mates"
            );
        }
        mutations += self.mutate_offspring(offspring_start);
        self.generation += 1;

        let summary = GenerationSummary {
            generation: self.generation,
            host_count: self.hosts.size(),
            pathogen_count: self.pathogens.total_size(),
            species_sizes: self.pathogens.species_sizes(),
            fitness,
            presentation,
            distinct_alleles: self.distinct_alleles(),
            distinct_antigens: self.distinct_antigens(),
            mean_genes_per_chromosome: self.hosts.mean_genes_per_chromosome(),
            mating_fallbacks,
            extinct_species: extinct.iter().map(|e| e.species).collect(),
            mutations,
        };
        trace!(
            generation = self.generation,
            elapsed_us = started.elapsed().as_micros() as u64,
            "step finished"
        );
        Ok(summary)
    }

    /// Run the configured number of generations.
    pub fn run(&mut self) -> Result<Vec<GenerationSummary>, SimulationError> {
        self.run_for(self.total_generations)
    }

    /// Run `generations` more generations.
    pub fn run_for(&mut self, generations: usize) -> Result<Vec<GenerationSummary>, SimulationError> {
        (0..generations).map(|_| self.step()).collect()
    }

    // ===== Queries =====

    /// Number of completed host generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn total_generations(&self) -> usize {
        self.total_generations
    }

    pub fn hosts(&self) -> &HostPopulation {
        &self.hosts
    }

    pub fn pathogens(&self) -> &PathogenPopulation {
        &self.pathogens
    }

    pub fn domain(&self) -> AlleleDomain {
        self.domain
    }

    pub fn host_count(&self) -> usize {
        self.hosts.size()
    }

    pub fn species_sizes(&self) -> Vec<SpeciesSize> {
        self.pathogens.species_sizes()
    }

    pub fn host_fitness(&self) -> Vec<f64> {
        self.hosts.fitness_values()
    }

    /// Every host genome rendered as binary alleles.
    pub fn host_genome_strings(&self) -> Vec<String> {
        self.hosts
            .hosts()
            .iter()
            .map(|h| h.genome().to_string())
            .collect()
    }

    /// Alleles of one host chromosome, one string per gene.
    pub fn host_gene_strings(&self, host: usize, homolog: Homolog) -> Option<Vec<String>> {
        self.hosts.get(host).map(|h| h.gene_strings(homolog))
    }

    /// Antigens of one pathogen, one string per antigen.
    pub fn pathogen_gene_strings(&self, species: SpeciesId, member: usize) -> Option<Vec<String>> {
        self.pathogens
            .find(species)
            .and_then(|s| s.members().get(member))
            .map(|p| p.gene_strings())
    }

    pub fn distinct_alleles(&self) -> usize {
        self.hosts.distinct_alleles().len()
    }

    pub fn distinct_antigens(&self) -> usize {
        self.pathogens.distinct_antigens()
    }

    pub fn presenting_species_counts(&self) -> Vec<usize> {
        self.hosts.presenting_species_counts()
    }

    /// Presented and infection counts of every host.
    pub fn presentation_counts(&self) -> Vec<(u32, u32)> {
        self.hosts
            .hosts()
            .iter()
            .map(|h| (h.presentation().presented(), h.presentation().infections()))
            .collect()
    }

    pub fn fixed_bits_in_antigens(&self, species: SpeciesId) -> Option<BitString> {
        self.pathogens.fixed_bits_in_antigens(species)
    }
}

fn master_rng(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_seed(rand::rng().random()),
    }
}

/// First tag not used by any host, gene or pathogen.
fn next_free_tag(hosts: &[Host], pathogens: &PathogenPopulation) -> u64 {
    let host_tags = hosts.iter().flat_map(|h| {
        std::iter::once(h.tag()).chain(h.genome().genes().map(|(_, _, gene)| gene.tag()))
    });
    let pathogen_tags = pathogens
        .species()
        .iter()
        .flat_map(|s| s.members().iter().map(|p| p.tag()));
    host_tags
        .chain(pathogen_tags)
        .max()
        .map_or(0, |tag| tag + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::{FitnessModel, ForDrift, MutationRate, PointMutation};
    use crate::genome::{Antigen, Chromosome, Genome, Pathogen};
    use crate::simulation::Species;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.execution.seed = Some(7);
        config.execution.total_generations = 3;
        config.host.population_size = 12;
        config.host.alleles = AlleleDomain::from_bits(4).unwrap();
        config.host.chromosome_length = 2;
        config.pathogen.population_size = 20;
        config.pathogen.species = 2;
        config.pathogen.antigen_length = 8;
        config
    }

    fn host(alleles: &[u64]) -> Host {
        let genome = Genome::new(
            AlleleDomain::from_bits(4).unwrap(),
            Chromosome::from_alleles(alleles),
            Chromosome::from_alleles(alleles),
        )
        .unwrap();
        Host::new(genome, 3, 0)
    }

    fn species(id: SpeciesId, bits: &str, size: usize) -> Species {
        let members = (0..size)
            .map(|i| {
                let antigen = Antigen::new(bits.parse().unwrap(), 4).unwrap();
                Pathogen::new(id, vec![antigen], 10 + i as u64, 0)
            })
            .collect();
        Species::new(id, bits.len(), BitString::zeros(bits.len()), members)
    }

    #[test]
    fn test_new_builds_populations() {
        let env = Environment::new(&small_config()).unwrap();
        assert_eq!(env.host_count(), 12);
        assert_eq!(
            env.species_sizes(),
            vec![
                SpeciesSize {
                    species: 0,
                    size: 10
                },
                SpeciesSize {
                    species: 1,
                    size: 10
                }
            ]
        );
        assert_eq!(env.generation(), 0);
        env.check_invariants().unwrap();
    }

    #[test]
    fn test_step_advances_generation() {
        let mut env = Environment::new(&small_config()).unwrap();
        let summary = env.step().unwrap();
        assert_eq!(summary.generation, 1);
        assert_eq!(summary.host_count, 12);
        assert_eq!(env.generation(), 1);
        // One pathogen per species per host.
        assert_eq!(summary.presentation.encounters, 24);
    }

    #[test]
    fn test_run_uses_total_generations() {
        let mut env = Environment::new(&small_config()).unwrap();
        let summaries = env.run().unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(env.generation(), 3);
    }

    #[test]
    fn test_pathogen_generations_per_host() {
        let mut config = small_config();
        config.execution.pathogen_generations_per_host = 3;
        let mut env = Environment::new(&config).unwrap();
        let summary = env.step().unwrap();
        assert_eq!(summary.presentation.encounters, 3 * 24);
    }

    #[test]
    fn test_offspring_only_mutated() {
        let mut config = small_config();
        config.host.reproduction = HostReproduction::AddOffspring {
            offspring: 4,
            ceiling: 16,
        };
        config.host.mutation.point = Some(PointMutation::Resample { probability: 1.0 });
        let mut env = Environment::new(&config).unwrap();
        let before = env.host_genome_strings();
        let summary = env.step().unwrap();
        assert_eq!(env.host_count(), 16);
        // Parents keep their slots and genomes.
        assert_eq!(&env.host_genome_strings()[..12], &before[..]);
        assert!(env.hosts().hosts()[12..].iter().all(|h| h.born() == 1));
        assert!(summary.mutations.point > 0);
    }

    #[test]
    fn test_invariant_failure_leaves_state() {
        let mut config = small_config();
        config.host.population_size = 2;
        let pathogens = PathogenPopulation::new(4, vec![species(0, "01100110", 2)]);
        let mut env =
            Environment::from_parts(&config, vec![host(&[1, 2]), host(&[3])], pathogens).unwrap();
        env.hosts.set_hosts(Vec::new());
        assert!(matches!(
            env.step(),
            Err(SimulationError::ConfigurationInconsistent(_))
        ));
        assert_eq!(env.generation(), 0);
    }

    #[test]
    fn test_from_parts_rejects_stray_pathogen() {
        let mut config = small_config();
        config.host.population_size = 1;
        let mut bad = species(0, "01100110", 2);
        bad.set_members(vec![Pathogen::new(
            5,
            vec![Antigen::new("0110".parse().unwrap(), 4).unwrap()],
            0,
            0,
        )]);
        let pathogens = PathogenPopulation::new(4, vec![bad]);
        let result = Environment::from_parts(&config, vec![host(&[1])], pathogens);
        assert!(matches!(
            result,
            Err(SimulationError::ConfigurationInconsistent(_))
        ));
    }

    #[test]
    fn test_from_parts_tags_continue() {
        let mut config = small_config();
        config.host.population_size = 1;
        let pathogens = PathogenPopulation::new(4, vec![species(0, "01100110", 3)]);
        let env = Environment::from_parts(&config, vec![host(&[1])], pathogens).unwrap();
        assert_eq!(env.tags.peek(), 13);
    }

    #[test]
    fn test_policy_setters() {
        let mut env = Environment::new(&small_config()).unwrap();
        env.set_fitness(Box::new(ForDrift));
        let summary = env.step().unwrap();
        assert_eq!(summary.fitness.max, 1.0);
        assert_eq!(summary.fitness.total, 12.0);
        // Newborns have not been scored yet.
        assert!(env.host_fitness().iter().all(|&f| f == 0.0));

        assert!(env
            .set_pathogen_mutation(PathogenMutation {
                rate: MutationRate::per_bit(2.0),
                ..Default::default()
            })
            .is_err());
        assert!(env
            .set_host_reproduction(HostReproduction::AddOffspring {
                offspring: 0,
                ceiling: 10
            })
            .is_err());
    }

    #[test]
    fn test_fitness_model_builds_for_every_variant() {
        let mut config = small_config();
        config.host.fitness = FitnessModel::ExpScaling { scale: 0.5 };
        let mut env = Environment::new(&config).unwrap();
        env.step().unwrap();
    }

    #[test]
    fn test_reporting_queries() {
        let mut config = small_config();
        config.host.population_size = 2;
        let pathogens = PathogenPopulation::new(
            4,
            vec![species(0, "01100110", 2), species(1, "11110000", 1)],
        );
        let env = Environment::from_parts(
            &config,
            vec![host(&[0b0110, 0b0011]), host(&[0b1111])],
            pathogens,
        )
        .unwrap();
        assert_eq!(env.distinct_alleles(), 3);
        assert_eq!(env.distinct_antigens(), 2);
        assert_eq!(
            env.host_gene_strings(0, Homolog::First).unwrap(),
            vec!["0110".to_string(), "0011".to_string()]
        );
        assert!(env.host_gene_strings(5, Homolog::First).is_none());
        assert_eq!(
            env.pathogen_gene_strings(1, 0).unwrap(),
            vec!["11110000".to_string()]
        );
        assert_eq!(env.fixed_bits_in_antigens(0).unwrap(), BitString::zeros(8));
        assert_eq!(env.presentation_counts(), vec![(0, 0), (0, 0)]);
    }
}
