//! End-to-end runs of small, fully specified environments.

use mhcevo_sim::base::{AlleleDomain, BitString};
use mhcevo_sim::evolution::{FitnessModel, HostReproduction, PathogenReproduction};
use mhcevo_sim::genome::{Antigen, Chromosome, Genome, Host, Pathogen, SpeciesId};
use mhcevo_sim::simulation::{
    Environment, PathogenPopulation, SimulationBuilder, SimulationConfig, Species, SpeciesSize,
};

fn domain() -> AlleleDomain {
    AlleleDomain::from_bits(4).unwrap()
}

fn host(tag: u64, alleles: &[u64]) -> Host {
    let genome = Genome::new(
        domain(),
        Chromosome::from_alleles(alleles),
        Chromosome::from_alleles(alleles),
    )
    .unwrap();
    Host::new(genome, tag, 0)
}

fn species(id: SpeciesId, antigen: &str, size: usize) -> Species {
    let members = (0..size)
        .map(|i| {
            let antigen = Antigen::new(antigen.parse().unwrap(), 4).unwrap();
            Pathogen::new(id, vec![antigen], 100 * u64::from(id) + i as u64, 0)
        })
        .collect();
    Species::new(id, antigen.len(), BitString::zeros(antigen.len()), members)
}

/// 10 hosts against one species of 5 antigen variants, no mutation.
fn ten_host_config() -> SimulationConfig {
    SimulationBuilder::new()
        .host_population_size(10)
        .generations(20)
        .alleles(16)
        .chromosome_length(4)
        .pathogen_population_size(5)
        .species(1)
        .antigen_length(8)
        .fitness(FitnessModel::PlainPresent)
        .host_reproduction(HostReproduction::Replace)
        .seed(2024)
        .build_config()
        .unwrap()
}

#[test]
fn test_ten_hosts_one_species_keeps_size() {
    let mut env = Environment::new(&ten_host_config()).unwrap();
    assert_eq!(env.pathogens().species()[0].size(), 5);

    for summary in env.run().unwrap() {
        assert_eq!(summary.host_count, 10);
        assert_eq!(summary.pathogen_count, 5);
        assert_eq!(summary.presentation.encounters, 10);
        assert_eq!(
            summary.presentation.presented + summary.presentation.infections,
            10
        );
        // Plain presentation: the fitness mass is the presented tally.
        assert_eq!(
            summary.fitness.total,
            summary.presentation.presented as f64
        );
        assert_eq!(summary.mutations.point, 0);
        assert_eq!(summary.mutations.pathogen_bits, 0);
    }
    assert_eq!(env.generation(), 20);
}

#[test]
fn test_fitness_equals_presented_per_host() {
    let mut env = Environment::new(&ten_host_config()).unwrap();
    env.clear_host_infection_data();
    env.clear_pathogen_infection_data();
    env.infect();
    env.evaluate_fitness();

    let fitness = env.host_fitness();
    for (f, (presented, infections)) in fitness.iter().zip(env.presentation_counts()) {
        assert_eq!(*f, f64::from(presented));
        assert_eq!(presented + infections, 1);
    }
}

#[test]
fn test_flex_removes_species_left_with_one_member() {
    let config = SimulationBuilder::new()
        .host_population_size(4)
        .generations(1)
        .alleles(16)
        .chromosome_length(2)
        .pathogen_population_size(6)
        .species(2)
        .antigen_length(8)
        .pathogen_reproduction(PathogenReproduction::FlexPopSizes {
            ceiling: 6,
            min_species_size: 2,
        })
        .seed(5)
        .build_config()
        .unwrap();
    // Every host presents both species, so nobody infects and the wheel
    // leaves both species as they are.
    let hosts = (0..4).map(|t| host(t, &[0b1111, 0b0000])).collect();
    let pathogens = PathogenPopulation::new(
        4,
        vec![species(0, "11111111", 5), species(1, "00000000", 1)],
    );
    let mut env = Environment::from_parts(&config, hosts, pathogens).unwrap();

    let summary = env.step().unwrap();
    assert_eq!(summary.presentation.infections, 0);
    assert_eq!(summary.extinct_species, vec![1]);
    assert_eq!(
        summary.species_sizes,
        vec![SpeciesSize {
            species: 0,
            size: 5
        }]
    );

    // The run continues with the survivor.
    let summary = env.step().unwrap();
    assert!(summary.extinct_species.is_empty());
    assert_eq!(env.pathogens().species_count(), 1);
}

#[test]
fn test_flex_gives_slots_to_infecting_species() {
    let config = SimulationBuilder::new()
        .host_population_size(4)
        .generations(1)
        .alleles(16)
        .chromosome_length(1)
        .pathogen_population_size(6)
        .species(2)
        .antigen_length(8)
        .pathogen_reproduction(PathogenReproduction::FlexPopSizes {
            ceiling: 8,
            min_species_size: 2,
        })
        .seed(11)
        .build_config()
        .unwrap();
    // Hosts only present species 1; species 0 infects everyone.
    let hosts = (0..4).map(|t| host(t, &[0b0000])).collect();
    let pathogens = PathogenPopulation::new(
        4,
        vec![species(0, "11111111", 3), species(1, "00000000", 3)],
    );
    let mut env = Environment::from_parts(&config, hosts, pathogens).unwrap();

    let summary = env.step().unwrap();
    assert_eq!(summary.presentation.infections, 4);
    assert_eq!(summary.extinct_species, vec![1]);
    assert_eq!(summary.pathogen_count, 8);
    // Infected hosts score nothing, presenting hosts score one each.
    assert_eq!(summary.fitness.total, 4.0);
}

#[test]
fn test_add_offspring_respects_ceiling() {
    let mut env = SimulationBuilder::new()
        .host_population_size(10)
        .generations(6)
        .alleles(16)
        .chromosome_length(2)
        .pathogen_population_size(10)
        .species(2)
        .antigen_length(8)
        .host_reproduction(HostReproduction::AddOffspring {
            offspring: 4,
            ceiling: 20,
        })
        .seed(8)
        .build()
        .unwrap();
    let sizes: Vec<usize> = env
        .run()
        .unwrap()
        .iter()
        .map(|s| s.host_count)
        .collect();
    assert_eq!(sizes, vec![14, 18, 20, 20, 20, 20]);
}
