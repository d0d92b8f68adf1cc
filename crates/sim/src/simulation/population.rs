//! Host and pathogen populations.
//!
//! Hosts live in one flat list of slots. Pathogens are grouped by species;
//! species keep their identifier and order for the whole run, and carry the
//! per-species antigen length and conserved-site mask.

use std::collections::{BTreeSet, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::base::BitString;
use crate::evolution::MutationRestriction;
use crate::genome::{Host, Pathogen, SpeciesId};

/// A population of diploid hosts.
#[derive(Debug, Clone, Default)]
pub struct HostPopulation {
    hosts: Vec<Host>,
}

impl HostPopulation {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }

    /// Number of hosts.
    pub fn size(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn hosts_mut(&mut self) -> &mut [Host] {
        &mut self.hosts
    }

    /// Replace the entire population.
    pub fn set_hosts(&mut self, hosts: Vec<Host>) {
        self.hosts = hosts;
    }

    pub(crate) fn take_hosts(&mut self) -> Vec<Host> {
        std::mem::take(&mut self.hosts)
    }

    pub fn get(&self, index: usize) -> Option<&Host> {
        self.hosts.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Host> {
        self.hosts.get_mut(index)
    }

    /// Reset presentation records and fitness of every host.
    pub fn clear_infection_data(&mut self) {
        self.hosts
            .par_iter_mut()
            .for_each(Host::clear_infection_data);
    }

    pub fn fitness_values(&self) -> Vec<f64> {
        self.hosts.iter().map(Host::fitness).collect()
    }

    /// Distinct alleles carried anywhere in the population.
    pub fn distinct_alleles(&self) -> BTreeSet<u64> {
        self.hosts
            .par_iter()
            .map(|h| h.genome().unique_alleles())
            .reduce(BTreeSet::new, |mut a, b| {
                a.extend(b);
                a
            })
    }

    /// Mean number of genes per chromosome, 0 for an empty population.
    pub fn mean_genes_per_chromosome(&self) -> f64 {
        if self.hosts.is_empty() {
            return 0.0;
        }
        let genes: usize = self.hosts.iter().map(|h| h.genome().gene_count()).sum();
        genes as f64 / (2 * self.hosts.len()) as f64
    }

    /// Number of pathogen species each host presented this generation.
    pub fn presenting_species_counts(&self) -> Vec<usize> {
        self.hosts.iter().map(Host::presenting_species_count).collect()
    }
}

/// Size of one pathogen species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesSize {
    pub species: SpeciesId,
    pub size: usize,
}

/// One pathogen species.
#[derive(Debug, Clone)]
pub struct Species {
    id: SpeciesId,
    clade: Option<u32>,
    antigen_length: usize,
    conserved: BitString,
    members: Vec<Pathogen>,
}

impl Species {
    /// Create a species. `conserved` must be `antigen_length` bits long.
    pub fn new(
        id: SpeciesId,
        antigen_length: usize,
        conserved: BitString,
        members: Vec<Pathogen>,
    ) -> Self {
        debug_assert_eq!(conserved.len(), antigen_length);
        Self {
            id,
            clade: None,
            antigen_length,
            conserved,
            members,
        }
    }

    pub fn with_clade(mut self, clade: u32) -> Self {
        self.clade = Some(clade);
        self
    }

    #[inline]
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    #[inline]
    pub fn clade(&self) -> Option<u32> {
        self.clade
    }

    #[inline]
    pub fn antigen_length(&self) -> usize {
        self.antigen_length
    }

    /// Sites that never mutate under a conserved restriction.
    pub fn conserved(&self) -> &BitString {
        &self.conserved
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Pathogen] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [Pathogen] {
        &mut self.members
    }

    pub fn set_members(&mut self, members: Vec<Pathogen>) {
        self.members = members;
    }

    pub(crate) fn take_members(&mut self) -> Vec<Pathogen> {
        std::mem::take(&mut self.members)
    }

    pub(crate) fn push(&mut self, pathogen: Pathogen) {
        self.members.push(pathogen);
    }

    /// Infections caused by the whole species this generation.
    pub fn hosts_infected(&self) -> u64 {
        self.members
            .iter()
            .map(|p| u64::from(p.hosts_infected()))
            .sum()
    }

    /// Antigen sites fixed against mutation: the species' conserved mask.
    pub fn fixed_bits(&self) -> &BitString {
        &self.conserved
    }

    /// Sites shielded from mutation under `restriction`.
    pub fn protected_sites(&self, restriction: MutationRestriction) -> Option<&BitString> {
        match restriction {
            MutationRestriction::None => None,
            MutationRestriction::Conserved => Some(self.fixed_bits()),
        }
    }
}

/// All pathogen species of a run.
#[derive(Debug, Clone, Default)]
pub struct PathogenPopulation {
    epitope_bits: u32,
    species: Vec<Species>,
}

impl PathogenPopulation {
    pub fn new(epitope_bits: u32, species: Vec<Species>) -> Self {
        Self {
            epitope_bits,
            species,
        }
    }

    /// Width of one epitope, equal to the host allele width.
    pub fn epitope_bits(&self) -> u32 {
        self.epitope_bits
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn species_mut(&mut self) -> &mut [Species] {
        &mut self.species
    }

    pub fn find(&self, id: SpeciesId) -> Option<&Species> {
        self.species.iter().find(|s| s.id == id)
    }

    /// Number of species still present.
    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Number of pathogens across all species.
    pub fn total_size(&self) -> usize {
        self.species.iter().map(Species::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_size() == 0
    }

    pub fn species_sizes(&self) -> Vec<SpeciesSize> {
        self.species
            .iter()
            .map(|s| SpeciesSize {
                species: s.id,
                size: s.size(),
            })
            .collect()
    }

    pub fn clear_infection_data(&mut self) {
        self.species
            .par_iter_mut()
            .flat_map(|s| s.members.par_iter_mut())
            .for_each(Pathogen::clear_infection_data);
    }

    /// Number of distinct antigen bit strings across the population.
    pub fn distinct_antigens(&self) -> usize {
        self.species
            .iter()
            .flat_map(|s| s.members.iter())
            .flat_map(|p| p.antigens().iter().map(|a| a.bits()))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Fixed antigen sites of one species, `None` when the species is gone.
    pub fn fixed_bits_in_antigens(&self, id: SpeciesId) -> Option<BitString> {
        self.find(id).map(|s| s.fixed_bits().clone())
    }

    /// Remove every species smaller than `min_size`, returning `(id, size)` of
    /// each removed species in order.
    pub fn remove_species_below(&mut self, min_size: usize) -> Vec<(SpeciesId, usize)> {
        let mut removed = Vec::new();
        self.species.retain(|s| {
            if s.size() < min_size {
                removed.push((s.id, s.size()));
                false
            } else {
                true
            }
        });
        removed
    }
}
