use serde::{Deserialize, Serialize};

use super::antigen::Antigen;
use super::gene::Tag;

/// Identifier of a pathogen species. Stable for the lifetime of a run.
pub type SpeciesId = u32;

/// A haploid pathogen carrying one or more antigens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pathogen {
    tag: Tag,
    species: SpeciesId,
    born: usize,
    antigens: Vec<Antigen>,
    hosts_infected: u32,
}

impl Pathogen {
    pub fn new(species: SpeciesId, antigens: Vec<Antigen>, tag: Tag, born: usize) -> Self {
        Self {
            tag,
            species,
            born,
            antigens,
            hosts_infected: 0,
        }
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    #[inline]
    pub fn species(&self) -> SpeciesId {
        self.species
    }

    /// Generation in which the pathogen was born.
    #[inline]
    pub fn born(&self) -> usize {
        self.born
    }

    #[inline]
    pub fn antigens(&self) -> &[Antigen] {
        &self.antigens
    }

    #[inline]
    pub(crate) fn antigens_mut(&mut self) -> &mut [Antigen] {
        &mut self.antigens
    }

    /// Hosts this pathogen infected in the current generation.
    #[inline]
    pub fn hosts_infected(&self) -> u32 {
        self.hosts_infected
    }

    pub(crate) fn add_hosts_infected(&mut self, count: u32) {
        self.hosts_infected += count;
    }

    pub fn clear_infection_data(&mut self) {
        self.hosts_infected = 0;
    }

    /// Clonal offspring with a fresh tag and an empty infection record.
    pub fn offspring(&self, tag: Tag, generation: usize) -> Self {
        Self {
            tag,
            species: self.species,
            born: generation,
            antigens: self.antigens.clone(),
            hosts_infected: 0,
        }
    }

    /// Every antigen rendered as a bit string.
    pub fn gene_strings(&self) -> Vec<String> {
        self.antigens.iter().map(ToString::to_string).collect()
    }
}
