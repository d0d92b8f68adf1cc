use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::diploid::{Genome, Homolog};
use super::gene::Tag;
use super::pathogen::SpeciesId;
use crate::base::FitnessValue;

/// A gene that presented an antigen: its position and allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PresentingGene {
    pub homolog: Homolog,
    pub index: usize,
    pub allele: u64,
}

/// What a host saw during the current generation's presentation pass.
///
/// Cleared at every generation boundary; never carried over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    encountered: u32,
    presented: u32,
    infections: u32,
    presenting_genes: BTreeSet<PresentingGene>,
    presenting_species: BTreeSet<SpeciesId>,
    infecting_species: BTreeSet<SpeciesId>,
}

impl Presentation {
    /// Number of antigen encounters this generation.
    pub fn encountered(&self) -> u32 {
        self.encountered
    }

    /// Presented-antigen tally.
    pub fn presented(&self) -> u32 {
        self.presented
    }

    /// Encounters that ended in infection.
    pub fn infections(&self) -> u32 {
        self.infections
    }

    /// Every gene slot that presented at least once.
    pub fn presenting_genes(&self) -> &BTreeSet<PresentingGene> {
        &self.presenting_genes
    }

    /// Number of distinct alleles among presenting genes.
    pub fn distinct_presenting_alleles(&self) -> usize {
        self.presenting_genes
            .iter()
            .map(|g| g.allele)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn presenting_species(&self) -> &BTreeSet<SpeciesId> {
        &self.presenting_species
    }

    pub fn infecting_species(&self) -> &BTreeSet<SpeciesId> {
        &self.infecting_species
    }

    /// True when nothing has been recorded since the last clear.
    pub fn is_clear(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn record_presented(
        &mut self,
        species: SpeciesId,
        genes: &[PresentingGene],
        credit: u32,
    ) {
        self.encountered += 1;
        self.presented += credit;
        self.presenting_genes.extend(genes.iter().copied());
        self.presenting_species.insert(species);
    }

    pub(crate) fn record_infected(&mut self, species: SpeciesId) {
        self.encountered += 1;
        self.infections += 1;
        self.infecting_species.insert(species);
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A diploid host. Every locus of its genome is an MHC locus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    tag: Tag,
    born: usize,
    genome: Genome,
    presentation: Presentation,
    fitness: FitnessValue,
    clade: Option<u32>,
}

impl Host {
    pub fn new(genome: Genome, tag: Tag, born: usize) -> Self {
        Self {
            tag,
            born,
            genome,
            presentation: Presentation::default(),
            fitness: FitnessValue::ZERO,
            clade: None,
        }
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Generation in which the host was born.
    #[inline]
    pub fn born(&self) -> usize {
        self.born
    }

    #[inline]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    #[inline]
    pub fn genome_mut(&mut self) -> &mut Genome {
        &mut self.genome
    }

    #[inline]
    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    #[inline]
    pub(crate) fn presentation_mut(&mut self) -> &mut Presentation {
        &mut self.presentation
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness.get()
    }

    #[inline]
    pub fn set_fitness(&mut self, fitness: impl Into<FitnessValue>) {
        self.fitness = fitness.into();
    }

    #[inline]
    pub fn clade(&self) -> Option<u32> {
        self.clade
    }

    pub fn set_clade(&mut self, clade: Option<u32>) {
        self.clade = clade;
    }

    /// Number of pathogen species this host presented this generation.
    pub fn presenting_species_count(&self) -> usize {
        self.presentation.presenting_species.len()
    }

    /// Reset the presentation record and fitness.
    pub fn clear_infection_data(&mut self) {
        self.presentation.clear();
        self.fitness = FitnessValue::ZERO;
    }

    /// Alleles present on `homolog`, rendered as binary.
    pub fn gene_strings(&self, homolog: Homolog) -> Vec<String> {
        self.genome
            .chromosome(homolog)
            .gene_strings(self.genome.domain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::AlleleDomain;
    use crate::genome::Chromosome;

    fn host() -> Host {
        let domain = AlleleDomain::from_bits(4).unwrap();
        let genome = Genome::new(
            domain,
            Chromosome::from_alleles(&[1, 2]),
            Chromosome::from_alleles(&[3]),
        )
        .unwrap();
        Host::new(genome, 7, 0)
    }

    fn gene(homolog: Homolog, index: usize, allele: u64) -> PresentingGene {
        PresentingGene {
            homolog,
            index,
            allele,
        }
    }

    #[test]
    fn test_presentation_tallies() {
        let mut h = host();
        h.presentation_mut().record_presented(
            0,
            &[gene(Homolog::First, 0, 1), gene(Homolog::Second, 0, 3)],
            1,
        );
        h.presentation_mut().record_infected(1);
        let p = h.presentation();
        assert_eq!(p.encountered(), 2);
        assert_eq!(p.presented(), 1);
        assert_eq!(p.infections(), 1);
        assert_eq!(p.presenting_genes().len(), 2);
        assert_eq!(h.presenting_species_count(), 1);
        assert!(p.infecting_species().contains(&1));
    }

    #[test]
    fn test_distinct_presenting_alleles() {
        let mut p = Presentation::default();
        p.record_presented(
            0,
            &[gene(Homolog::First, 0, 5), gene(Homolog::First, 1, 5)],
            1,
        );
        assert_eq!(p.presenting_genes().len(), 2);
        assert_eq!(p.distinct_presenting_alleles(), 1);
    }

    #[test]
    fn test_clear_infection_data() {
        let mut h = host();
        h.presentation_mut().record_infected(0);
        h.set_fitness(3.0);
        h.clear_infection_data();
        assert!(h.presentation().is_clear());
        assert_eq!(h.fitness(), 0.0);
    }

    #[test]
    fn test_gene_strings() {
        let h = host();
        assert_eq!(h.gene_strings(Homolog::First), vec!["0001", "0010"]);
    }
}
