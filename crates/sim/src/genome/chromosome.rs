use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::gene::{Gene, TagSource};
use crate::base::AlleleDomain;
use crate::errors::OutOfBounds;

/// An ordered, resizable run of MHC genes.
///
/// Deletion/duplication mutations change the length, so loci are addressed
/// by index and every accessor tolerates chromosomes of any length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chromosome {
    genes: Vec<Gene>,
}

impl Chromosome {
    pub fn new(genes: Vec<Gene>) -> Self {
        Self { genes }
    }

    /// Chromosome built from bare alleles (no lineage information).
    pub fn from_alleles(alleles: &[u64]) -> Self {
        Self {
            genes: alleles.iter().map(|&a| Gene::from_allele(a)).collect(),
        }
    }

    /// `len` uniformly random genes, each with a fresh tag.
    pub fn random<R: Rng + ?Sized>(
        len: usize,
        domain: AlleleDomain,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
    ) -> Self {
        Self {
            genes: (0..len)
                .map(|_| Gene::new(domain.sample(rng), tags.next_tag(), generation))
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    #[inline]
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    #[inline]
    pub(crate) fn genes_mut(&mut self) -> &mut [Gene] {
        &mut self.genes
    }

    pub fn get(&self, index: usize) -> Result<&Gene, OutOfBounds> {
        self.genes.get(index).ok_or(OutOfBounds {
            index,
            len: self.genes.len(),
        })
    }

    pub(crate) fn replace(&mut self, index: usize, gene: Gene) -> Result<(), OutOfBounds> {
        let len = self.genes.len();
        let slot = self
            .genes
            .get_mut(index)
            .ok_or(OutOfBounds { index, len })?;
        *slot = gene;
        Ok(())
    }

    pub fn alleles(&self) -> impl Iterator<Item = u64> + '_ {
        self.genes.iter().map(Gene::allele)
    }

    pub fn unique_alleles(&self) -> BTreeSet<u64> {
        self.alleles().collect()
    }

    /// Copy `run` genes starting at `start` and insert the copy right after them.
    ///
    /// The run is clipped to the end of the chromosome. Returns the number of
    /// genes inserted.
    pub(crate) fn duplicate_run(&mut self, start: usize, run: usize) -> usize {
        if start >= self.genes.len() {
            return 0;
        }
        let end = (start + run).min(self.genes.len());
        let copy: Vec<Gene> = self.genes[start..end].to_vec();
        let inserted = copy.len();
        self.genes.splice(end..end, copy);
        inserted
    }

    /// Remove `run` genes starting at `start`, clipped to the chromosome end.
    ///
    /// Returns the number of genes removed.
    pub(crate) fn delete_run(&mut self, start: usize, run: usize) -> usize {
        if start >= self.genes.len() {
            return 0;
        }
        let end = (start + run).min(self.genes.len());
        self.genes.drain(start..end);
        end - start
    }

    /// Render genes as binary strings separated by single spaces.
    pub fn render(&self, domain: AlleleDomain) -> String {
        self.genes
            .iter()
            .map(|g| domain.render(g.allele()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render every gene separately.
    pub fn gene_strings(&self, domain: AlleleDomain) -> Vec<String> {
        self.genes.iter().map(|g| domain.render(g.allele())).collect()
    }
}
