use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chromosome::Chromosome;
use super::gene::{Gene, TagSource};
use crate::base::AlleleDomain;
use crate::errors::GenomeError;

/// Separator between the two chromosomes in a rendered genome.
pub const CHROMOSOME_SEPARATOR: &str = " | ";

/// Which member of the chromosome pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Homolog {
    First,
    Second,
}

impl Homolog {
    pub const BOTH: [Homolog; 2] = [Homolog::First, Homolog::Second];
}

/// A diploid host genome: two chromosomes of genes over one allele domain.
///
/// Both chromosomes always exist, even when mutation has emptied one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    domain: AlleleDomain,
    first: Chromosome,
    second: Chromosome,
}

impl Genome {
    /// Build a genome, rejecting any allele outside `domain`.
    pub fn new(
        domain: AlleleDomain,
        first: Chromosome,
        second: Chromosome,
    ) -> Result<Self, GenomeError> {
        for allele in first.alleles().chain(second.alleles()) {
            domain.check(allele)?;
        }
        Ok(Self {
            domain,
            first,
            second,
        })
    }

    /// Genome with `genes` random genes on each chromosome.
    pub fn random<R: Rng + ?Sized>(
        domain: AlleleDomain,
        genes: usize,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
    ) -> Self {
        Self {
            domain,
            first: Chromosome::random(genes, domain, tags, generation, rng),
            second: Chromosome::random(genes, domain, tags, generation, rng),
        }
    }

    /// Homozygous genome carrying two copies of `chromosome`.
    pub fn homozygous(domain: AlleleDomain, chromosome: Chromosome) -> Result<Self, GenomeError> {
        Self::new(domain, chromosome.clone(), chromosome)
    }

    /// Zygote from two gametes. Both must come from the same allele domain.
    pub fn from_gametes(
        domain: AlleleDomain,
        maternal: (AlleleDomain, Chromosome),
        paternal: (AlleleDomain, Chromosome),
    ) -> Result<Self, GenomeError> {
        for (gamete_domain, _) in [&maternal, &paternal] {
            if *gamete_domain != domain {
                return Err(GenomeError::DomainMismatch {
                    left: domain.size(),
                    right: gamete_domain.size(),
                });
            }
        }
        Ok(Self {
            domain,
            first: maternal.1,
            second: paternal.1,
        })
    }

    #[inline]
    pub fn domain(&self) -> AlleleDomain {
        self.domain
    }

    #[inline]
    pub fn chromosome(&self, homolog: Homolog) -> &Chromosome {
        match homolog {
            Homolog::First => &self.first,
            Homolog::Second => &self.second,
        }
    }

    #[inline]
    pub(crate) fn chromosome_mut(&mut self, homolog: Homolog) -> &mut Chromosome {
        match homolog {
            Homolog::First => &mut self.first,
            Homolog::Second => &mut self.second,
        }
    }

    /// Both chromosomes in order.
    pub fn chromosomes(&self) -> [&Chromosome; 2] {
        [&self.first, &self.second]
    }

    /// Every gene with its position.
    pub fn genes(&self) -> impl Iterator<Item = (Homolog, usize, &Gene)> + '_ {
        Homolog::BOTH.into_iter().flat_map(move |h| {
            self.chromosome(h)
                .genes()
                .iter()
                .enumerate()
                .map(move |(i, g)| (h, i, g))
        })
    }

    /// Read the allele at a locus.
    pub fn get(&self, homolog: Homolog, index: usize) -> Result<u64, GenomeError> {
        Ok(self.chromosome(homolog).get(index)?.allele())
    }

    /// Write an allele at a locus.
    ///
    /// Out-of-domain alleles are rejected with `InvalidAllele` and the genome
    /// is left unchanged. Lineage of the written gene is kept.
    pub fn set(&mut self, homolog: Homolog, index: usize, allele: u64) -> Result<(), GenomeError> {
        self.domain.check(allele)?;
        let chromosome = self.chromosome_mut(homolog);
        let gene = *chromosome.get(index)?;
        chromosome.replace(index, Gene::new(allele, gene.tag(), gene.origin()))?;
        Ok(())
    }

    /// Total number of genes on both chromosomes.
    pub fn gene_count(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// Distinct alleles across both chromosomes.
    pub fn unique_alleles(&self) -> BTreeSet<u64> {
        self.first.alleles().chain(self.second.alleles()).collect()
    }

    /// Number of distinct alleles shared with `other`.
    pub fn shared_alleles(&self, other: &Genome) -> usize {
        self.unique_alleles()
            .intersection(&other.unique_alleles())
            .count()
    }

    /// True when both chromosomes carry the same allele sequence.
    pub fn is_homozygous(&self) -> bool {
        self.first == self.second
    }

    /// Allele-for-allele equality, ignoring lineage.
    pub fn same_alleles(&self, other: &Genome) -> bool {
        self.domain == other.domain && self.first == other.first && self.second == other.second
    }

    /// Bitwise Hamming distance between aligned loci of the two genomes.
    ///
    /// Loci present in only one genome (after deletion/duplication) count
    /// every bit of the domain width as different.
    pub fn hamming_distance(&self, other: &Genome) -> usize {
        let bits = self.domain.bits().max(other.domain.bits()) as usize;
        Homolog::BOTH
            .into_iter()
            .map(|h| {
                let a = self.chromosome(h).genes();
                let b = other.chromosome(h).genes();
                let aligned: usize = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| (x.allele() ^ y.allele()).count_ones() as usize)
                    .sum();
                aligned + a.len().abs_diff(b.len()) * bits
            })
            .sum()
    }

    /// One randomly chosen chromosome, tagged with its domain.
    pub fn gamete<R: Rng + ?Sized>(&self, rng: &mut R) -> (AlleleDomain, Chromosome) {
        let chosen = if rng.random_bool(0.5) {
            &self.first
        } else {
            &self.second
        };
        (self.domain, chosen.clone())
    }

    /// Rendered genes of both chromosomes.
    pub fn gene_strings(&self) -> [Vec<String>; 2] {
        [
            self.first.gene_strings(self.domain),
            self.second.gene_strings(self.domain),
        ]
    }

    /// Parse a rendering produced by `Display`.
    ///
    /// Lineage information is not part of the rendering; parsed genes carry
    /// tag 0 and origin 0.
    pub fn parse(text: &str, domain: AlleleDomain) -> Result<Self, GenomeError> {
        let (first, second) = text.split_once(CHROMOSOME_SEPARATOR.trim()).ok_or_else(|| {
            GenomeError::Parse(format!("missing chromosome separator in '{text}'"))
        })?;
        let parse_chromosome = |part: &str| -> Result<Chromosome, GenomeError> {
            part.split_whitespace()
                .map(|g| domain.parse(g).map(Gene::from_allele))
                .collect::<Result<Vec<_>, _>>()
                .map(Chromosome::new)
        };
        Self::new(domain, parse_chromosome(first)?, parse_chromosome(second)?)
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{CHROMOSOME_SEPARATOR}{}",
            self.first.render(self.domain),
            self.second.render(self.domain)
        )
    }
}
