//! Mutation operators for hosts and pathogens.
//!
//! ## Host point mutation
//! Either every gene is redrawn uniformly from the allele domain with a fixed
//! probability ([`PointMutation::Resample`]), or individual bits of each gene
//! are flipped ([`PointMutation::BitFlip`]). A bit-flip rate may be given per
//! bit or per gene; per-gene rates are converted with [`mm_to_pm_scaling`] so
//! both modes change a gene equally often. Loci listed in `conserved_loci`
//! never mutate. A flip that leaves the allele domain (possible when the
//! domain size is not a power of two) is rejected and counted.
//!
//! ## Deletion / duplication
//! Copy-number changes scan each chromosome from its end. A duplicated run is
//! inserted right after the original; a deleted run is removed. Bounds on the
//! number of genes per chromosome are never crossed.
//!
//! ## Pathogen mutation
//! Per-bit flips across every antigen, optionally skipping the species'
//! conserved sites and the sites currently fixed in the species.
//!
//! Sparse flips are located by geometric skip sampling so low rates cost
//! time proportional to the number of mutations, not to the genome size.

use std::collections::BTreeSet;
use std::ops::AddAssign;

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Geometric};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::base::{mm_to_pm_scaling, BitString};
pub use crate::errors::MutationError;
use crate::genome::{Genome, Homolog, Host, Pathogen, TagSource};

/// Unit in which a mutation probability is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    /// Probability that one bit flips.
    #[default]
    PerBit,
    /// Probability that one gene (or epitope) is resampled.
    PerGene,
}

/// A probability together with the unit it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationRate {
    pub probability: f64,
    #[serde(default)]
    pub unit: RateUnit,
}

impl MutationRate {
    pub fn per_bit(probability: f64) -> Self {
        Self {
            probability,
            unit: RateUnit::PerBit,
        }
    }

    pub fn per_gene(probability: f64) -> Self {
        Self {
            probability,
            unit: RateUnit::PerGene,
        }
    }

    pub fn validate(&self, name: &'static str) -> Result<(), MutationError> {
        check_probability(name, self.probability)
    }

    /// Per-bit flip probability for values `bits` wide.
    pub fn bit_probability(&self, bits: u32) -> f64 {
        match self.unit {
            RateUnit::PerBit => self.probability,
            RateUnit::PerGene => mm_to_pm_scaling(self.probability, bits),
        }
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), MutationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(MutationError::InvalidProbability(name, value));
    }
    Ok(())
}

/// Positions in `0..len` that are hit, each independently with probability `p`.
///
/// Returned in increasing order.
pub(crate) fn flip_sites<R: Rng + ?Sized>(len: usize, p: f64, rng: &mut R) -> Vec<usize> {
    if len == 0 || p <= 0.0 {
        return Vec::new();
    }
    if p >= 1.0 {
        return (0..len).collect();
    }
    let Ok(gaps) = Geometric::new(p) else {
        return Vec::new();
    };
    let mut sites = Vec::new();
    let mut pos = 0usize;
    loop {
        let skip = usize::try_from(gaps.sample(rng)).unwrap_or(usize::MAX);
        pos = pos.saturating_add(skip);
        if pos >= len {
            break;
        }
        sites.push(pos);
        pos += 1;
    }
    sites
}

/// Counters of mutation events, summed into the generation summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationCounts {
    /// Host genes whose allele changed
    pub point: u64,
    /// Host bit flips rejected because the allele left the domain
    pub rejected: u64,
    /// Genes inserted by duplication
    pub duplicated: u64,
    /// Genes removed by deletion
    pub deleted: u64,
    /// Antigen bits flipped
    pub pathogen_bits: u64,
}

impl AddAssign for MutationCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.point += rhs.point;
        self.rejected += rhs.rejected;
        self.duplicated += rhs.duplicated;
        self.deleted += rhs.deleted;
        self.pathogen_bits += rhs.pathogen_bits;
    }
}

/// How host alleles change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PointMutation {
    /// Each gene is redrawn uniformly from the domain with `probability`.
    Resample { probability: f64 },
    /// Bits of each gene flip independently.
    BitFlip { rate: MutationRate },
}

impl PointMutation {
    pub fn validate(&self) -> Result<(), MutationError> {
        match self {
            PointMutation::Resample { probability } => {
                check_probability("point.resample", *probability)
            }
            PointMutation::BitFlip { rate } => rate.validate("point.bit_flip"),
        }
    }
}

/// Copy-number mutation of whole genes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeletionDuplication {
    /// Per-gene probability of deleting a run starting at the gene
    pub deletion: f64,
    /// Per-gene probability of duplicating a run starting at the gene
    pub duplication: f64,
    /// Longest run affected by one event
    pub max_run: usize,
    /// Chromosomes never grow beyond this many genes
    pub max_genes: usize,
    /// Chromosomes never shrink below this many genes
    #[serde(default)]
    pub min_genes: usize,
}

impl DeletionDuplication {
    pub fn validate(&self) -> Result<(), MutationError> {
        check_probability("del_dup.deletion", self.deletion)?;
        check_probability("del_dup.duplication", self.duplication)?;
        if self.max_run == 0 {
            return Err(MutationError::InvalidParameter(
                "del_dup.max_run must be at least 1".into(),
            ));
        }
        if self.min_genes > self.max_genes {
            return Err(MutationError::InvalidParameter(format!(
                "del_dup.min_genes {} exceeds max_genes {}",
                self.min_genes, self.max_genes
            )));
        }
        Ok(())
    }

    /// Apply to both chromosomes independently.
    ///
    /// Runs only start at or after `anchored`, so loci before it keep their
    /// position and gene.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        genome: &mut Genome,
        anchored: usize,
        rng: &mut R,
    ) -> MutationCounts {
        let mut counts = MutationCounts::default();
        for homolog in Homolog::BOTH {
            let chromosome = genome.chromosome_mut(homolog);
            for start in (anchored..chromosome.len()).rev() {
                if rng.random_bool(self.duplication) && chromosome.len() < self.max_genes {
                    let room = self.max_genes - chromosome.len();
                    let run = rng.random_range(1..=self.max_run).min(room);
                    counts.duplicated += chromosome.duplicate_run(start, run) as u64;
                }
                if rng.random_bool(self.deletion) && chromosome.len() > self.min_genes {
                    let spare = chromosome.len() - self.min_genes;
                    let run = rng.random_range(1..=self.max_run).min(spare);
                    counts.deleted += chromosome.delete_run(start, run) as u64;
                }
            }
        }
        counts
    }
}

/// Composite host mutation, applied to offspring only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostMutation {
    #[serde(default)]
    pub point: Option<PointMutation>,
    /// Gene indices that never change. Copy-number runs start after the
    /// last of them.
    #[serde(default)]
    pub conserved_loci: BTreeSet<usize>,
    #[serde(default)]
    pub del_dup: Option<DeletionDuplication>,
}

impl HostMutation {
    pub fn validate(&self) -> Result<(), MutationError> {
        if let Some(point) = &self.point {
            point.validate()?;
        }
        if let Some(del_dup) = &self.del_dup {
            del_dup.validate()?;
        }
        Ok(())
    }

    /// True when applying this operator can never change a genome.
    pub fn is_noop(&self) -> bool {
        let point_off = match self.point {
            None => true,
            Some(PointMutation::Resample { probability }) => probability <= 0.0,
            Some(PointMutation::BitFlip { rate }) => rate.probability <= 0.0,
        };
        let del_dup_off = self
            .del_dup
            .map_or(true, |d| d.deletion <= 0.0 && d.duplication <= 0.0);
        point_off && del_dup_off
    }

    /// Mutate one genome. New alleles take fresh tags from `tags`.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        genome: &mut Genome,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
    ) -> MutationCounts {
        let mut counts = MutationCounts::default();
        match self.point {
            Some(PointMutation::Resample { probability }) => {
                self.resample(genome, probability, tags, generation, rng, &mut counts)
            }
            Some(PointMutation::BitFlip { rate }) => {
                let p = rate.bit_probability(genome.domain().bits());
                self.bit_flip(genome, p, tags, generation, rng, &mut counts)
            }
            None => {}
        }
        if let Some(del_dup) = &self.del_dup {
            let anchored = self.conserved_loci.last().map_or(0, |&locus| locus + 1);
            counts += del_dup.apply(genome, anchored, rng);
        }
        counts
    }

    fn resample<R: Rng + ?Sized>(
        &self,
        genome: &mut Genome,
        probability: f64,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
        counts: &mut MutationCounts,
    ) {
        let domain = genome.domain();
        for homolog in Homolog::BOTH {
            let chromosome = genome.chromosome_mut(homolog);
            for (locus, gene) in chromosome.genes_mut().iter_mut().enumerate() {
                if self.conserved_loci.contains(&locus) || !rng.random_bool(probability) {
                    continue;
                }
                let allele = domain.sample(rng);
                if allele != gene.allele() {
                    *gene = gene.mutated(allele, tags.next_tag(), generation);
                    counts.point += 1;
                }
            }
        }
    }

    fn bit_flip<R: Rng + ?Sized>(
        &self,
        genome: &mut Genome,
        p: f64,
        tags: &TagSource,
        generation: usize,
        rng: &mut R,
        counts: &mut MutationCounts,
    ) {
        let domain = genome.domain();
        let bits = domain.bits() as usize;
        for homolog in Homolog::BOTH {
            let chromosome = genome.chromosome_mut(homolog);
            let genes = chromosome.genes_mut();
            for site in flip_sites(genes.len() * bits, p, rng) {
                let locus = site / bits;
                if self.conserved_loci.contains(&locus) {
                    continue;
                }
                let gene = &mut genes[locus];
                let flipped = gene.allele() ^ (1u64 << (bits - 1 - site % bits));
                match domain.check(flipped) {
                    Ok(allele) => {
                        *gene = gene.mutated(allele, tags.next_tag(), generation);
                        counts.point += 1;
                    }
                    Err(_) => counts.rejected += 1,
                }
            }
        }
    }
}

/// Mutate every host in parallel, one seeded RNG per host.
pub fn mutate_hosts<R: Rng + ?Sized>(
    hosts: &mut [Host],
    mutation: &HostMutation,
    tags: &TagSource,
    generation: usize,
    rng: &mut R,
) -> MutationCounts {
    if mutation.is_noop() || hosts.is_empty() {
        return MutationCounts::default();
    }
    let seeds: Vec<u64> = (0..hosts.len()).map(|_| rng.random()).collect();
    hosts
        .par_iter_mut()
        .zip(seeds.par_iter())
        .map(|(host, &seed)| {
            let mut local_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            mutation.mutate(host.genome_mut(), tags, generation, &mut local_rng)
        })
        .reduce(MutationCounts::default, |mut a, b| {
            a += b;
            a
        })
}

/// Antigen sites shielded from pathogen mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationRestriction {
    /// Every site may mutate.
    #[default]
    None,
    /// The species' conserved (fixed) sites never mutate.
    Conserved,
}

/// Per-bit antigen mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathogenMutation {
    pub rate: MutationRate,
    #[serde(default)]
    pub restriction: MutationRestriction,
}

impl Default for PathogenMutation {
    fn default() -> Self {
        Self {
            rate: MutationRate::per_bit(0.0),
            restriction: MutationRestriction::None,
        }
    }
}

impl PathogenMutation {
    pub fn validate(&self) -> Result<(), MutationError> {
        self.rate.validate("pathogen.rate")
    }

    /// Mutate the members of one species.
    ///
    /// `protected` has one bit per antigen position; set bits never flip.
    /// `epitope_bits` scales per-gene rates to per-bit rates.
    pub fn mutate_members<R: Rng + ?Sized>(
        &self,
        members: &mut [Pathogen],
        protected: Option<&BitString>,
        epitope_bits: u32,
        rng: &mut R,
    ) -> u64 {
        let p = self.rate.bit_probability(epitope_bits);
        if p <= 0.0 {
            return 0;
        }
        let mut flipped = 0u64;
        for pathogen in members.iter_mut() {
            for antigen in pathogen.antigens_mut() {
                let sites: Vec<usize> = flip_sites(antigen.len(), p, rng)
                    .into_iter()
                    .filter(|&site| !protected.is_some_and(|mask| mask.try_get(site).unwrap_or(false)))
                    .collect();
                flipped += sites.len() as u64;
                antigen.flip_positions(&sites);
            }
        }
        flipped
    }
}

/// Pattern of conserved antigen sites, drawn once per run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum ConservationPattern {
    #[default]
    None,
    /// Each site conserved independently with `fraction`.
    Random { fraction: f64 },
    /// Runs of four sites conserved together.
    ///
    /// A left-to-right walk starts a run at each site with `fraction / 4`; the
    /// next run may start on the last site of the previous one.
    InFours { fraction: f64 },
    /// Four random masks; species `i` uses mask `i % 4`.
    FourClades { fraction: f64 },
}

impl ConservationPattern {
    pub fn validate(&self) -> Result<(), MutationError> {
        match *self {
            ConservationPattern::None => Ok(()),
            ConservationPattern::Random { fraction }
            | ConservationPattern::InFours { fraction }
            | ConservationPattern::FourClades { fraction } => {
                check_probability("conservation.fraction", fraction)
            }
        }
    }

    /// One mask per species, each as long as that species' antigens.
    pub fn draw_masks<R: Rng + ?Sized>(&self, lengths: &[usize], rng: &mut R) -> Vec<BitString> {
        match *self {
            ConservationPattern::None => lengths.iter().map(|&l| BitString::zeros(l)).collect(),
            ConservationPattern::Random { fraction } => lengths
                .iter()
                .map(|&l| random_mask(l, fraction, rng))
                .collect(),
            ConservationPattern::InFours { fraction } => lengths
                .iter()
                .map(|&l| block_mask(l, fraction / 4.0, rng))
                .collect(),
            ConservationPattern::FourClades { fraction } => {
                let longest = lengths.iter().copied().max().unwrap_or(0);
                let clades: Vec<BitString> =
                    (0..4).map(|_| random_mask(longest, fraction, rng)).collect();
                lengths
                    .iter()
                    .enumerate()
                    .map(|(i, &l)| clades[i % 4].truncated(l))
                    .collect()
            }
        }
    }
}

fn random_mask<R: Rng + ?Sized>(len: usize, fraction: f64, rng: &mut R) -> BitString {
    let bits: Vec<bool> = (0..len).map(|_| rng.random_bool(fraction)).collect();
    BitString::from_bools(&bits)
}

fn block_mask<R: Rng + ?Sized>(len: usize, probability: f64, rng: &mut R) -> BitString {
    let mut mask = BitString::zeros(len);
    let mut site = 0;
    while site < len {
        if rng.random_bool(probability) {
            for i in site..(site + 4).min(len) {
                mask.set(i, true);
            }
            site += 3;
        } else {
            site += 1;
        }
    }
    mask
}
