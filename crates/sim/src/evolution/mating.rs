//! Mate choice.
//!
//! Mothers are drawn fitness-proportionally by the reproduction scheme; the
//! [`MateSelector`] then picks a father for each mother. Disassortative
//! selectors look for a mate whose MHC allele set satisfies an
//! [`MhcConstraint`] and fall back to plain fitness-proportional choice when
//! the search comes up empty.

use std::collections::BTreeSet;
use std::fmt::Debug;

use rand::seq::index;
use rand::RngCore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::selection::Roulette;
use crate::errors::{MatingConstraintUnsatisfied, SimulationError};
use crate::genome::Host;

/// Outcome of one mate search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateChoice {
    /// The mate satisfies the selector's constraint (always the case for
    /// unconstrained selectors).
    Constrained(usize),
    /// No mate satisfied the constraint; this one was drawn by fitness.
    Fallback(usize),
}

impl MateChoice {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            MateChoice::Constrained(i) | MateChoice::Fallback(i) => i,
        }
    }

    #[inline]
    pub fn is_fallback(self) -> bool {
        matches!(self, MateChoice::Fallback(_))
    }
}

/// The parental cohort as seen by mate selectors.
///
/// Holds a fitness roulette and every host's allele set so repeated searches
/// do not recompute them.
#[derive(Debug)]
pub struct MatingPool<'a> {
    hosts: &'a [Host],
    roulette: Roulette,
    alleles: Vec<BTreeSet<u64>>,
}

impl<'a> MatingPool<'a> {
    pub fn new(hosts: &'a [Host]) -> Self {
        let roulette = Roulette::new(hosts.iter().map(Host::fitness));
        let alleles = hosts
            .par_iter()
            .map(|h| h.genome().unique_alleles())
            .collect();
        Self {
            hosts,
            roulette,
            alleles,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn hosts(&self) -> &'a [Host] {
        self.hosts
    }

    pub fn roulette(&self) -> &Roulette {
        &self.roulette
    }

    pub fn alleles(&self, index: usize) -> &BTreeSet<u64> {
        &self.alleles[index]
    }

    /// Number of alleles hosts `a` and `b` have in common.
    pub fn shared(&self, a: usize, b: usize) -> usize {
        self.alleles[a].intersection(&self.alleles[b]).count()
    }

    /// Fitness-proportional draw of anyone but `focal`.
    pub fn draw_other(&self, focal: usize, rng: &mut dyn RngCore) -> usize {
        self.roulette.spin_excluding(focal, rng)
    }
}

/// Chooses a mate for a focal host.
pub trait MateSelector: Debug + Send + Sync {
    fn select_mate(&self, focal: usize, pool: &MatingPool<'_>, rng: &mut dyn RngCore)
        -> MateChoice;
}

/// Fitness-proportional mate choice without constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMating;

impl MateSelector for RandomMating {
    fn select_mate(
        &self,
        focal: usize,
        pool: &MatingPool<'_>,
        rng: &mut dyn RngCore,
    ) -> MateChoice {
        MateChoice::Constrained(pool.draw_other(focal, rng))
    }
}

/// Allele-set condition a disassortative mate must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MhcConstraint {
    /// No allele in common.
    NoCommon,
    /// Allele sets are not identical.
    OneDifferent,
}

impl MhcConstraint {
    pub fn satisfied(self, focal: &BTreeSet<u64>, mate: &BTreeSet<u64>) -> bool {
        match self {
            MhcConstraint::NoCommon => focal.is_disjoint(mate),
            MhcConstraint::OneDifferent => focal != mate,
        }
    }
}

/// How candidates are found for a disassortative search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "search", rename_all = "snake_case")]
pub enum MateSearch {
    /// Scan the population in random order, at most `max_attempts`
    /// candidates (`None` scans everyone).
    WholePopulation {
        #[serde(default)]
        max_attempts: Option<usize>,
    },
    /// `draws` times: sample `size` candidates by fitness and try the one
    /// sharing the fewest alleles with the focal host.
    SmallSubset { size: usize, draws: usize },
}

impl Default for MateSearch {
    fn default() -> Self {
        MateSearch::WholePopulation { max_attempts: None }
    }
}

impl MateSearch {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let ok = match *self {
            MateSearch::WholePopulation { max_attempts } => max_attempts != Some(0),
            MateSearch::SmallSubset { size, draws } => size > 0 && draws > 0,
        };
        if ok {
            Ok(())
        } else {
            Err(SimulationError::ConfigurationInconsistent(format!(
                "mate search {self:?} can never examine a candidate"
            )))
        }
    }
}

/// Mate choice restricted by MHC dissimilarity.
#[derive(Debug, Clone, Copy)]
pub struct DisassortativeMating {
    pub constraint: MhcConstraint,
    pub search: MateSearch,
}

impl DisassortativeMating {
    pub fn new(constraint: MhcConstraint, search: MateSearch) -> Self {
        Self { constraint, search }
    }

    fn find_mate(
        &self,
        focal: usize,
        pool: &MatingPool<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        let n = pool.len();
        let own = pool.alleles(focal);
        match self.search {
            MateSearch::WholePopulation { max_attempts } => {
                let amount = max_attempts.unwrap_or(n).min(n);
                index::sample(rng, n, amount)
                    .into_iter()
                    .filter(|&i| i != focal)
                    .find(|&i| self.constraint.satisfied(own, pool.alleles(i)))
            }
            MateSearch::SmallSubset { size, draws } => (0..draws).find_map(|_| {
                let best = (0..size)
                    .map(|_| pool.draw_other(focal, rng))
                    .filter(|&i| i != focal)
                    .min_by_key(|&i| pool.shared(focal, i))?;
                self.constraint
                    .satisfied(own, pool.alleles(best))
                    .then_some(best)
            }),
        }
    }
}

impl MateSelector for DisassortativeMating {
    fn select_mate(
        &self,
        focal: usize,
        pool: &MatingPool<'_>,
        rng: &mut dyn RngCore,
    ) -> MateChoice {
        if let Some(mate) = self.find_mate(focal, pool, rng) {
            return MateChoice::Constrained(mate);
        }
        let fallback = pool.draw_other(focal, rng);
        let event = MatingConstraintUnsatisfied { focal, fallback };
        debug!(%event, constraint = ?self.constraint, "mating fallback");
        MateChoice::Fallback(fallback)
    }
}

/// Serializable choice of mating policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum MatingScheme {
    #[default]
    Random,
    NoCommonMhc {
        #[serde(default)]
        search: MateSearch,
    },
    OneDifferentMhc {
        #[serde(default)]
        search: MateSearch,
    },
}

impl MatingScheme {
    pub fn validate(&self) -> Result<(), SimulationError> {
        match self {
            MatingScheme::Random => Ok(()),
            MatingScheme::NoCommonMhc { search } | MatingScheme::OneDifferentMhc { search } => {
                search.validate()
            }
        }
    }

    pub fn build(&self) -> Result<Box<dyn MateSelector>, SimulationError> {
        self.validate()?;
        Ok(match *self {
            MatingScheme::Random => Box::new(RandomMating),
            MatingScheme::NoCommonMhc { search } => {
                Box::new(DisassortativeMating::new(MhcConstraint::NoCommon, search))
            }
            MatingScheme::OneDifferentMhc { search } => {
                Box::new(DisassortativeMating::new(MhcConstraint::OneDifferent, search))
            }
        })
    }
}
