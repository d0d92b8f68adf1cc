//! Host fitness policies.
//!
//! Each policy maps a host's presentation record (and, for the
//! size-normalised policy, its genome) to a non-negative score. Policies are
//! pure: they read the record and never touch pathogens.
//!
//! | Model                    | Score                                        |
//! |--------------------------|----------------------------------------------|
//! | `PlainPresent`           | presented tally                              |
//! | `PerGene`                | `weight × presenting gene slots`             |
//! | `AccChromSize`           | presented tally / genes in genome            |
//! | `AlphaXsqr`              | `max(floor, 1 − alpha · presented²)`         |
//! | `ExpScaling`             | `exp(scale · presented)`                     |
//! | `ExpScalingUniqAlleles`  | `exp(scale · distinct presenting alleles)`   |
//! | `ForDrift`               | `1`                                          |

use std::fmt::Debug;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::base::FitnessValue;
use crate::errors::FitnessError;
use crate::genome::{Genome, Host, Presentation};

/// Scores a host from what it presented this generation.
pub trait HostFitness: Debug + Send + Sync {
    /// Raw score. Callers clamp through [`FitnessValue`].
    fn score(&self, presentation: &Presentation, genome: &Genome) -> f64;

    /// Score a host, clamped to a valid fitness value.
    fn evaluate(&self, host: &Host) -> FitnessValue {
        FitnessValue::new(self.score(host.presentation(), host.genome()))
    }
}

/// Fitness equals the presented-antigen tally.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlainPresent;

impl HostFitness for PlainPresent {
    fn score(&self, presentation: &Presentation, _genome: &Genome) -> f64 {
        f64::from(presentation.presented())
    }
}

/// Each gene slot that presented at least once contributes `weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerGene {
    weight: f64,
}

impl PerGene {
    pub fn new(weight: f64) -> Result<Self, FitnessError> {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(FitnessError::InvalidParameter(format!(
                "per-gene weight must be positive and finite, got {weight}"
            )));
        }
        Ok(Self { weight })
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl HostFitness for PerGene {
    fn score(&self, presentation: &Presentation, _genome: &Genome) -> f64 {
        self.weight * presentation.presenting_genes().len() as f64
    }
}

/// Presented tally divided by the number of genes the host carries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccChromSize;

impl HostFitness for AccChromSize {
    fn score(&self, presentation: &Presentation, genome: &Genome) -> f64 {
        match genome.gene_count() {
            0 => 0.0,
            n => f64::from(presentation.presented()) / n as f64,
        }
    }
}

/// Concave penalty on the presented tally, floored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaXSquared {
    alpha: f64,
    floor: f64,
}

impl AlphaXSquared {
    pub fn new(alpha: f64, floor: f64) -> Result<Self, FitnessError> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(FitnessError::InvalidParameter(format!(
                "alpha must be non-negative and finite, got {alpha}"
            )));
        }
        if !(floor.is_finite() && floor >= 0.0) {
            return Err(FitnessError::InvalidParameter(format!(
                "floor must be non-negative and finite, got {floor}"
            )));
        }
        Ok(Self { alpha, floor })
    }
}

impl HostFitness for AlphaXSquared {
    fn score(&self, presentation: &Presentation, _genome: &Genome) -> f64 {
        let x = f64::from(presentation.presented());
        (1.0 - self.alpha * x * x).max(self.floor)
    }
}

/// Exponential reward on the presented tally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpScaling {
    scale: f64,
}

impl ExpScaling {
    pub fn new(scale: f64) -> Result<Self, FitnessError> {
        if !scale.is_finite() {
            return Err(FitnessError::InvalidParameter(format!(
                "scale must be finite, got {scale}"
            )));
        }
        Ok(Self { scale })
    }
}

impl HostFitness for ExpScaling {
    fn score(&self, presentation: &Presentation, _genome: &Genome) -> f64 {
        (self.scale * f64::from(presentation.presented()))
            .exp()
            .clamp(f64::MIN_POSITIVE, f64::MAX)
    }
}

/// Exponential reward on the number of distinct presenting alleles.
///
/// Duplicated genes carrying the same allele earn nothing extra.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpScalingUniqAlleles {
    scale: f64,
}

impl ExpScalingUniqAlleles {
    pub fn new(scale: f64) -> Result<Self, FitnessError> {
        if !scale.is_finite() {
            return Err(FitnessError::InvalidParameter(format!(
                "scale must be finite, got {scale}"
            )));
        }
        Ok(Self { scale })
    }
}

impl HostFitness for ExpScalingUniqAlleles {
    fn score(&self, presentation: &Presentation, _genome: &Genome) -> f64 {
        (self.scale * presentation.distinct_presenting_alleles() as f64)
            .exp()
            .clamp(f64::MIN_POSITIVE, f64::MAX)
    }
}

/// Neutral model: every host scores 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForDrift;

impl HostFitness for ForDrift {
    fn score(&self, _presentation: &Presentation, _genome: &Genome) -> f64 {
        1.0
    }
}

/// Serializable choice of fitness policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum FitnessModel {
    #[default]
    PlainPresent,
    PerGene {
        weight: f64,
    },
    AccChromSize,
    AlphaXsqr {
        alpha: f64,
        #[serde(default)]
        floor: f64,
    },
    ExpScaling {
        scale: f64,
    },
    ExpScalingUniqAlleles {
        scale: f64,
    },
    ForDrift,
}

impl FitnessModel {
    /// Build the validated policy object.
    pub fn build(&self) -> Result<Box<dyn HostFitness>, FitnessError> {
        Ok(match *self {
            FitnessModel::PlainPresent => Box::new(PlainPresent),
            FitnessModel::PerGene { weight } => Box::new(PerGene::new(weight)?),
            FitnessModel::AccChromSize => Box::new(AccChromSize),
            FitnessModel::AlphaXsqr { alpha, floor } => Box::new(AlphaXSquared::new(alpha, floor)?),
            FitnessModel::ExpScaling { scale } => Box::new(ExpScaling::new(scale)?),
            FitnessModel::ExpScalingUniqAlleles { scale } => {
                Box::new(ExpScalingUniqAlleles::new(scale)?)
            }
            FitnessModel::ForDrift => Box::new(ForDrift),
        })
    }
}

/// Score every host in parallel.
pub fn evaluate_hosts(hosts: &mut [Host], fitness: &dyn HostFitness) {
    hosts.par_iter_mut().for_each(|host| {
        let value = fitness.evaluate(host);
        host.set_fitness(value);
    });
}
