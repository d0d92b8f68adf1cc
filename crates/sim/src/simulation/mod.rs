//! Populations, configuration and the generational engine.
//!
//! - `Environment`: owns both populations and runs the generation pipeline.
//! - `HostPopulation` / `PathogenPopulation`: the individuals of a run.
//! - `SimulationConfig`: serde configuration of a whole run.
//! - `SimulationBuilder`: fluent construction with defaults and validation.
//! - `GenerationSummary`: what one step reports.

pub mod builder;
pub mod configs;
pub mod engine;
pub mod initialization;
pub mod population;
pub mod stats;

pub use builder::SimulationBuilder;
pub use configs::{
    ExecutionConfig, HostConfig, PathogenConfig, PresentationConfig, SimulationConfig,
};
pub use engine::Environment;
pub use initialization::{species_sizes, HostInit, PathogenInit, PathogenLayout};
pub use population::{HostPopulation, PathogenPopulation, Species, SpeciesSize};
pub use stats::{FitnessStats, GenerationSummary};
