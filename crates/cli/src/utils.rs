use anyhow::{Context, Result};
use mhcevo_sim::simulation::SimulationConfig;
use std::fs;
use std::path::Path;

/// Read and parse a configuration file without validating it.
pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))?;
    SimulationConfig::from_json(&text)
        .with_context(|| format!("Failed to parse configuration {}", path.display()))
}
