use anyhow::{Context, Result};
use mhcevo_sim::simulation::Environment;
use std::io::{self, Write};
use std::time::Instant;
use tracing::info;

use crate::args::RunArgs;
use crate::printing::print_parameters;
use crate::utils::load_config;

/// Run a configuration, streaming one JSON summary per generation to stdout.
pub fn run_simulation(args: &RunArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(generations) = args.generations {
        config.execution.total_generations = generations;
    }
    if args.seed.is_some() {
        config.execution.seed = args.seed;
    }

    let mut err = io::stderr().lock();
    writeln!(err, "🧬 mhcevo - Running {}", args.config.display())?;
    print_parameters(&mut err, &config)?;

    let mut env = Environment::new(&config).context("Failed to set up the simulation")?;
    let total = config.execution.total_generations;
    let started = Instant::now();

    let mut out = io::stdout().lock();
    let mut last = None;
    for _ in 0..total {
        let summary = env
            .step()
            .with_context(|| format!("Generation {} failed", env.generation() + 1))?;
        if !args.last_only {
            writeln!(out, "{}", summary.to_json_line()?)?;
        }
        last = Some(summary);
    }
    if let (true, Some(summary)) = (args.last_only, &last) {
        writeln!(out, "{}", summary.to_json_line()?)?;
    }
    out.flush()?;

    info!(
        generations = total,
        hosts = env.host_count(),
        species = env.pathogens().species_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run finished"
    );
    writeln!(
        err,
        "\n✓ Finished {total} generations in {:.2?}",
        started.elapsed()
    )?;
    Ok(())
}
