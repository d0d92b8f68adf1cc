use anyhow::{Context, Result, bail};
use mhcevo_sim::base::AlleleDomain;
use mhcevo_sim::evolution::{
    HostMutation, MutationRate, MutationRestriction, PathogenMutation, PointMutation,
};
use mhcevo_sim::simulation::{ExecutionConfig, SimulationConfig};
use std::fs;

use crate::args::InitArgs;
use crate::printing::print_parameters;

pub fn init_config(args: &InitArgs) -> Result<()> {
    println!("🧬 mhcevo - Host/Pathogen MHC Coevolution");
    println!("============================================\n");

    if args.output.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        );
    }

    let config = build_config(args)?;
    config
        .validate()
        .context("Configuration parameters are inconsistent")?;

    let json = config.to_json_pretty()?;
    fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    print_parameters(&mut std::io::stdout().lock(), &config)?;
    println!("\n✓ Configuration written to {}", args.output.display());
    println!("  Run it with: mhcevo run --config {}", args.output.display());
    Ok(())
}

fn build_config(args: &InitArgs) -> Result<SimulationConfig> {
    let mut config = SimulationConfig::default();
    config.execution = ExecutionConfig::new(args.generations, args.seed);

    config.host.population_size = args.hosts;
    config.host.alleles = AlleleDomain::new(args.alleles).context("Invalid --alleles")?;
    config.host.chromosome_length = args.chromosome_length;
    config.host.mutation = HostMutation {
        point: (args.host_mutation_rate > 0.0).then(|| PointMutation::BitFlip {
            rate: MutationRate::per_bit(args.host_mutation_rate),
        }),
        ..Default::default()
    };

    config.pathogen.population_size = args.pathogens;
    config.pathogen.species = args.species;
    config.pathogen.antigen_length = args.antigen_length;
    config.pathogen.antigens_per_pathogen = args.antigens_per_pathogen;
    config.pathogen.mutation = PathogenMutation {
        rate: MutationRate::per_bit(args.pathogen_mutation_rate),
        restriction: MutationRestriction::None,
    };
    Ok(config)
}
