use mhcevo_sim::simulation::SimulationConfig;
use std::io::{self, Write};

/// Human-readable overview of a configuration.
pub fn print_parameters(out: &mut impl Write, config: &SimulationConfig) -> io::Result<()> {
    let execution = &config.execution;
    let host = &config.host;
    let pathogen = &config.pathogen;
    let presentation = &config.presentation;

    writeln!(out, "\n📋 Run")?;
    writeln!(out, "  • Generations: {}", execution.total_generations)?;
    writeln!(
        out,
        "  • Pathogen generations per host generation: {}",
        execution.pathogen_generations_per_host
    )?;
    match execution.seed {
        Some(seed) => writeln!(out, "  • Random Seed: {seed}")?,
        None => writeln!(out, "  • Random Seed: Random")?,
    }

    writeln!(out, "\n🧬 Hosts")?;
    writeln!(out, "  • Population size: {}", host.population_size)?;
    writeln!(
        out,
        "  • Alleles: {} ({} bits)",
        host.alleles.size(),
        host.alleles.bits()
    )?;
    writeln!(out, "  • Genes per chromosome: {}", host.chromosome_length)?;
    writeln!(out, "  • Initialization: {:?}", host.init)?;
    writeln!(out, "  • Fitness: {:?}", host.fitness)?;
    writeln!(out, "  • Mating: {:?}", host.mating)?;
    writeln!(out, "  • Reproduction: {:?}", host.reproduction)?;
    match &host.mutation.point {
        Some(point) => writeln!(out, "  • Point mutation: {point:?}")?,
        None => writeln!(out, "  • Point mutation: off")?,
    }
    if !host.mutation.conserved_loci.is_empty() {
        writeln!(out, "  • Conserved loci: {:?}", host.mutation.conserved_loci)?;
    }
    if let Some(del_dup) = &host.mutation.del_dup {
        writeln!(out, "  • Deletion/duplication: {del_dup:?}")?;
    }

    writeln!(out, "\n🦠 Pathogens")?;
    writeln!(out, "  • Population size: {}", pathogen.population_size)?;
    writeln!(out, "  • Species: {}", pathogen.species)?;
    writeln!(out, "  • Antigen lengths: {:?}", pathogen.antigen_lengths())?;
    writeln!(
        out,
        "  • Antigens per pathogen: {}",
        pathogen.antigens_per_pathogen
    )?;
    writeln!(out, "  • Initialization: {:?}", pathogen.init)?;
    writeln!(out, "  • Mutation: {:?}", pathogen.mutation)?;
    writeln!(out, "  • Conservation: {:?}", pathogen.conservation)?;
    writeln!(out, "  • Reproduction: {:?}", pathogen.reproduction)?;

    writeln!(out, "\n🔬 Presentation")?;
    writeln!(out, "  • Match rule: {:?}", presentation.rule)?;
    writeln!(out, "  • Zygosity: {:?}", presentation.zygosity)?;
    writeln!(out, "  • Infection scope: {:?}", presentation.scope)?;
    Ok(())
}
