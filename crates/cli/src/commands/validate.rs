use anyhow::Result;
use std::path::Path;

use crate::printing::print_parameters;
use crate::utils::load_config;

pub fn validate_config(path: &Path) -> Result<()> {
    println!("🔍 Validating configuration: {}", path.display());

    let config = load_config(path)?;
    println!("✓ Parsed");

    if let Err(e) = config.validate() {
        println!("✗ {e}");
        anyhow::bail!("Configuration {} is not usable", path.display());
    }
    println!("✓ Consistent");

    print_parameters(&mut std::io::stdout().lock(), &config)?;
    Ok(())
}
