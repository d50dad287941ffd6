// src/cli/handlers/configure.rs

use crate::{
    context::AppContext,
    core::{bootstrap, config_loader::expand_path},
};
use anyhow::{Context, Result};
use colored::Colorize;

/// Handler for `--configure`: writes the template, then applies `--edit` if given.
pub fn handle(context: &AppContext) -> Result<()> {
    let options = context.options();
    let edited = bootstrap::configure(options)
        .with_context(|| format!("Could not create config '{}'", options.config))?;

    println!("\n{}", t!("common.success").green().bold());
    println!(
        "  {} {}",
        t!("configure.success"),
        expand_path(&options.config, None).display()
    );
    if edited.is_some() {
        println!("  {}", t!("configure.edited"));
    }
    Ok(())
}
