// src/cli/handlers/edit.rs

use crate::{
    context::AppContext,
    core::{config_loader::expand_path, field_editor},
};
use anyhow::{Context, Result};
use colored::Colorize;

/// Handler for `--edit` without `--configure`.
pub fn handle(context: &AppContext) -> Result<()> {
    let options = context.options();
    let Some(params) = options.edit_params.as_deref() else {
        return Ok(());
    };

    field_editor::edit_config_file(&options.config, &options.selectors(), params)
        .with_context(|| format!("Could not edit config '{}'", options.config))?;

    println!(
        "{} {}",
        t!("edit.success").green(),
        expand_path(&options.config, None).display()
    );
    for (key, value) in field_editor::parse_edit_params(params) {
        if field_editor::edit_target(&key).is_some() {
            println!("  {} = {}", key.cyan(), value);
        } else {
            println!("  {} {}", key.dimmed(), "(ignored)".dimmed());
        }
    }
    Ok(())
}
