// src/cli/handlers/show.rs

use crate::{context::AppContext, core::active_view::ParsedConfig, models::LoadedPathSet};
use anyhow::{Context, Result};
use colored::*;

/// Default handler: resolves the configuration and prints the active view,
/// or the raw tree with `--dump`.
pub fn handle(context: &AppContext) -> Result<()> {
    let loaded = context
        .load_config()
        .with_context(|| format!("Could not load config '{}'", context.options().config))?;

    if context.options().dump {
        println!("{}", loaded.tree.to_pretty_json()?);
        return Ok(());
    }

    let parsed = context.parse_config(&loaded.tree)?;
    print_summary(&parsed, &loaded.loaded);
    Ok(())
}

fn print_summary(parsed: &ParsedConfig, files: &LoadedPathSet) {
    let selection = parsed.selection();
    let none = t!("common.none");

    println!(
        "\n--- {} '{}' / '{}' / '{}' ---",
        t!("show.header"),
        selection.device.as_str().yellow(),
        selection.project.as_str().yellow(),
        selection.stage.as_str().yellow()
    );

    let chain: Vec<String> = files
        .in_load_order()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    println!("  {:<15} {}", t!("show.label.files").blue(), chain.join(" -> ").dimmed());

    let device = parsed.device_config();
    println!("\n  {}:", t!("show.label.device").blue());
    println!("    {:<13} {}", t!("show.label.ip"), device.ip.as_deref().unwrap_or(none));
    println!("    {:<13} {}", t!("show.label.user"), device.user.as_deref().unwrap_or(none));

    let project = parsed.project();
    println!("\n  {}:", t!("show.label.project").blue());
    println!(
        "    {:<13} {}",
        t!("show.label.directory"),
        parsed
            .root_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| none.to_string())
    );
    println!(
        "    {:<13} {}",
        t!("show.label.app_name"),
        project.app_name.as_deref().unwrap_or(none)
    );

    let stage = parsed.stage_config();
    println!("\n  {}:", t!("show.label.stage").blue());
    println!(
        "    {:<13} {}",
        t!("show.label.stage_method"),
        stage.method.as_ref().map(|m| m.as_str()).unwrap_or(none)
    );
    println!(
        "    {:<13} {}",
        t!("show.label.branch"),
        stage.branch.as_deref().unwrap_or(none)
    );
    if let Some(key) = parsed.key() {
        println!("    {:<13} {}", t!("show.label.key"), key.name.cyan());
    }

    let out = parsed.out();
    let out_text = match &out.file {
        Some(file) => out.folder.join(file).display().to_string(),
        None => out.folder.display().to_string(),
    };
    println!("\n  {:<15} {}", t!("show.label.out").blue(), out_text);

    let sections: Vec<&str> = parsed.section_names().collect();
    if !sections.is_empty() {
        println!("  {:<15} {}", t!("show.label.sections").blue(), sections.join(", "));
    }
    println!("\n---------------------------------");
}
