// src/bin/roku.rs

use clap::Parser;
use colored::*;
use roku_builder::{cli::dispatcher, context::AppContext, options::Options, t};

/// Parses options, sets up logging, runs one command and reports any error.
fn main() {
    let options = Options::parse();

    // `RUST_LOG` still wins over the level picked by --debug/--verbose.
    env_logger::Builder::new()
        .filter_level(options.log_level())
        .parse_default_env()
        .init();
    log::debug!("Options parsed: {:?}", options);

    let context = AppContext::new(options);
    if let Err(e) = dispatcher::dispatch(&context) {
        eprintln!("\n{}: {:#}", t!("error.label").red().bold(), e);
        std::process::exit(1);
    }
}
