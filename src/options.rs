// src/options.rs

use crate::{constants::DEFAULT_CONFIG_PATH, core::active_view::Selectors};
use clap::Parser;

/// roku: build, sideload, test and profile Roku applications from a layered JSON config.
///
/// Without `--configure` or `--edit`, the configuration is resolved and the
/// active device, project and stage are printed.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
pub struct Options {
    /// Path to the primary config file.
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Project to use instead of `projects.default`.
    #[arg(long, short = 'P')]
    pub project: Option<String>,

    /// Device to use instead of `devices.default`.
    #[arg(long, short = 'D')]
    pub device: Option<String>,

    /// Stage to use instead of the project's first stage.
    #[arg(long, short = 'S')]
    pub stage: Option<String>,

    /// Edit the config file, e.g. "ip:192.168.1.2, branch:dev".
    ///
    /// Recognized keys: ip, user, password, directory, app_name, branch.
    #[arg(long = "edit", short = 'e', value_name = "PARAMS")]
    pub edit_params: Option<String>,

    /// Create the config file from the bundled template.
    #[arg(long)]
    pub configure: bool,

    /// Use the working directory as-is instead of the project's stage method.
    #[arg(long, short = 'w')]
    pub working: bool,

    /// Input package for commands that consume one.
    #[arg(long = "in", short = 'I', value_name = "PATH")]
    pub infile: Option<String>,

    /// Output folder, or a `.zip`/`.pkg` file path.
    #[arg(long, short = 'O', value_name = "PATH")]
    pub out: Option<String>,

    /// Print the raw resolved config as JSON.
    #[arg(long)]
    pub dump: bool,

    /// Log informational messages.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Log debug messages.
    #[arg(long)]
    pub debug: bool,
}

impl Options {
    /// The device/project/stage overrides given on the command line.
    pub fn selectors(&self) -> Selectors {
        Selectors {
            device: self.device.clone(),
            project: self.project.clone(),
            stage: self.stage.clone(),
        }
    }

    /// The log level implied by `--debug` / `--verbose`.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else if self.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        }
    }
}
