// src/core/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Every way resolving, selecting from or editing a configuration can fail.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The primary config file, or a file named by `parent_config`, does not exist.
    #[error("Missing config: '{path}' does not exist.")]
    MissingConfig { path: PathBuf },

    /// A config file exists but could not be read or written.
    #[error("Filesystem error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid JSON.
    #[error("Config file '{path}' is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The tree could not be serialized back to JSON.
    #[error("Could not serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The `parent_config` chain is longer than allowed, most likely a cycle.
    #[error("Parent configs too deep: more than {depth} files, stopped at '{path}'.")]
    ParentsTooDeep { depth: usize, path: PathBuf },

    /// No selector was given and the tree declares no default.
    #[error("No {kind} selected and no default {kind} is configured.")]
    NoDefault { kind: &'static str },

    /// The selected device is not in `devices`.
    #[error("Unknown device '{0}'.")]
    UnknownDevice(String),

    /// The selected project is not in `projects`.
    #[error("Unknown project '{0}'.")]
    UnknownProject(String),

    /// The selected stage is not in the project's `stages`.
    #[error("Unknown stage '{stage}' for project '{project}'.")]
    UnknownStage { project: String, stage: String },

    /// A stage refers to a signing key missing from `keys`.
    #[error("Unknown key '{key}' referenced by stage '{stage}'.")]
    UnknownKey { stage: String, key: String },

    /// Project `parent` references form a loop.
    #[error("Circular project inheritance: {chain}")]
    ProjectCycle { chain: String },

    /// `configure` would replace an existing file without an edit intent.
    #[error("Not overwriting config at '{path}'. Add --edit options to do so.")]
    WouldOverwrite { path: PathBuf },

    /// A post-load hook rejected the configuration.
    #[error("Hook '{hook}' failed: {message}")]
    Hook { hook: String, message: String },
}

impl ConfigError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Shorthand for results in the configuration core.
pub type ConfigResult<T> = Result<T, ConfigError>;
