// src/constants.rs

/// The default location of the primary configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "~/.roku_config.json";

/// The name of the project-root overlay file, resolved against the working directory.
pub const LOCAL_CONFIG_FILENAME: &str = ".roku_config.json";

/// Maximum number of files in a `parent_config` chain, the primary file included.
pub const MAX_PARENT_DEPTH: usize = 10;

/// The field of a config document pointing at the next file up the chain.
pub const PARENT_CONFIG_KEY: &str = "parent_config";

/// The placeholder substituted by repeat-stage templates.
pub const REPEAT_PLACEHOLDER: &str = "{key}";

/// Keys under `projects` that hold settings rather than project entries.
pub const SKIPPABLE_PROJECT_KEYS: &[&str] = &["project_dir", "default"];

/// The stage method forced by `--working`.
pub const WORKING_STAGE_METHOD: &str = "working";

/// The template written by `--configure`.
pub const CONFIG_TEMPLATE: &str = include_str!("../config.json.example");

/// Returns true for `projects` keys that must not be treated as project entries.
pub fn is_skippable_project_key(key: &str) -> bool {
    SKIPPABLE_PROJECT_KEYS.contains(&key)
}
