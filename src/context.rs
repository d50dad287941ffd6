// src/context.rs

use crate::{
    core::{
        active_view::ParsedConfig,
        config_loader::{self, LoadRequest, LoadedConfig},
        error::{ConfigError, ConfigResult},
    },
    models::ConfigTree,
    options::Options,
};
use std::fmt;
use std::path::PathBuf;

/// Runs after the raw config is assembled, before anything reads it.
pub trait ConfigHook: fmt::Debug {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// May inspect or rewrite the tree. An error aborts resolution.
    fn post_config_load(&self, tree: &mut ConfigTree, options: &Options) -> anyhow::Result<()>;
}

/// Everything one invocation needs, built once at startup and passed down.
#[derive(Debug)]
pub struct AppContext {
    options: Options,
    hooks: Vec<Box<dyn ConfigHook>>,
    local_root: Option<PathBuf>,
}

impl AppContext {
    /// A context with no hooks whose overlay is read from the working directory.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            hooks: Vec::new(),
            local_root: None,
        }
    }

    /// Registers a post-load hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: impl ConfigHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Reads the local overlay from `local_root` instead of the working directory.
    pub fn with_local_root(mut self, local_root: impl Into<PathBuf>) -> Self {
        self.local_root = Some(local_root.into());
        self
    }

    /// The invocation's options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Assembles the raw tree and runs every hook over it.
    pub fn load_config(&self) -> ConfigResult<LoadedConfig> {
        let mut request = LoadRequest::new(self.options.config.clone())?;
        if let Some(root) = &self.local_root {
            request = request.with_local_root(root.clone());
        }

        let mut loaded = config_loader::load_raw_config(&request)?;
        for hook in &self.hooks {
            log::debug!("Running post-load hook '{}'.", hook.name());
            hook.post_config_load(&mut loaded.tree, &self.options)
                .map_err(|e| ConfigError::Hook {
                    hook: hook.name().to_string(),
                    message: format!("{:#}", e),
                })?;
        }
        Ok(loaded)
    }

    /// Builds the active view of `tree` for this invocation.
    pub fn parse_config(&self, tree: &ConfigTree) -> ConfigResult<ParsedConfig> {
        ParsedConfig::build(tree, &self.options)
    }
}
