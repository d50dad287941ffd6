// src/core/bootstrap.rs

use crate::{
    constants::CONFIG_TEMPLATE,
    core::{
        active_view,
        config_loader::{expand_path, parse_document},
        error::{ConfigError, ConfigResult},
        field_editor,
    },
    models::ConfigTree,
    options::Options,
};
use std::fs;

/// Creates the config file named by `options.config` from the bundled template.
///
/// An existing file is only replaced when edits were requested. The edits are
/// applied to the template in memory and the file is written once they resolve,
/// so a bad selector leaves an existing file untouched. Returns the edited
/// tree, if any. Does nothing unless `options.configure` is set.
pub fn configure(options: &Options) -> ConfigResult<Option<ConfigTree>> {
    if !options.configure {
        return Ok(None);
    }

    let target = expand_path(&options.config, None);
    if target.exists() && options.edit_params.is_none() {
        return Err(ConfigError::WouldOverwrite { path: target });
    }

    let edited = match &options.edit_params {
        Some(params) => {
            let mut tree = ConfigTree::from_mapping(parse_document(CONFIG_TEMPLATE, &target)?);
            let selection = active_view::select(&tree, &options.selectors())?;
            let edits = field_editor::parse_edit_params(params);
            let applied = field_editor::apply_edits(&mut tree, &selection, &edits);
            log::debug!("Applied {} edit(s) to the template.", applied);
            Some(tree)
        }
        None => None,
    };

    if let Some(dir) = target.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;
    }
    match &edited {
        Some(tree) => field_editor::write_config(&target, tree)?,
        None => fs::write(&target, CONFIG_TEMPLATE).map_err(|e| ConfigError::io(&target, e))?,
    }
    log::info!("Wrote config template to '{}'.", target.display());
    Ok(edited)
}
