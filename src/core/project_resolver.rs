// src/core/project_resolver.rs

use crate::{
    constants::is_skippable_project_key,
    core::error::{ConfigError, ConfigResult},
    models::{ConfigTree, Key, Mapping, Node, deep_merge},
};

const PARENT_KEY: &str = "parent";

/// Folds each project's `parent` chain into the project itself.
///
/// The project's own fields win on collision; anything it does not declare is
/// taken from the parent, then the parent's parent, and so on. The `parent`
/// field never survives. A reference to a project that does not exist ends the
/// chain with a warning; a reference back into the chain is an error.
pub fn resolve_inherited_projects(tree: &mut ConfigTree) -> ConfigResult<()> {
    let Some(projects) = tree.projects_mut() else {
        return Ok(());
    };
    let keys: Vec<Key> = projects
        .keys()
        .filter(|key| !is_skippable_project_key(key.as_str()))
        .cloned()
        .collect();

    for key in keys {
        resolve_project(projects, &key)?;
    }
    Ok(())
}

fn resolve_project(projects: &mut Mapping, key: &Key) -> ConfigResult<()> {
    let mut chain = vec![key.clone()];

    loop {
        let Some(Node::Map(project)) = projects.get_mut(key) else {
            return Ok(());
        };
        let Some(parent) = project.shift_remove(PARENT_KEY) else {
            return Ok(());
        };
        let Some(parent_name) = parent.as_str().map(Key::from) else {
            log::warn!("Project '{}' has a non-string parent. Ignoring it.", key);
            return Ok(());
        };

        if chain.contains(&parent_name) {
            chain.push(parent_name);
            let names: Vec<&str> = chain.iter().map(Key::as_str).collect();
            return Err(ConfigError::ProjectCycle {
                chain: names.join(" -> "),
            });
        }

        let inherited = match projects.get(&parent_name) {
            Some(Node::Map(fields)) if !is_skippable_project_key(parent_name.as_str()) => {
                fields.clone()
            }
            _ => {
                log::warn!(
                    "Project '{}' inherits from unknown project '{}'. Ignoring it.",
                    key,
                    parent_name
                );
                return Ok(());
            }
        };

        let Some(Node::Map(own)) = projects.get_mut(key) else {
            return Ok(());
        };
        let mut merged = inherited;
        deep_merge(&mut merged, std::mem::take(own));
        *own = merged;
        log::debug!("Project '{}' inherited from '{}'.", key, parent_name);
        chain.push(parent_name);
    }
}
