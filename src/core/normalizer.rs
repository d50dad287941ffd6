// src/core/normalizer.rs

use crate::{
    constants::is_skippable_project_key,
    models::{ConfigTree, Key, Node},
};

/// Converts `devices.default`, `projects.default` and every project's
/// `stage_method` from plain strings to key tokens. Absent fields are left alone.
pub fn normalize_key_values(tree: &mut ConfigTree) {
    if let Some(devices) = tree.devices_mut()
        && let Some(default) = devices.get_mut("default")
    {
        to_key(default);
    }

    let Some(projects) = tree.projects_mut() else {
        return;
    };
    if let Some(default) = projects.get_mut("default") {
        to_key(default);
    }
    for (key, project) in projects.iter_mut() {
        if is_skippable_project_key(key.as_str()) {
            continue;
        }
        if let Some(method) = project.get_mut("stage_method") {
            to_key(method);
        }
    }
}

fn to_key(node: &mut Node) {
    if let Node::Str(s) = node {
        *node = Node::Key(Key::new(std::mem::take(s)));
    }
}
