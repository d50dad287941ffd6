// src/core/stage_expander.rs

use crate::{
    constants::{REPEAT_PLACEHOLDER, is_skippable_project_key},
    models::{ConfigTree, Key, Mapping, Node},
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Any stage key containing `!repeat` is a template, e.g. `!repeat`, `!repeat_2`.
    static ref REPEAT_RE: Regex = Regex::new(r"!repeat.*").expect("static regex is valid");
}

/// Whether a stage key marks a repeat-stage template.
pub fn is_repeat_marker(key: &str) -> bool {
    REPEAT_RE.is_match(key)
}

/// Expands every repeat-stage template in every project.
///
/// A template looks like:
///
/// ```json
/// "!repeat": {
///   "for": ["a", "b"],
///   "stages": { "{key}": { "script": { "stage": "stage_script {key}" } } }
/// }
/// ```
///
/// and yields stages `a` and `b` with the placeholder substituted everywhere.
/// The marker entry is removed. Generated stages are added after the
/// declared ones; on key collisions the last expansion wins.
pub fn expand_repeatable_stages(tree: &mut ConfigTree) {
    let Some(projects) = tree.projects_mut() else {
        return;
    };
    for (project_key, project) in projects.iter_mut() {
        if is_skippable_project_key(project_key.as_str()) {
            continue;
        }
        if let Some(stages) = project.get_mut("stages").and_then(Node::as_map_mut) {
            expand_project_stages(project_key, stages);
        }
    }
}

fn expand_project_stages(project_key: &Key, stages: &mut Mapping) {
    let markers: Vec<Key> = stages
        .keys()
        .filter(|key| is_repeat_marker(key.as_str()))
        .cloned()
        .collect();
    if markers.is_empty() {
        return;
    }

    let mut stages_to_add = Mapping::new();
    for marker in markers {
        let Some(template) = stages.shift_remove(&marker) else {
            continue;
        };
        let (values, templates) = match (
            template.get("for"),
            template.get("stages").and_then(Node::as_map),
        ) {
            (Some(Node::Seq(values)), Some(templates)) => (values, templates),
            _ => {
                log::warn!(
                    "Repeat stage '{}' in project '{}' needs a 'for' list and a 'stages' map. Skipping.",
                    marker,
                    project_key
                );
                continue;
            }
        };

        for value in values {
            let Some(value) = value.to_text() else {
                log::warn!(
                    "Ignoring non-scalar 'for' value in repeat stage '{}' of project '{}'.",
                    marker,
                    project_key
                );
                continue;
            };
            for (stage_key, stage) in templates {
                let key = Key::new(stage_key.as_str().replace(REPEAT_PLACEHOLDER, &value));
                stages_to_add.insert(key, substitute(stage, &value));
            }
        }
        log::debug!("Expanded repeat stage '{}' in project '{}'.", marker, project_key);
    }

    for (key, stage) in stages_to_add {
        stages.insert(key, stage);
    }
}

/// Returns a deep copy of `node` with every placeholder in string and key-token
/// values replaced by `value`. Mapping keys are copied unchanged.
pub fn substitute(node: &Node, value: &str) -> Node {
    match node {
        Node::Map(map) => Node::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, value)))
                .collect(),
        ),
        Node::Seq(items) => Node::Seq(items.iter().map(|item| substitute(item, value)).collect()),
        Node::Str(s) => Node::Str(s.replace(REPEAT_PLACEHOLDER, value)),
        Node::Key(k) => Node::Key(Key::new(k.as_str().replace(REPEAT_PLACEHOLDER, value))),
        Node::Scalar(scalar) => Node::Scalar(scalar.clone()),
    }
}
