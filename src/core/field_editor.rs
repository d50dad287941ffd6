// src/core/field_editor.rs

use crate::{
    core::{
        active_view::{self, Selection, Selectors},
        config_loader::{expand_path, load_parent_chain, read_document, rewrite_merged_tree},
        error::{ConfigError, ConfigResult},
    },
    models::{ConfigTree, Key, Mapping, Node},
};
use indexmap::IndexMap;
use std::{io::Write, path::Path};
use tempfile::NamedTempFile;

/// Where an edit key lands in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    /// `devices[device][key]`
    Device,
    /// `projects[project][key]`
    Project,
    /// `projects[project].stages[stage][key]`
    Stage,
}

impl EditTarget {
    /// The top-level section holding the target.
    pub fn section(self) -> &'static str {
        match self {
            Self::Device => "devices",
            Self::Project | Self::Stage => "projects",
        }
    }
}

/// The fixed dispatch table. Keys not listed here are ignored.
pub fn edit_target(key: &str) -> Option<EditTarget> {
    match key {
        "ip" | "user" | "password" => Some(EditTarget::Device),
        "directory" | "app_name" => Some(EditTarget::Project),
        "branch" => Some(EditTarget::Stage),
        _ => None,
    }
}

/// Parses `"key1:value1, key2:value2"`. Only the first colon splits a pair, so
/// values may contain colons. Whitespace around keys and values is trimmed.
pub fn parse_edit_params(params: &str) -> IndexMap<String, String> {
    params
        .split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once(':').unwrap_or((pair, ""));
            let key = key.trim();
            if key.is_empty() {
                None
            } else {
                Some((key.to_string(), value.trim().to_string()))
            }
        })
        .collect()
}

/// Applies parsed edits to `document` at an already resolved `selection`.
/// Device, project and stage entries missing from `document` are created.
/// Returns how many edits were applied.
pub fn apply_edits(
    document: &mut ConfigTree,
    selection: &Selection,
    edits: &IndexMap<String, String>,
) -> usize {
    let mut applied = 0;

    for (key, value) in edits {
        let Some(target) = edit_target(key) else {
            log::debug!("Ignoring unknown edit key '{}'.", key);
            continue;
        };
        let root = document.root_mut();
        let entry = match target {
            EditTarget::Device => child_map(root, "devices")
                .and_then(|d| child_map(d, selection.device.as_str())),
            EditTarget::Project => child_map(root, "projects")
                .and_then(|p| child_map(p, selection.project.as_str())),
            EditTarget::Stage => child_map(root, "projects")
                .and_then(|p| child_map(p, selection.project.as_str()))
                .and_then(|p| child_map(p, "stages"))
                .and_then(|s| child_map(s, selection.stage.as_str())),
        };
        let Some(entry) = entry else {
            continue;
        };
        entry.insert(Key::from(key.as_str()), Node::Str(value.clone()));
        log::info!("Set '{}' to '{}'.", key, value);
        applied += 1;
    }
    applied
}

/// The mapping under `key`, created when absent.
fn child_map<'a>(map: &'a mut Mapping, key: &str) -> Option<&'a mut Mapping> {
    let slot = map
        .entry(Key::from(key))
        .or_insert_with(|| Node::Map(Mapping::new()));
    if slot.as_map().is_none() {
        log::warn!("Replacing non-object '{}' with an empty object.", key);
        *slot = Node::Map(Mapping::new());
    }
    slot.as_map_mut()
}

/// Copies into `document` the top-level sections the edits touch that only an
/// ancestor declares. Parent files are merged section by section, so a partial
/// `devices` or `projects` in the child would hide the ancestor's entries.
fn adopt_inherited_sections(
    document: &mut ConfigTree,
    chain: &ConfigTree,
    edits: &IndexMap<String, String>,
) {
    for section in edits.keys().filter_map(|k| edit_target(k)).map(EditTarget::section) {
        if document.section(section).is_some() {
            continue;
        }
        if let Some(inherited) = chain.section(section) {
            log::debug!("Copying inherited '{}' into the edited file.", section);
            document.root_mut().insert(Key::from(section), inherited.clone());
        }
    }
}

/// Edits the config file at `config_path` and writes it back.
///
/// The device, project and stage are selected on the resolved parent chain
/// (without the local overlay), but only the file itself is rewritten: its
/// `parent_config` link and repeat templates stay as they are.
pub fn edit_config_file(
    config_path: &str,
    selectors: &Selectors,
    edit_params: &str,
) -> ConfigResult<ConfigTree> {
    let path = expand_path(config_path, None);
    if !path.is_file() {
        return Err(ConfigError::MissingConfig { path });
    }
    let mut document = ConfigTree::from_mapping(read_document(&path)?);

    let (chain, _) = load_parent_chain(config_path)?;
    let mut resolved = chain.clone();
    rewrite_merged_tree(&mut resolved)?;
    let selection = active_view::select(&resolved, selectors)?;

    let edits = parse_edit_params(edit_params);
    adopt_inherited_sections(&mut document, &chain, &edits);
    let applied = apply_edits(&mut document, &selection, &edits);
    write_config(&path, &document)?;
    log::info!("Applied {} edit(s) to '{}'.", applied, path.display());
    Ok(document)
}

/// Writes `tree` as pretty JSON, replacing `path` atomically.
pub fn write_config(path: &Path, tree: &ConfigTree) -> ConfigResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut content = tree.to_pretty_json().map_err(ConfigError::Serialize)?;
    content.push('\n');

    let mut file = NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(dir, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| ConfigError::io(file.path(), e))?;
    file.persist(path)
        .map_err(|e| ConfigError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_loader::{LoadRequest, load_raw_config};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_sample(dir: &Path) -> String {
        let path = dir.join("config.json");
        let value = json!({
            "devices": {
                "default": "roku",
                "roku": {"ip": "192.168.0.100", "user": "rokudev", "password": "aaaa"}
            },
            "projects": {
                "default": "p1",
                "p1": {
                    "directory": "/repo",
                    "app_name": "app",
                    "stages": {
                        "production": {"branch": "master"},
                        "!repeat": {"for": ["a"], "stages": {"{key}": {"branch": "{key}"}}}
                    }
                }
            }
        });
        fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_parse_edit_params() {
        let edits = parse_edit_params("ip:123.456.789, directory : /a/b,url:http://x:80,junk");
        assert_eq!(edits.get("ip").map(String::as_str), Some("123.456.789"));
        assert_eq!(edits.get("directory").map(String::as_str), Some("/a/b"));
        assert_eq!(edits.get("url").map(String::as_str), Some("http://x:80"));
        assert_eq!(edits.get("junk").map(String::as_str), Some(""));
        assert!(parse_edit_params("").is_empty());
    }

    #[test]
    fn test_dispatch_table() {
        assert_eq!(edit_target("password"), Some(EditTarget::Device));
        assert_eq!(edit_target("app_name"), Some(EditTarget::Project));
        assert_eq!(edit_target("branch"), Some(EditTarget::Stage));
        assert_eq!(edit_target("folders"), None);
    }

    #[test]
    fn test_edit_ip_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(dir.path());

        edit_config_file(&path, &Selectors::default(), "ip:123.456.789").unwrap();

        let request = LoadRequest::new(path.clone()).unwrap().with_local_root(dir.path().join("none"));
        let loaded = load_raw_config(&request).unwrap();
        let roku = loaded.tree.devices().unwrap().get("roku").unwrap();
        assert_eq!(roku.get_str("ip"), Some("123.456.789"));
        assert_eq!(roku.get_str("user"), Some("rokudev"));
        assert_eq!(roku.get_str("password"), Some("aaaa"));
        let p1 = loaded.tree.projects().unwrap().get("p1").unwrap();
        assert_eq!(p1.get_str("directory"), Some("/repo"));
    }

    #[test]
    fn test_edits_land_in_project_and_stage() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(dir.path());

        let tree = edit_config_file(
            &path,
            &Selectors::default(),
            "directory:/test/dir, branch:test, colour:blue",
        )
        .unwrap();

        let p1 = tree.projects().unwrap().get("p1").unwrap();
        assert_eq!(p1.get_str("directory"), Some("/test/dir"));
        let stages = p1.get("stages").unwrap();
        assert_eq!(stages.get("production").unwrap().get_str("branch"), Some("test"));
        assert!(p1.get("colour").is_none());
    }

    #[test]
    fn test_edit_keeps_file_unexpanded_and_unnormalized() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(dir.path());

        edit_config_file(&path, &Selectors::default(), "app_name:renamed").unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["projects"]["p1"]["app_name"], json!("renamed"));
        assert!(written["projects"]["p1"]["stages"].get("!repeat").is_some());
        assert_eq!(written["devices"]["default"], json!("roku"));
    }

    #[test]
    fn test_edit_with_unknown_selector_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(dir.path());
        let before = fs::read_to_string(&path).unwrap();
        let selectors = Selectors {
            device: Some("ghost".into()),
            ..Default::default()
        };

        let result = edit_config_file(&path, &selectors, "ip:1.1.1.1");

        assert!(matches!(result, Err(ConfigError::UnknownDevice(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    fn write_json(dir: &Path, name: &str, value: serde_json::Value) -> String {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        path.display().to_string()
    }

    fn read_json(path: &str) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_edit_child_config_using_parent_defaults() {
        let dir = TempDir::new().unwrap();
        let parent = write_json(
            dir.path(),
            "parent.json",
            json!({"devices": {"default": "roku", "roku": {"ip": "192.168.0.100", "user": "rokudev"}}}),
        );
        let parent_before = fs::read_to_string(&parent).unwrap();
        let child = write_json(
            dir.path(),
            "child.json",
            json!({
                "parent_config": "parent.json",
                "projects": {"default": "p1", "p1": {"stages": {"prod": {}}}}
            }),
        );

        edit_config_file(&child, &Selectors::default(), "app_name:renamed").unwrap();

        let written = read_json(&child);
        assert_eq!(written["projects"]["p1"]["app_name"], json!("renamed"));
        assert_eq!(written["parent_config"], json!("parent.json"));
        assert!(written.get("devices").is_none());
        assert_eq!(fs::read_to_string(&parent).unwrap(), parent_before);
    }

    #[test]
    fn test_device_edit_in_child_keeps_inherited_devices() {
        let dir = TempDir::new().unwrap();
        write_json(
            dir.path(),
            "parent.json",
            json!({"devices": {"default": "roku", "roku": {"ip": "192.168.0.100", "user": "rokudev"}}}),
        );
        let child = write_json(
            dir.path(),
            "child.json",
            json!({
                "parent_config": "parent.json",
                "projects": {"default": "p1", "p1": {"stages": {"prod": {}}}}
            }),
        );

        edit_config_file(&child, &Selectors::default(), "ip:10.0.0.9").unwrap();

        let request = LoadRequest::new(child.clone()).unwrap().with_local_root(dir.path().join("none"));
        let loaded = load_raw_config(&request).unwrap();
        let devices = loaded.tree.devices().unwrap();
        assert_eq!(devices.get("default").and_then(Node::as_str), Some("roku"));
        let roku = devices.get("roku").unwrap();
        assert_eq!(roku.get_str("ip"), Some("10.0.0.9"));
        assert_eq!(roku.get_str("user"), Some("rokudev"));
    }

    #[test]
    fn test_stage_edit_on_inherited_stage_creates_entry() {
        let dir = TempDir::new().unwrap();
        let path = write_json(
            dir.path(),
            "config.json",
            json!({
                "devices": {"default": "roku", "roku": {"ip": "192.168.0.100"}},
                "projects": {
                    "default": "p1",
                    "base": {"stages": {"prod": {"branch": "master", "key": "k1"}}},
                    "p1": {"parent": "base", "directory": "/repo"}
                },
                "keys": {"k1": {"password": "secret"}}
            }),
        );

        edit_config_file(&path, &Selectors::default(), "branch:release").unwrap();

        let written = read_json(&path);
        assert_eq!(written["projects"]["p1"]["stages"]["prod"], json!({"branch": "release"}));
        assert_eq!(written["projects"]["base"]["stages"]["prod"]["branch"], json!("master"));

        let request = LoadRequest::new(path.clone()).unwrap().with_local_root(dir.path().join("none"));
        let loaded = load_raw_config(&request).unwrap();
        let prod = loaded.tree.projects().unwrap().get("p1").unwrap().get("stages").unwrap().get("prod").unwrap();
        assert_eq!(prod.get_str("branch"), Some("release"));
        assert_eq!(prod.get_str("key"), Some("k1"));
    }

    #[test]
    fn test_edit_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json").display().to_string();
        assert!(matches!(
            edit_config_file(&path, &Selectors::default(), "ip:1"),
            Err(ConfigError::MissingConfig { .. })
        ));
    }
}
