//! # Config Loader
//!
//! Builds the raw configuration tree for one invocation. The pipeline is fixed:
//!
//! 1. **Parent chain:** the primary file and every file reached through
//!    `parent_config` links are merged; the most specific file wins on
//!    top-level key collisions and ancestors only fill in missing sections.
//! 2. **Local overlay:** `./.roku_config.json` under the local root is deep
//!    merged on top, winning at every nesting level.
//! 3. **Stage expansion**, 4. **key normalization** and 5. **project
//!    inheritance** then rewrite the merged tree in place.

use crate::{
    constants::{LOCAL_CONFIG_FILENAME, MAX_PARENT_DEPTH, PARENT_CONFIG_KEY},
    core::{
        error::{ConfigError, ConfigResult},
        normalizer, project_resolver, stage_expander,
    },
    models::{ConfigTree, LoadedPathSet, Mapping, Node, deep_merge},
};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// What to load: the primary file and the directory holding the local overlay.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Path to the primary config file, as given by the user (`~` allowed).
    pub config_path: String,
    /// Directory searched for the overlay file; also backfills overlay project directories.
    pub local_root: PathBuf,
}

impl LoadRequest {
    /// A request whose overlay is looked up in the process working directory.
    pub fn new(config_path: impl Into<String>) -> ConfigResult<Self> {
        let local_root = env::current_dir().map_err(|e| ConfigError::io(".", e))?;
        Ok(Self {
            config_path: config_path.into(),
            local_root,
        })
    }

    /// Overrides the overlay directory.
    pub fn with_local_root(mut self, local_root: impl Into<PathBuf>) -> Self {
        self.local_root = local_root.into();
        self
    }
}

/// The outcome of the load pipeline.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The fully merged, expanded, normalized tree.
    pub tree: ConfigTree,
    /// Every file that contributed to it.
    pub loaded: LoadedPathSet,
}

/// Runs the whole pipeline and returns the raw configuration tree.
pub fn load_raw_config(request: &LoadRequest) -> ConfigResult<LoadedConfig> {
    let (mut tree, mut loaded) = load_parent_chain(&request.config_path)?;
    merge_local_config(&mut tree, &mut loaded, &request.local_root)?;
    rewrite_merged_tree(&mut tree)?;
    log::debug!(
        "Config resolved from {} file(s): {:?}",
        loaded.len(),
        loaded.in_load_order()
    );
    Ok(LoadedConfig { tree, loaded })
}

/// The in-place stages that follow merging: stage expansion, then key
/// normalization, then project inheritance.
pub fn rewrite_merged_tree(tree: &mut ConfigTree) -> ConfigResult<()> {
    stage_expander::expand_repeatable_stages(tree);
    normalizer::normalize_key_values(tree);
    project_resolver::resolve_inherited_projects(tree)
}

/// Walks the `parent_config` chain starting at `config_path`.
///
/// Each file's path is resolved relative to the directory of the file that
/// named it. Top-level fields already present in the accumulated tree are kept,
/// so the first-loaded (most specific) file wins. The returned tree carries no
/// `parent_config` field.
pub fn load_parent_chain(config_path: &str) -> ConfigResult<(ConfigTree, LoadedPathSet)> {
    let mut accumulated = Mapping::new();
    let mut loaded = LoadedPathSet::default();
    let mut next = Some(resolve_existing(config_path, None)?);
    let mut depth = 0;

    while let Some(path) = next.take() {
        depth += 1;
        if depth > MAX_PARENT_DEPTH {
            return Err(ConfigError::ParentsTooDeep {
                depth: MAX_PARENT_DEPTH,
                path,
            });
        }

        let mut document = read_document(&path)?;
        log::debug!("Merging config layer {}: '{}'", depth, path.display());

        if let Some(parent) = document.shift_remove(PARENT_CONFIG_KEY) {
            match parent.as_str() {
                Some(parent_path) => {
                    next = Some(resolve_existing(parent_path, path.parent())?);
                }
                None => log::warn!(
                    "Ignoring non-string '{}' in '{}'.",
                    PARENT_CONFIG_KEY,
                    path.display()
                ),
            }
        }
        loaded.insert(path);

        for (key, value) in document {
            accumulated.entry(key).or_insert(value);
        }
    }

    Ok((ConfigTree::from_mapping(accumulated), loaded))
}

/// Deep merges the overlay file under `local_root` into `tree`, overlay winning.
///
/// Skipped silently when the file is absent or already part of the parent chain.
/// Overlay projects without a `directory` get `local_root` as their directory.
pub fn merge_local_config(
    tree: &mut ConfigTree,
    loaded: &mut LoadedPathSet,
    local_root: &Path,
) -> ConfigResult<()> {
    let overlay_path = local_root.join(LOCAL_CONFIG_FILENAME);
    if !overlay_path.is_file() {
        return Ok(());
    }
    let overlay_path = canonical(&overlay_path)?;
    if loaded.contains(&overlay_path) {
        log::debug!(
            "Local config '{}' is already part of the parent chain.",
            overlay_path.display()
        );
        return Ok(());
    }

    let mut overlay = read_document(&overlay_path)?;
    add_missing_directories(&mut overlay, local_root);
    deep_merge(tree.root_mut(), overlay);
    loaded.insert(overlay_path.clone());
    log::info!("Merged local config '{}'.", overlay_path.display());
    Ok(())
}

fn add_missing_directories(overlay: &mut Mapping, local_root: &Path) {
    let Some(projects) = overlay.get_mut("projects").and_then(Node::as_map_mut) else {
        return;
    };
    let directory = local_root.display().to_string();
    for project in projects.values_mut() {
        if let Node::Map(fields) = project
            && !fields.contains_key("directory")
        {
            fields.insert("directory".into(), Node::Str(directory.clone()));
        }
    }
}

/// Reads and parses one config document. The root must be a JSON object.
pub fn read_document(path: &Path) -> ConfigResult<Mapping> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    parse_document(&content, path)
}

/// Parses config text; `path` only names the source in errors.
pub fn parse_document(content: &str, path: &Path) -> ConfigResult<Mapping> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    match Node::from(value) {
        Node::Map(map) => Ok(map),
        _ => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            source: serde::de::Error::custom("the top level must be a JSON object"),
        }),
    }
}

/// Expands `~` and resolves a relative path against `base_dir`, or against the
/// working directory when there is no base.
pub fn expand_path(raw: &str, base_dir: Option<&Path>) -> PathBuf {
    let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
    if path.is_absolute() {
        return path;
    }
    match base_dir {
        Some(dir) => dir.join(path),
        None => env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path),
    }
}

fn resolve_existing(raw: &str, base_dir: Option<&Path>) -> ConfigResult<PathBuf> {
    let path = expand_path(raw, base_dir);
    if !path.is_file() {
        return Err(ConfigError::MissingConfig { path });
    }
    canonical(&path)
}

fn canonical(path: &Path) -> ConfigResult<PathBuf> {
    dunce::canonicalize(path).map_err(|e| ConfigError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn write_json(dir: &Path, name: &str, value: Value) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        path
    }

    fn request(path: &Path, local_root: &Path) -> LoadRequest {
        LoadRequest {
            config_path: path.display().to_string(),
            local_root: local_root.to_path_buf(),
        }
    }

    fn base_config() -> Value {
        json!({
            "devices": {
                "default": "roku",
                "roku": {"ip": "192.168.0.100", "user": "rokudev", "password": "aaaa"}
            },
            "projects": {
                "default": "p1",
                "p1": {
                    "directory": "/tmp/p1",
                    "app_name": "app",
                    "stage_method": "git",
                    "stages": {"production": {"branch": "master"}}
                }
            },
            "input_mappings": {"a": ["home", "Home"]}
        })
    }

    #[test]
    fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        let path = write_json(dir.path(), "config.json", base_config());
        let empty = TempDir::new().unwrap();

        let loaded = load_raw_config(&request(&path, empty.path())).unwrap();
        let devices = loaded.tree.devices().unwrap();
        assert_eq!(devices.get("default").and_then(Node::as_key).unwrap().as_str(), "roku");
        assert_eq!(loaded.loaded.len(), 1);
    }

    #[test]
    fn test_missing_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let result = load_raw_config(&request(&path, dir.path()));
        assert!(matches!(result, Err(ConfigError::MissingConfig { .. })));
    }

    #[test]
    fn test_non_json_config_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("non_json.json");
        fs::write(&path, "devices: { roku }").unwrap();
        let result = load_raw_config(&request(&path, dir.path()));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_child_wins_over_parent_and_parent_fills_gaps() {
        let dir = TempDir::new().unwrap();
        write_json(
            dir.path(),
            "parent.json",
            json!({
                "devices": {"default": "other", "other": {"ip": "10.0.0.1"}},
                "keys": {"k1": {"keyed_pkg": "/pkg", "password": "secret"}}
            }),
        );
        let mut child = base_config();
        child["parent_config"] = json!("parent.json");
        let path = write_json(dir.path(), "child.json", child);

        let (tree, loaded) = load_parent_chain(&path.display().to_string()).unwrap();
        assert_eq!(
            tree.devices().unwrap().get("default").and_then(Node::as_str),
            Some("roku")
        );
        assert!(tree.section("keys").is_some());
        assert!(tree.section(PARENT_CONFIG_KEY).is_none());
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_parent_path_is_relative_to_referencing_file() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        write_json(&nested, "grandparent.json", json!({"keys": {}}));
        write_json(
            &nested,
            "parent.json",
            json!({"parent_config": "grandparent.json", "input_mappings": {}}),
        );
        let path = write_json(
            root.path(),
            "child.json",
            json!({"parent_config": "nested/parent.json", "devices": {}}),
        );

        let (tree, loaded) = load_parent_chain(&path.display().to_string()).unwrap();
        assert_eq!(loaded.len(), 3);
        for section in ["devices", "input_mappings", "keys"] {
            assert!(tree.section(section).is_some(), "missing section {}", section);
        }
    }

    fn write_chain(dir: &Path, files: usize) -> PathBuf {
        for i in 0..files {
            let mut doc = json!({ format!("section_{}", i): {"level": i} });
            if i + 1 < files {
                doc["parent_config"] = json!(format!("config_{}.json", i + 1));
            }
            write_json(dir, &format!("config_{}.json", i), doc);
        }
        dir.join("config_0.json")
    }

    #[test]
    fn test_chain_of_max_depth_succeeds() {
        let dir = TempDir::new().unwrap();
        let path = write_chain(dir.path(), MAX_PARENT_DEPTH);
        let (tree, _) = load_parent_chain(&path.display().to_string()).unwrap();
        assert_eq!(tree.root().len(), MAX_PARENT_DEPTH);
    }

    #[test]
    fn test_chain_beyond_max_depth_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_chain(dir.path(), MAX_PARENT_DEPTH + 1);
        let result = load_parent_chain(&path.display().to_string());
        assert!(matches!(result, Err(ConfigError::ParentsTooDeep { .. })));
    }

    #[test]
    fn test_self_referencing_parent_fails_with_depth_error() {
        let dir = TempDir::new().unwrap();
        let path = write_json(dir.path(), "loop.json", json!({"parent_config": "loop.json"}));
        let result = load_parent_chain(&path.display().to_string());
        assert!(matches!(result, Err(ConfigError::ParentsTooDeep { .. })));
    }

    #[test]
    fn test_missing_parent_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_json(dir.path(), "child.json", json!({"parent_config": "gone.json"}));
        let result = load_parent_chain(&path.display().to_string());
        assert!(matches!(result, Err(ConfigError::MissingConfig { .. })));
    }

    #[test]
    fn test_local_overlay_wins_and_backfills_directory() {
        let config_dir = TempDir::new().unwrap();
        let path = write_json(config_dir.path(), "config.json", base_config());
        let project_root = TempDir::new().unwrap();
        write_json(
            project_root.path(),
            LOCAL_CONFIG_FILENAME,
            json!({
                "devices": {"roku": {"ip": "10.1.1.1"}},
                "projects": {"p2": {"app_name": "app2", "stages": {"dev": {"branch": "dev"}}}}
            }),
        );

        let loaded = load_raw_config(&request(&path, project_root.path())).unwrap();
        let tree = &loaded.tree;
        let roku = tree.devices().unwrap().get("roku").unwrap();
        assert_eq!(roku.get_str("ip"), Some("10.1.1.1"));
        assert_eq!(roku.get_str("user"), Some("rokudev"));

        let p2 = tree.projects().unwrap().get("p2").unwrap();
        assert_eq!(p2.get_str("app_name"), Some("app2"));
        assert_eq!(
            p2.get_str("directory"),
            Some(project_root.path().display().to_string().as_str())
        );
        assert_eq!(loaded.loaded.len(), 2);
    }

    #[test]
    fn test_overlay_already_in_chain_is_not_merged_twice() {
        let dir = TempDir::new().unwrap();
        let mut config = base_config();
        config["projects"]["p2"] = json!({"app_name": "app2", "stages": {"a": {}}});
        let path = write_json(dir.path(), LOCAL_CONFIG_FILENAME, config);

        let loaded = load_raw_config(&request(&path, dir.path())).unwrap();
        let p2 = loaded.tree.projects().unwrap().get("p2").unwrap();
        // A second merge would have backfilled the directory.
        assert!(p2.get("directory").is_none());
        assert_eq!(loaded.loaded.len(), 1);
    }

    #[test]
    fn test_full_load_expands_normalizes_then_inherits() {
        let config_dir = TempDir::new().unwrap();
        let path = write_json(
            config_dir.path(),
            "config.json",
            json!({
                "devices": {"default": "roku", "roku": {"ip": "192.168.0.100"}},
                "projects": {
                    "default": "p1",
                    "base": {
                        "stage_method": "git",
                        "stages": {
                            "!repeat": {"for": ["a", "b"], "stages": {"{key}_stage": {"branch": "{key}"}}}
                        }
                    },
                    "p1": {"parent": "base", "app_name": "app"}
                }
            }),
        );
        let project_root = TempDir::new().unwrap();
        write_json(
            project_root.path(),
            LOCAL_CONFIG_FILENAME,
            json!({
                "projects": {
                    "p1": {
                        "stages": {
                            "!repeat_local": {"for": ["x"], "stages": {"{key}": {"branch": "local_{key}"}}}
                        }
                    },
                    "p2": {"stage_method": "script", "stages": {"dev": {}}}
                }
            }),
        );

        let loaded = load_raw_config(&request(&path, project_root.path())).unwrap();
        let projects = loaded.tree.projects().unwrap();

        assert_eq!(projects.get("default").and_then(Node::as_key).map(|k| k.as_str()), Some("p1"));

        let p1 = projects.get("p1").unwrap();
        let stages = p1.get("stages").and_then(Node::as_map).unwrap();
        let mut names: Vec<&str> = stages.keys().map(|k| k.as_str()).collect();
        names.sort();
        assert_eq!(names, ["a_stage", "b_stage", "x"]);
        assert_eq!(stages.get("x").unwrap().get_str("branch"), Some("local_x"));
        assert_eq!(stages.get("a_stage").unwrap().get_str("branch"), Some("a"));
        assert_eq!(
            p1.get("stage_method").and_then(Node::as_key).map(|k| k.as_str()),
            Some("git")
        );

        let p2 = projects.get("p2").unwrap();
        assert_eq!(
            p2.get("stage_method").and_then(Node::as_key).map(|k| k.as_str()),
            Some("script")
        );
    }

    #[test]
    fn test_expand_path_joins_relative_paths_to_base() {
        let base = Path::new("/etc/roku");
        assert_eq!(expand_path("parent.json", Some(base)), base.join("parent.json"));
        assert_eq!(expand_path("/abs/p.json", Some(base)), PathBuf::from("/abs/p.json"));
    }
}
