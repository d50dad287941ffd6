//! # Active View
//!
//! Picks the device, project and stage an invocation operates on and builds
//! the command-scoped parameter bundles from them.
//!
//! Selection rule, shared with the field editor: an explicit selector wins,
//! otherwise `devices.default` / `projects.default`, and for the stage the
//! first key of the project's `stages` in declaration order. Whatever is
//! selected must exist in the tree.

use crate::{
    constants::{WORKING_STAGE_METHOD, is_skippable_project_key},
    core::{
        config_loader::expand_path,
        error::{ConfigError, ConfigResult},
        stage_expander::is_repeat_marker,
    },
    models::{ConfigTree, Key, Mapping, Node},
    options::Options,
};
use serde::Serialize;
use std::{
    env,
    path::{Path, PathBuf},
};

/// Optional device/project/stage overrides.
#[derive(Debug, Clone, Default)]
pub struct Selectors {
    /// Device key override.
    pub device: Option<String>,
    /// Project key override.
    pub project: Option<String>,
    /// Stage key override.
    pub stage: Option<String>,
}

/// The effective device, project and stage keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Key into `devices`.
    pub device: Key,
    /// Key into `projects`.
    pub project: Key,
    /// Key into the project's `stages`.
    pub stage: Key,
}

/// Resolves all three selectors against `tree`.
pub fn select(tree: &ConfigTree, selectors: &Selectors) -> ConfigResult<Selection> {
    let device = select_device(tree, selectors.device.as_deref())?;
    let project = select_project(tree, selectors.project.as_deref())?;
    let stage = select_stage(tree, &project, selectors.stage.as_deref())?;
    Ok(Selection {
        device,
        project,
        stage,
    })
}

/// The requested device, or `devices.default`.
pub fn select_device(tree: &ConfigTree, requested: Option<&str>) -> ConfigResult<Key> {
    let devices = tree.devices();
    let key = pick(requested, devices, "device")?;
    match devices.and_then(|d| d.get(&key)) {
        Some(Node::Map(_)) if key.as_str() != "default" => Ok(key),
        _ => Err(ConfigError::UnknownDevice(key.to_string())),
    }
}

/// The requested project, or `projects.default`.
pub fn select_project(tree: &ConfigTree, requested: Option<&str>) -> ConfigResult<Key> {
    let projects = tree.projects();
    let key = pick(requested, projects, "project")?;
    match projects.and_then(|p| p.get(&key)) {
        Some(Node::Map(_)) if !is_skippable_project_key(key.as_str()) => Ok(key),
        _ => Err(ConfigError::UnknownProject(key.to_string())),
    }
}

/// The requested stage, or the first stage declared by `project`.
pub fn select_stage(tree: &ConfigTree, project: &Key, requested: Option<&str>) -> ConfigResult<Key> {
    let stages = tree
        .projects()
        .and_then(|p| p.get(project))
        .and_then(|p| p.get("stages"))
        .and_then(Node::as_map);

    let key = match requested {
        Some(stage) => Key::from(stage),
        None => stages
            .and_then(|s| s.keys().find(|k| !is_repeat_marker(k.as_str())))
            .cloned()
            .ok_or(ConfigError::NoDefault { kind: "stage" })?,
    };

    if stages.is_some_and(|s| s.contains_key(&key)) {
        Ok(key)
    } else {
        Err(ConfigError::UnknownStage {
            project: project.to_string(),
            stage: key.to_string(),
        })
    }
}

fn pick(requested: Option<&str>, section: Option<&Mapping>, kind: &'static str) -> ConfigResult<Key> {
    if let Some(name) = requested {
        return Ok(Key::from(name));
    }
    section
        .and_then(|s| s.get("default"))
        .and_then(Node::as_str)
        .map(Key::from)
        .ok_or(ConfigError::NoDefault { kind })
}

// --- PARAMETER BUNDLES ---

/// Connection settings of the selected device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceConfig {
    /// Device address.
    pub ip: Option<String>,
    /// Developer mode user.
    pub user: Option<String>,
    /// Developer mode password.
    pub password: Option<String>,
}

/// The selected project's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectConfig {
    /// Project key.
    pub key: Key,
    /// Repository directory.
    pub directory: Option<PathBuf>,
    /// Display name used for packages.
    pub app_name: Option<String>,
    /// Files and folders that make up the app.
    pub source_files: Vec<String>,
    /// Paths skipped when building.
    pub excludes: Vec<String>,
    /// How the stage is prepared (`git`, `script`, `working`...).
    pub stage_method: Option<Key>,
}

/// Commands run around staging by the `script` stage method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageScript {
    /// Run before building.
    pub stage: Option<String>,
    /// Run afterwards.
    pub unstage: Option<String>,
}

/// Everything the stager needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageConfig {
    /// Directory the app is built from.
    pub root_dir: Option<PathBuf>,
    /// Stage method of the project.
    pub method: Option<Key>,
    /// Stage key.
    pub stage: Key,
    /// Branch checked out by the `git` method.
    pub branch: Option<String>,
    /// Scripts run by the `script` method.
    pub script: Option<StageScript>,
}

/// A signing key from the top-level `keys` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyConfig {
    /// Name of the key.
    pub name: String,
    /// Package signed with this key.
    pub keyed_pkg: Option<String>,
    /// Key password.
    pub password: Option<String>,
}

/// Where build output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutTarget {
    /// Output directory.
    pub folder: PathBuf,
    /// Output file name, when a file was given.
    pub file: Option<String>,
}

impl OutTarget {
    /// Splits a `--out` value: `.zip`/`.pkg` paths are files, anything else a folder.
    pub fn parse(raw: &str) -> Self {
        let path = expand_path(raw, None);
        let is_file = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip") || e.eq_ignore_ascii_case("pkg"));
        if !is_file {
            return Self { folder: path, file: None };
        }
        Self {
            folder: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            file: path.file_name().map(|f| f.to_string_lossy().into_owned()),
        }
    }
}

impl Default for OutTarget {
    fn default() -> Self {
        Self {
            folder: env::temp_dir(),
            file: None,
        }
    }
}

/// The files that make up the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentConfig {
    /// Included files and folders.
    pub source_files: Vec<String>,
    /// Excluded paths.
    pub excludes: Vec<String>,
}

/// Parameters for sideloading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideloadConfig {
    /// Directory the app is built from.
    pub root_dir: Option<PathBuf>,
    /// What to include.
    pub content: ContentConfig,
    /// A prebuilt package to load instead of building.
    pub infile: Option<PathBuf>,
    /// Where to leave the built zip.
    pub out: OutTarget,
}

/// Parameters for packaging and signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageConfig {
    /// App name embedded in the package.
    pub app_name: Option<String>,
    /// Where to write the package.
    pub out: OutTarget,
    /// Signing password from the stage's key.
    pub password: Option<String>,
}

// --- PARSED CONFIG ---

/// The command-scoped, selector-resolved view of a raw config tree.
///
/// Read-only except for `root_dir`, `in` and `out`, which build steps update.
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    selection: Selection,
    device: DeviceConfig,
    project: ProjectConfig,
    stage: StageConfig,
    key: Option<KeyConfig>,
    root_dir: Option<PathBuf>,
    infile: Option<PathBuf>,
    out: OutTarget,
    sections: Mapping,
}

impl ParsedConfig {
    /// Resolves the selection and builds every bundle. Fails before any bundle
    /// is built if a selector does not resolve.
    pub fn build(tree: &ConfigTree, options: &Options) -> ConfigResult<Self> {
        let selection = select(tree, &options.selectors())?;

        let device_node = lookup(tree.devices(), &selection.device);
        let device = DeviceConfig {
            ip: device_node.and_then(|d| d.get_str("ip")).map(str::to_string),
            user: device_node.and_then(|d| d.get_str("user")).map(str::to_string),
            password: device_node.and_then(|d| d.get_str("password")).map(str::to_string),
        };

        let project_node = lookup(tree.projects(), &selection.project);
        let mut stage_method = project_node
            .and_then(|p| p.get("stage_method"))
            .and_then(Node::as_str)
            .map(Key::from);
        if options.working {
            stage_method = Some(Key::from(WORKING_STAGE_METHOD));
        }
        let project = ProjectConfig {
            key: selection.project.clone(),
            directory: project_node
                .and_then(|p| p.get_str("directory"))
                .map(|d| expand_path(d, None)),
            app_name: project_node
                .and_then(|p| p.get_str("app_name"))
                .map(str::to_string),
            source_files: project_node
                .map(|p| p.get_string_list("source_files"))
                .unwrap_or_default(),
            excludes: project_node
                .map(|p| p.get_string_list("excludes"))
                .unwrap_or_default(),
            stage_method: stage_method.clone(),
        };

        let stage_node = project_node
            .and_then(|p| p.get("stages"))
            .and_then(|s| s.get(selection.stage.as_str()));
        let script = stage_node.and_then(|s| s.get("script")).map(|s| StageScript {
            stage: s.get_str("stage").map(str::to_string),
            unstage: s.get_str("unstage").map(str::to_string),
        });
        let stage = StageConfig {
            root_dir: project.directory.clone(),
            method: stage_method,
            stage: selection.stage.clone(),
            branch: stage_node.and_then(|s| s.get_str("branch")).map(str::to_string),
            script,
        };

        let key = match stage_node.and_then(|s| s.get_str("key")) {
            Some(name) => Some(resolve_key(tree, &selection.stage, name)?),
            None => None,
        };

        let sections: Mapping = tree
            .root()
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "devices" | "projects"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        log::debug!(
            "Active view: device '{}', project '{}', stage '{}'.",
            selection.device,
            selection.project,
            selection.stage
        );

        Ok(Self {
            root_dir: project.directory.clone(),
            infile: options.infile.as_deref().map(|p| expand_path(p, None)),
            out: options.out.as_deref().map(OutTarget::parse).unwrap_or_default(),
            selection,
            device,
            project,
            stage,
            key,
            sections,
        })
    }

    /// The selected device, project and stage keys.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The selected device's connection settings.
    pub fn device_config(&self) -> &DeviceConfig {
        &self.device
    }

    /// The selected project.
    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    /// The stager bundle, following the current `root_dir`.
    pub fn stage_config(&self) -> StageConfig {
        StageConfig {
            root_dir: self.root_dir.clone(),
            ..self.stage.clone()
        }
    }

    /// The signing key of the selected stage, if it names one.
    pub fn key(&self) -> Option<&KeyConfig> {
        self.key.as_ref()
    }

    /// The sideload bundle.
    pub fn sideload_config(&self) -> SideloadConfig {
        SideloadConfig {
            root_dir: self.root_dir.clone(),
            content: ContentConfig {
                source_files: self.project.source_files.clone(),
                excludes: self.project.excludes.clone(),
            },
            infile: self.infile.clone(),
            out: self.out.clone(),
        }
    }

    /// The packaging bundle.
    pub fn package_config(&self) -> PackageConfig {
        PackageConfig {
            app_name: self.project.app_name.clone(),
            out: self.out.clone(),
            password: self.key.as_ref().and_then(|k| k.password.clone()),
        }
    }

    /// Directory builds run from.
    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }

    /// Points builds at another directory.
    pub fn set_root_dir(&mut self, root_dir: impl Into<PathBuf>) {
        self.root_dir = Some(root_dir.into());
    }

    /// Input package.
    pub fn infile(&self) -> Option<&Path> {
        self.infile.as_deref()
    }

    /// Replaces the input package.
    pub fn set_in(&mut self, infile: impl Into<PathBuf>) {
        self.infile = Some(infile.into());
    }

    /// Output target.
    pub fn out(&self) -> &OutTarget {
        &self.out
    }

    /// Replaces the output target.
    pub fn set_out(&mut self, out: OutTarget) {
        self.out = out;
    }

    /// Any other top-level section, e.g. `input_mappings`.
    pub fn section(&self, name: &str) -> Option<&Node> {
        self.sections.get(name)
    }

    /// Names of the open sections, in document order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(Key::as_str)
    }

    /// The remote-control key mappings, if configured.
    pub fn input_mappings(&self) -> Option<&Mapping> {
        self.section("input_mappings").and_then(Node::as_map)
    }
}

fn lookup<'a>(section: Option<&'a Mapping>, key: &Key) -> Option<&'a Node> {
    section.and_then(|s| s.get(key))
}

fn resolve_key(tree: &ConfigTree, stage: &Key, name: &str) -> ConfigResult<KeyConfig> {
    let entry = tree
        .section("keys")
        .and_then(|keys| keys.get(name))
        .ok_or_else(|| ConfigError::UnknownKey {
            stage: stage.to_string(),
            key: name.to_string(),
        })?;
    Ok(KeyConfig {
        name: name.to_string(),
        keyed_pkg: entry.get_str("keyed_pkg").map(str::to_string),
        password: entry.get_str("password").map(str::to_string),
    })
}
