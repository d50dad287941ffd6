// src/models.rs

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

// --- KEY TOKENS ---

/// A normalized key token.
///
/// Every object key read from a config document becomes a `Key`, and a few
/// string fields (`devices.default`, `projects.default`, `stage_method`) are
/// promoted to `Key` by the normalizer. On disk a `Key` is a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Creates a key token from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The textual form of the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- CONFIG TREE NODES ---

/// An insertion-ordered mapping. Declaration order from the parsed document is
/// kept, which the default-stage selection depends on.
pub type Mapping = IndexMap<Key, Node>;

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    /// A nested object.
    Map(Mapping),
    /// An array.
    Seq(Vec<Node>),
    /// A plain display string.
    Str(String),
    /// A normalized key token.
    Key(Key),
    /// Numbers, booleans and null.
    Scalar(Value),
}

impl Node {
    /// Returns the mapping if this node is one.
    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the mapping mutably if this node is one.
    pub fn as_map_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the text of a string or key-token node.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Key(k) => Some(k.as_str()),
            _ => None,
        }
    }

    /// Returns the key token if this node already is one.
    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Self::Key(k) => Some(k),
            _ => None,
        }
    }

    /// Looks up a child of a mapping node.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Looks up a child of a mapping node mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Self> {
        self.as_map_mut().and_then(|map| map.get_mut(key))
    }

    /// Looks up a string child of a mapping node.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Self::as_str)
    }

    /// Collects a sequence child of strings. Non-string items are skipped.
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Self::Seq(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Renders a scalar-like node as text (strings, key tokens, numbers, booleans).
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Key(k) => Some(k.as_str().to_string()),
            Self::Scalar(Value::Number(n)) => Some(n.to_string()),
            Self::Scalar(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl From<Value> for Node {
    /// Object keys become key tokens recursively; string values stay plain strings.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(object) => Self::Map(
                object
                    .into_iter()
                    .map(|(k, v)| (Key::from(k), Self::from(v)))
                    .collect(),
            ),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            Value::String(s) => Self::Str(s),
            other => Self::Scalar(other),
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Merges `overlay` into `base`; overlay values win on collision at every
/// nesting level. Mappings are merged, everything else is replaced.
pub fn deep_merge(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        if let Some(slot) = base.get_mut(&key) {
            match (slot, value) {
                (Node::Map(existing), Node::Map(incoming)) => deep_merge(existing, incoming),
                (slot, incoming) => *slot = incoming,
            }
        } else {
            base.insert(key, value);
        }
    }
}

// --- CONFIG TREE ---

/// The raw, fully merged configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigTree(Mapping);

impl ConfigTree {
    /// Wraps an already-built mapping.
    pub fn from_mapping(root: Mapping) -> Self {
        Self(root)
    }

    /// The top-level mapping.
    pub fn root(&self) -> &Mapping {
        &self.0
    }

    /// The top-level mapping, mutably.
    pub fn root_mut(&mut self) -> &mut Mapping {
        &mut self.0
    }

    /// Looks up a top-level section.
    pub fn section(&self, name: &str) -> Option<&Node> {
        self.0.get(name)
    }

    /// The `devices` section, when it is a mapping.
    pub fn devices(&self) -> Option<&Mapping> {
        self.section("devices").and_then(Node::as_map)
    }

    /// The `projects` section, when it is a mapping.
    pub fn projects(&self) -> Option<&Mapping> {
        self.section("projects").and_then(Node::as_map)
    }

    /// The `projects` section, mutably.
    pub fn projects_mut(&mut self) -> Option<&mut Mapping> {
        self.0.get_mut("projects").and_then(Node::as_map_mut)
    }

    /// The `devices` section, mutably.
    pub fn devices_mut(&mut self) -> Option<&mut Mapping> {
        self.0.get_mut("devices").and_then(Node::as_map_mut)
    }

    /// Serializes the tree as pretty-printed JSON.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// --- LOADED PATH SET ---

/// Absolute paths of every file merged during one resolution.
#[derive(Debug, Clone, Default)]
pub struct LoadedPathSet {
    paths: HashSet<PathBuf>,
    order: Vec<PathBuf>,
}

impl LoadedPathSet {
    /// Records a path. Returns false if it was already recorded.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.paths.insert(path.clone()) {
            self.order.push(path);
            true
        } else {
            false
        }
    }

    /// Whether a path has been merged already.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Paths in load order, most specific first.
    pub fn in_load_order(&self) -> &[PathBuf] {
        &self.order
    }

    /// Number of files merged.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing has been merged yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
