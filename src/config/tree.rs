//! Hierarchical configuration store adapter
//!
//! The supervisor's configuration lives in a transactional tree of named nodes.
//! This module defines the read-only view the kernel module manager needs from it:
//! a [`ConfigStore`] hands out [`ReadTxn`] snapshots rooted at an absolute path.
//!
//! [`TreeConfigStore`] is an in-process implementation backed by a [`ConfigNode`]
//! tree, usually parsed from TOML:
//!
//! ```toml
//! [modules."foo.ko"]
//! loadManual = true
//!
//! [modules."foo.ko".params]
//! mode = "hello world"
//!
//! [modules."foo.ko".requires]
//! kernelModules = ["bar.ko"]
//! ```

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Config store errors
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Failed to read config store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config store TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config path: {0} (must be absolute)")]
    InvalidPath(String),
}

/// Node type, as reported by [`ReadTxn::node_type`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Empty,
    Bool,
    Int,
    Float,
    String,
    Stem,
}

/// One node of the configuration tree
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered named children
    Stem(Vec<(String, ConfigNode)>),
}

impl ConfigNode {
    /// Build a stem from `(name, node)` pairs, keeping their order
    pub fn stem<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = (S, ConfigNode)>,
        S: Into<String>,
    {
        ConfigNode::Stem(
            children
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        )
    }

    /// Build a stem holding a list, children named by index ("0", "1", ...)
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ConfigNode>,
    {
        ConfigNode::Stem(
            items
                .into_iter()
                .enumerate()
                .map(|(i, node)| (i.to_string(), node))
                .collect(),
        )
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            ConfigNode::Empty => NodeType::Empty,
            ConfigNode::Bool(_) => NodeType::Bool,
            ConfigNode::Int(_) => NodeType::Int,
            ConfigNode::Float(_) => NodeType::Float,
            ConfigNode::String(_) => NodeType::String,
            ConfigNode::Stem(_) => NodeType::Stem,
        }
    }

    /// Look up a direct child by name
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Stem(children) => children
                .iter()
                .find(|(child, _)| child == name)
                .map(|(_, node)| node),
            _ => None,
        }
    }

    /// Walk a relative path (`"requires/kernelModules"`); `""` and `"."` are this node
    pub fn descend(&self, path: &str) -> Option<&ConfigNode> {
        path.split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Scalar value as text. Stems and empty nodes have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ConfigNode::String(s) => Some(s.clone()),
            ConfigNode::Bool(b) => Some(b.to_string()),
            ConfigNode::Int(i) => Some(i.to_string()),
            ConfigNode::Float(f) => Some(f.to_string()),
            ConfigNode::Empty | ConfigNode::Stem(_) => None,
        }
    }
}

impl From<toml::Value> for ConfigNode {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => ConfigNode::String(s),
            toml::Value::Integer(i) => ConfigNode::Int(i),
            toml::Value::Float(f) => ConfigNode::Float(f),
            toml::Value::Boolean(b) => ConfigNode::Bool(b),
            toml::Value::Datetime(dt) => ConfigNode::String(dt.to_string()),
            toml::Value::Array(items) => {
                ConfigNode::list(items.into_iter().map(ConfigNode::from))
            }
            toml::Value::Table(table) => ConfigNode::Stem(
                table
                    .into_iter()
                    .map(|(key, value)| (key, ConfigNode::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Read-only transaction: a snapshot of the subtree at `path`
///
/// A transaction on a path that does not exist is valid and simply empty.
#[derive(Debug, Clone)]
pub struct ReadTxn {
    path: String,
    node: Option<ConfigNode>,
}

impl ReadTxn {
    pub fn new(path: impl Into<String>, node: Option<ConfigNode>) -> Self {
        Self {
            path: path.into(),
            node,
        }
    }

    /// Absolute path this transaction was opened on
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the transaction's root node exists
    pub fn exists(&self) -> bool {
        self.node.is_some()
    }

    /// Node at a path relative to the transaction root
    pub fn get(&self, rel: &str) -> Option<&ConfigNode> {
        self.node.as_ref().and_then(|node| node.descend(rel))
    }

    /// Type of the node at `rel`, `NodeType::Empty` when missing
    pub fn node_type(&self, rel: &str) -> NodeType {
        self.get(rel)
            .map(ConfigNode::node_type)
            .unwrap_or(NodeType::Empty)
    }

    /// Boolean at `rel`, or `default` when missing or not a bool
    pub fn get_bool(&self, rel: &str, default: bool) -> bool {
        match self.get(rel) {
            Some(ConfigNode::Bool(b)) => *b,
            _ => default,
        }
    }

    /// String at `rel`, or `None` when missing or not a string
    pub fn get_string(&self, rel: &str) -> Option<&str> {
        match self.get(rel) {
            Some(ConfigNode::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Ordered children of the stem at `rel`; empty when missing or not a stem
    pub fn children(&self, rel: &str) -> impl Iterator<Item = (&str, &ConfigNode)> {
        let children: &[(String, ConfigNode)] = match self.get(rel) {
            Some(ConfigNode::Stem(children)) => children,
            _ => &[],
        };
        children.iter().map(|(name, node)| (name.as_str(), node))
    }
}

/// Source of read-only configuration transactions
pub trait ConfigStore {
    /// Open a read transaction on an absolute path (`"/modules"`)
    fn read_txn(&self, path: &str) -> Result<ReadTxn, ConfigStoreError>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for &T {
    fn read_txn(&self, path: &str) -> Result<ReadTxn, ConfigStoreError> {
        (**self).read_txn(path)
    }
}

impl<T: ConfigStore + ?Sized> ConfigStore for Box<T> {
    fn read_txn(&self, path: &str) -> Result<ReadTxn, ConfigStoreError> {
        (**self).read_txn(path)
    }
}

/// Config store backed by an in-memory node tree
#[derive(Debug, Clone)]
pub struct TreeConfigStore {
    root: ConfigNode,
}

impl TreeConfigStore {
    pub fn new(root: ConfigNode) -> Self {
        Self { root }
    }

    /// An empty store; every transaction is empty
    pub fn empty() -> Self {
        Self::new(ConfigNode::Stem(Vec::new()))
    }

    /// Parse a store from TOML text, keeping table and array order
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigStoreError> {
        let table: toml::Table = toml::from_str(contents)?;
        Ok(Self::new(ConfigNode::from(toml::Value::Table(table))))
    }

    /// Load a store from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigStoreError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        debug!("Loaded config store from {:?}", path.as_ref());
        Self::from_toml_str(&contents)
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }
}

impl ConfigStore for TreeConfigStore {
    fn read_txn(&self, path: &str) -> Result<ReadTxn, ConfigStoreError> {
        if !path.starts_with('/') {
            return Err(ConfigStoreError::InvalidPath(path.to_string()));
        }
        Ok(ReadTxn::new(path, self.root.descend(path).cloned()))
    }
}
