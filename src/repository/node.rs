use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a node can do, independent of its structural kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Carries spam-check configuration fields.
    SpamCheck,
    /// Carries the persisted publication marker.
    AutoPublish,
    /// Carries the last classification verdict.
    CheckResult,
    /// Has a publication workflow.
    Publishable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    /// Versioned handle whose children are the document revisions.
    Handle,
    Document,
}

/// Snapshot of a node as seen by one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<Capability>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl ContentNode {
    pub fn new(id: impl Into<NodeId>, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            parent,
            kind,
            capabilities: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn root(id: impl Into<NodeId>) -> Self {
        Self::new(id, None, NodeKind::Folder)
    }

    pub fn folder(id: impl Into<NodeId>, parent: impl Into<NodeId>) -> Self {
        Self::new(id, Some(parent.into()), NodeKind::Folder)
    }

    pub fn handle(id: impl Into<NodeId>, parent: impl Into<NodeId>) -> Self {
        Self::new(id, Some(parent.into()), NodeKind::Handle)
    }

    pub fn document(id: impl Into<NodeId>, parent: impl Into<NodeId>) -> Self {
        Self::new(id, Some(parent.into()), NodeKind::Document)
            .with_capability(Capability::Publishable)
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Trimmed property value, `None` when absent or blank.
    pub fn text_property(&self, name: &str) -> Option<String> {
        self.property(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
