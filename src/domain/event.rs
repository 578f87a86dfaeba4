use serde::{Deserialize, Serialize};

use crate::repository::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Changed,
    Unpublished,
    Published,
    Deleted,
}

impl EventKind {
    /// Created and changed documents are both candidates for a new decision.
    pub fn is_document_new(&self) -> bool {
        matches!(self, EventKind::Created | EventKind::Changed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub node: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, node: impl Into<NodeId>) -> Self {
        Self {
            kind,
            node: node.into(),
            path: None,
        }
    }
}
