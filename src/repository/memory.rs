use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::{
    node::{Capability, ContentNode, NodeId},
    props,
    session::{ContentRepository, ContentSession, RepositoryError},
    workflow::{PublicationWorkflow, WorkflowError, WorkflowManager},
};

/// Serializable form of a whole tree. Parents must be listed somewhere in
/// `nodes`; order is otherwise free and decides child order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub root: NodeId,
    pub nodes: Vec<ContentNode>,
}

#[derive(Debug)]
struct StoredNode {
    node: ContentNode,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Tree {
    root: NodeId,
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, StoredNode>,
}

impl Tree {
    fn get(&self, id: &NodeId) -> Result<&StoredNode, RepositoryError> {
        self.nodes
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }
}

/// In-memory content store. Sessions commit with an optimistic check on
/// every property they wrote.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    tree: Arc<RwLock<Tree>>,
}

impl MemoryRepository {
    pub fn new(root: ContentNode) -> Self {
        let root_id = root.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(
            root_id.clone(),
            StoredNode {
                node: ContentNode { parent: None, ..root },
                children: Vec::new(),
            },
        );
        Self {
            tree: Arc::new(RwLock::new(Tree {
                root: root_id.clone(),
                order: vec![root_id],
                nodes,
            })),
        }
    }

    pub fn from_snapshot(snapshot: TreeSnapshot) -> Result<Self, RepositoryError> {
        let TreeSnapshot { root, nodes } = snapshot;
        let mut by_id: HashMap<NodeId, ContentNode> = HashMap::with_capacity(nodes.len());
        let mut order = Vec::with_capacity(nodes.len());
        for node in nodes {
            if by_id.contains_key(&node.id) {
                return Err(RepositoryError::Backend(format!("duplicate node {}", node.id)));
            }
            order.push(node.id.clone());
            by_id.insert(node.id.clone(), node);
        }

        let root_node = by_id
            .remove(&root)
            .ok_or_else(|| RepositoryError::NotFound(root.clone()))?;
        let repository = Self::new(root_node);
        {
            let mut tree = repository.tree.write();
            for id in order.iter().filter(|id| **id != root) {
                let Some(node) = by_id.get(id) else {
                    continue;
                };
                let Some(parent) = node.parent.clone() else {
                    return Err(RepositoryError::Backend(format!(
                        "node {} has no parent and is not the root",
                        node.id
                    )));
                };
                if parent != root && !by_id.contains_key(&parent) {
                    return Err(RepositoryError::NotFound(parent));
                }
                tree.order.push(id.clone());
                tree.nodes.insert(
                    id.clone(),
                    StoredNode {
                        node: node.clone(),
                        children: Vec::new(),
                    },
                );
            }
            let links: Vec<(NodeId, NodeId)> = tree
                .order
                .iter()
                .filter_map(|id| {
                    let parent = tree.nodes.get(id)?.node.parent.clone()?;
                    Some((parent, id.clone()))
                })
                .collect();
            for (parent, child) in links {
                if let Some(stored) = tree.nodes.get_mut(&parent) {
                    stored.children.push(child);
                }
            }
            ensure_acyclic(&tree)?;
        }
        Ok(repository)
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        let tree = self.tree.read();
        TreeSnapshot {
            root: tree.root.clone(),
            nodes: tree
                .order
                .iter()
                .filter_map(|id| tree.nodes.get(id).map(|stored| stored.node.clone()))
                .collect(),
        }
    }

    pub fn insert(&self, node: ContentNode) -> Result<(), RepositoryError> {
        let mut tree = self.tree.write();
        let parent = node
            .parent
            .clone()
            .ok_or_else(|| RepositoryError::Backend(format!("node {} needs a parent", node.id)))?;
        if tree.nodes.contains_key(&node.id) {
            return Err(RepositoryError::Backend(format!("duplicate node {}", node.id)));
        }
        let parent_node = tree
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| RepositoryError::NotFound(parent.clone()))?;
        parent_node.children.push(node.id.clone());
        tree.order.push(node.id.clone());
        tree.nodes.insert(
            node.id.clone(),
            StoredNode {
                node,
                children: Vec::new(),
            },
        );
        Ok(())
    }

    /// Committed state of a node.
    pub fn node(&self, id: &NodeId) -> Option<ContentNode> {
        self.tree.read().nodes.get(id).map(|stored| stored.node.clone())
    }

    pub fn session(&self) -> MemorySession {
        MemorySession {
            tree: self.tree.clone(),
            pending: BTreeMap::new(),
        }
    }

    fn commit_property(&self, id: &NodeId, name: &str, value: &str) -> Result<(), RepositoryError> {
        let mut tree = self.tree.write();
        let stored = tree
            .nodes
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        stored.node.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

fn ensure_acyclic(tree: &Tree) -> Result<(), RepositoryError> {
    let limit = tree.nodes.len();
    for id in &tree.order {
        let mut current = id.clone();
        let mut steps = 0;
        while let Some(parent) = tree.get(&current)?.node.parent.clone() {
            steps += 1;
            if steps > limit {
                return Err(RepositoryError::Backend(format!(
                    "node {} does not lead to the root",
                    id
                )));
            }
            current = parent;
        }
        if current != tree.root {
            return Err(RepositoryError::Backend(format!(
                "node {} does not lead to the root",
                id
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn open_session(&self) -> Result<Box<dyn ContentSession>, RepositoryError> {
        Ok(Box::new(self.session()))
    }
}

/// Session-local view of a node plus the committed value of every property
/// the session has written.
#[derive(Debug)]
struct PendingNode {
    node: ContentNode,
    base: BTreeMap<String, Option<String>>,
}

pub struct MemorySession {
    tree: Arc<RwLock<Tree>>,
    pending: BTreeMap<NodeId, PendingNode>,
}

impl MemorySession {
    fn current(&self, id: &NodeId) -> Result<ContentNode, RepositoryError> {
        if let Some(pending) = self.pending.get(id) {
            return Ok(pending.node.clone());
        }
        Ok(self.tree.read().get(id)?.node.clone())
    }

    fn pending_mut(&mut self, id: &NodeId) -> Result<&mut PendingNode, RepositoryError> {
        if !self.pending.contains_key(id) {
            let node = self.tree.read().get(id)?.node.clone();
            self.pending.insert(
                id.clone(),
                PendingNode {
                    node,
                    base: BTreeMap::new(),
                },
            );
        }
        self.pending
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }
}

#[async_trait]
impl ContentSession for MemorySession {
    fn root_id(&self) -> NodeId {
        self.tree.read().root.clone()
    }

    async fn get_by_id(&self, id: &NodeId) -> Result<ContentNode, RepositoryError> {
        self.current(id)
    }

    async fn get_parent(&self, node: &ContentNode) -> Result<Option<ContentNode>, RepositoryError> {
        match &node.parent {
            Some(parent) => self.current(parent).map(Some),
            None => Ok(None),
        }
    }

    async fn children(&self, node: &ContentNode) -> Result<Vec<ContentNode>, RepositoryError> {
        let ids = self.tree.read().get(&node.id)?.children.clone();
        ids.iter().map(|id| self.current(id)).collect()
    }

    async fn set_property(
        &mut self,
        id: &NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), RepositoryError> {
        let pending = self.pending_mut(id)?;
        if !pending.base.contains_key(name) {
            let committed = pending.node.properties.get(name).cloned();
            pending.base.insert(name.to_string(), committed);
        }
        pending
            .node
            .properties
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn add_capability(
        &mut self,
        id: &NodeId,
        capability: Capability,
    ) -> Result<(), RepositoryError> {
        self.pending_mut(id)?.node.capabilities.insert(capability);
        Ok(())
    }

    /// Commits every pending write at once. Fails with `Conflict` when a
    /// property this session wrote was changed to a different value since
    /// the session first touched it.
    async fn save(&mut self) -> Result<(), RepositoryError> {
        let mut tree = self.tree.write();
        for (id, pending) in &self.pending {
            let stored = &tree.get(id)?.node;
            for (name, base) in &pending.base {
                let committed = stored.properties.get(name);
                if committed != base.as_ref() && committed != pending.node.properties.get(name) {
                    return Err(RepositoryError::Conflict(id.clone()));
                }
            }
        }
        for (id, pending) in std::mem::take(&mut self.pending) {
            let Some(stored) = tree.nodes.get_mut(&id) else {
                continue;
            };
            stored
                .node
                .capabilities
                .extend(pending.node.capabilities.iter().copied());
            for name in pending.base.keys() {
                if let Some(value) = pending.node.properties.get(name) {
                    stored.node.properties.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowCallKind {
    Publish,
    RequestPublication,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCall {
    pub kind: WorkflowCallKind,
    pub document: NodeId,
}

#[derive(Default)]
struct WorkflowLog {
    calls: Vec<WorkflowCall>,
    failure: Option<String>,
}

/// Publication workflow over a [`MemoryRepository`] that records every call
/// and moves the document state directly.
#[derive(Clone)]
pub struct MemoryWorkflowManager {
    repository: MemoryRepository,
    log: Arc<Mutex<WorkflowLog>>,
}

impl MemoryWorkflowManager {
    pub fn new(repository: MemoryRepository) -> Self {
        Self {
            repository,
            log: Arc::new(Mutex::new(WorkflowLog::default())),
        }
    }

    /// Makes every following workflow call fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.log.lock().failure = Some(reason.into());
    }

    pub fn calls(&self) -> Vec<WorkflowCall> {
        self.log.lock().calls.clone()
    }

    fn run(&self, kind: WorkflowCallKind, document: &NodeId) -> Result<(), WorkflowError> {
        {
            let mut log = self.log.lock();
            log.calls.push(WorkflowCall {
                kind,
                document: document.clone(),
            });
            if let Some(reason) = &log.failure {
                return Err(WorkflowError::Failed {
                    node: document.clone(),
                    reason: reason.clone(),
                });
            }
        }
        let state = match kind {
            WorkflowCallKind::Publish => props::STATE_PUBLISHED,
            WorkflowCallKind::RequestPublication => props::STATE_PUBLICATION_REQUESTED,
        };
        self.repository
            .commit_property(document, props::STATE, state)
            .map_err(|err| WorkflowError::Failed {
                node: document.clone(),
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl PublicationWorkflow for MemoryWorkflowManager {
    async fn publish(&self, document: &NodeId) -> Result<(), WorkflowError> {
        self.run(WorkflowCallKind::Publish, document)
    }

    async fn request_publication(&self, document: &NodeId) -> Result<(), WorkflowError> {
        self.run(WorkflowCallKind::RequestPublication, document)
    }
}

impl WorkflowManager for MemoryWorkflowManager {
    fn publication_workflow(&self, document: &ContentNode) -> Option<Arc<dyn PublicationWorkflow>> {
        if document.has_capability(Capability::Publishable) {
            Some(Arc::new(self.clone()))
        } else {
            None
        }
    }
}
