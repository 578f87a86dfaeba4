use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::node::{ContentNode, NodeId};

#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error("no publication workflow for node {0}")]
    Unavailable(NodeId),
    #[error("workflow failed for node {node}: {reason}")]
    Failed { node: NodeId, reason: String },
}

/// The two publication operations the engine drives. Implementations handle
/// versioning and commit their own changes.
#[async_trait]
pub trait PublicationWorkflow: Send + Sync {
    async fn publish(&self, document: &NodeId) -> Result<(), WorkflowError>;

    async fn request_publication(&self, document: &NodeId) -> Result<(), WorkflowError>;
}

pub trait WorkflowManager: Send + Sync {
    fn publication_workflow(&self, document: &ContentNode) -> Option<Arc<dyn PublicationWorkflow>>;
}
